//! Destinations: explicit page targets and named references to them.

use super::registry::ObjectRegistry;
use crate::model::objects::{ObjRef, PdfObject};
use std::collections::BTreeMap;

/// A destination as written in an outline item, action or link annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfDestination {
    /// `[page /XYZ left top zoom]` and the other fit types
    Explicit(Vec<PdfObject>),
    /// Name or string looked up in the Dests name tree
    Named(Vec<u8>),
}

impl PdfDestination {
    /// Reads a destination value (array, name, string).
    pub fn from_object(registry: &ObjectRegistry, obj: &PdfObject) -> Option<Self> {
        match registry.resolve(obj) {
            PdfObject::Array(arr) => Some(Self::Explicit(arr.clone())),
            PdfObject::Name(name) => Some(Self::Named(name.as_bytes().to_vec())),
            PdfObject::String(s) => Some(Self::Named(s.clone())),
            _ => None,
        }
    }

    /// Destination of an outline item or link annotation: `/Dest`, or the `/D` of a GoTo `/A`.
    pub fn from_item(registry: &ObjectRegistry, item: &PdfObject) -> Option<Self> {
        let dict = registry.resolve_dict(item)?;
        if let Some(dest) = dict.get("Dest") {
            return Self::from_object(registry, dest);
        }
        let action = registry.resolve_dict(dict.get("A")?)?;
        match action.get("S") {
            Some(PdfObject::Name(s)) if s == "GoTo" => Self::from_object(registry, action.get("D")?),
            _ => None,
        }
    }

    /// An explicit destination targeting `page` with `fit` parameters.
    pub fn explicit(page: ObjRef, fit: &str, params: &[f64]) -> Self {
        let mut arr = vec![PdfObject::Ref(page), PdfObject::name(fit)];
        arr.extend(params.iter().map(|&p| PdfObject::from(p)));
        Self::Explicit(arr)
    }

    pub fn to_object(&self) -> PdfObject {
        match self {
            Self::Explicit(arr) => PdfObject::Array(arr.clone()),
            Self::Named(name) => PdfObject::String(name.clone()),
        }
    }

    /// Explicit form, following a named destination through `dests`.
    pub fn explicit_array(
        &self,
        registry: &ObjectRegistry,
        dests: &BTreeMap<Vec<u8>, PdfObject>,
    ) -> Option<Vec<PdfObject>> {
        match self {
            Self::Explicit(arr) => Some(arr.clone()),
            Self::Named(name) => {
                let target = registry.resolve(dests.get(name)?);
                // a named destination may be wrapped in a dictionary with /D
                let target = match target {
                    PdfObject::Dict(dict) => registry.resolve(dict.get("D")?),
                    other => other,
                };
                Some(target.as_array().ok()?.clone())
            }
        }
    }

    /// Page targeted by the destination, if it lies in this document.
    ///
    /// An integer first element is a zero-based index into `pages`.
    pub fn page_ref(
        &self,
        registry: &ObjectRegistry,
        dests: &BTreeMap<Vec<u8>, PdfObject>,
        pages: &[ObjRef],
    ) -> Option<ObjRef> {
        target_page(self.explicit_array(registry, dests)?.first()?, pages)
    }
}

/// Page named by the first element of an explicit destination array.
pub(crate) fn target_page(first: &PdfObject, pages: &[ObjRef]) -> Option<ObjRef> {
    match first {
        PdfObject::Ref(r) => Some(*r),
        PdfObject::Int(n) => usize::try_from(*n).ok().and_then(|n| pages.get(n)).copied(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_goto_action_and_named_lookup() {
        let mut registry = ObjectRegistry::new();
        let page = registry.register(crate::pdf_dict! { "Type" => PdfObject::name("Page") }).unwrap();
        let item = PdfObject::Dict(crate::pdf_dict! {
            "A" => crate::pdf_dict! {
                "S" => PdfObject::name("GoTo"),
                "D" => PdfObject::string("chapter"),
            },
        });
        let dest = PdfDestination::from_item(&registry, &item).unwrap();
        assert_eq!(dest, PdfDestination::Named(b"chapter".to_vec()));

        let mut dests = BTreeMap::new();
        dests.insert(
            b"chapter".to_vec(),
            PdfObject::Dict(crate::pdf_dict! {
                "D" => PdfDestination::explicit(page, "Fit", &[]).to_object(),
            }),
        );
        assert_eq!(dest.page_ref(&registry, &dests, &[]), Some(page));
    }

    #[test]
    fn test_page_index_destination() {
        let registry = ObjectRegistry::new();
        let pages = [ObjRef::new(4, 0), ObjRef::new(9, 0)];
        let dest = PdfDestination::Explicit(vec![PdfObject::Int(1), PdfObject::name("Fit")]);
        assert_eq!(dest.page_ref(&registry, &BTreeMap::new(), &pages), Some(pages[1]));
        let past_end = PdfDestination::Explicit(vec![PdfObject::Int(2), PdfObject::name("Fit")]);
        assert_eq!(past_end.page_ref(&registry, &BTreeMap::new(), &pages), None);
        let negative = PdfDestination::Explicit(vec![PdfObject::Int(-1), PdfObject::name("Fit")]);
        assert_eq!(negative.page_ref(&registry, &BTreeMap::new(), &pages), None);
    }
}
