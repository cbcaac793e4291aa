//! Resource dictionaries of pages and form XObjects.
//!
//! Resources get generated names (`F1`, `Im2`, ...). Adding an object that is
//! already present in its category returns the existing name.

use crate::document::registry::ObjectRegistry;
use crate::error::Result;
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use rustc_hash::FxHashMap;

/// Kinds of resources a content stream can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Font,
    ColorSpace,
    Image,
    Form,
    Pattern,
    ExtGState,
    Properties,
    Shading,
}

impl ResourceType {
    /// Sub-dictionary of `/Resources` holding this kind.
    pub const fn category(self) -> &'static str {
        match self {
            Self::Font => "Font",
            Self::ColorSpace => "ColorSpace",
            Self::Image | Self::Form => "XObject",
            Self::Pattern => "Pattern",
            Self::ExtGState => "ExtGState",
            Self::Properties => "Properties",
            Self::Shading => "Shading",
        }
    }

    /// Prefix of generated names.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Font => "F",
            Self::ColorSpace => "Cs",
            Self::Image => "Im",
            Self::Form => "Fm",
            Self::Pattern => "P",
            Self::ExtGState => "Gs",
            Self::Properties => "Pr",
            Self::Shading => "Sh",
        }
    }
}

/// The resource dictionary a canvas writes into.
#[derive(Debug)]
pub struct PdfResources {
    objref: ObjRef,
    counters: FxHashMap<ResourceType, u32>,
}

impl PdfResources {
    pub(crate) fn new(objref: ObjRef) -> Self {
        Self {
            objref,
            counters: FxHashMap::default(),
        }
    }

    pub fn objref(&self) -> ObjRef {
        self.objref
    }

    /// Name of `value` under `kind`, adding it when it is not present yet.
    pub fn add(&mut self, registry: &mut ObjectRegistry, kind: ResourceType, value: PdfObject) -> Result<String> {
        let category = kind.category();
        if let Some(name) = self.find(registry, category, &value) {
            return Ok(name);
        }

        let counter = self.counters.entry(kind).or_insert(0);
        let name = loop {
            *counter += 1;
            let candidate = format!("{}{}", kind.prefix(), counter);
            let taken = registry
                .lookup(self.objref)
                .get(category)
                .and_then(|c| registry.resolve_dict(c))
                .is_some_and(|c| c.contains_key(&candidate));
            if !taken {
                break candidate;
            }
        };

        let resources = registry.get_dict_mut(self.objref)?;
        let category_ref = match resources.get_mut(category) {
            Some(PdfObject::Dict(dict)) => {
                dict.insert(name.clone(), value);
                return Ok(name);
            }
            Some(PdfObject::Ref(r)) => *r,
            _ => {
                resources.insert(
                    category.to_string(),
                    PdfObject::Dict(crate::pdf_dict! { name.as_str() => value }),
                );
                return Ok(name);
            }
        };
        registry.get_dict_mut(category_ref)?.insert(name.clone(), value);
        Ok(name)
    }

    /// Existing name of `value` in `category`.
    fn find(&self, registry: &ObjectRegistry, category: &str, value: &PdfObject) -> Option<String> {
        let dict = registry
            .lookup(self.objref)
            .get(category)
            .and_then(|c| registry.resolve_dict(c))?;
        dict.iter()
            .find(|(_, existing)| *existing == value)
            .map(|(name, _)| name.clone())
    }

    /// Entry `name` of `category`, resolved.
    pub fn get<'a>(&self, registry: &'a ObjectRegistry, category: &str, name: &str) -> Option<&'a PdfObject> {
        let dict: &PdfDict = registry
            .lookup(self.objref)
            .get(category)
            .and_then(|c| registry.resolve_dict(c))?;
        registry.get_in(dict, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_generated_and_reused() {
        let mut registry = ObjectRegistry::new();
        let font_a = registry.register(crate::pdf_dict! {}).unwrap();
        let font_b = registry.register(crate::pdf_dict! {}).unwrap();
        // an existing F1 forces the counter on
        let taken = registry.register(crate::pdf_dict! {}).unwrap();
        let res_ref = registry
            .register(crate::pdf_dict! { "Font" => crate::pdf_dict! { "F1" => taken } })
            .unwrap();
        let mut resources = PdfResources::new(res_ref);

        let a = resources.add(&mut registry, ResourceType::Font, font_a.into()).unwrap();
        let b = resources.add(&mut registry, ResourceType::Font, font_b.into()).unwrap();
        let again = resources.add(&mut registry, ResourceType::Font, font_a.into()).unwrap();
        let existing = resources.add(&mut registry, ResourceType::Font, taken.into()).unwrap();
        assert_eq!((a.as_str(), b.as_str()), ("F2", "F3"));
        assert_eq!(again, "F2");
        assert_eq!(existing, "F1");

        let gs = resources
            .add(
                &mut registry,
                ResourceType::ExtGState,
                PdfObject::Dict(crate::pdf_dict! { "CA" => 0.5 }),
            )
            .unwrap();
        assert_eq!(gs, "Gs1");
        assert!(resources.get(&registry, "ExtGState", "Gs1").is_some());
    }
}
