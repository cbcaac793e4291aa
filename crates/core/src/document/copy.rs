//! Copying pages between documents and comparing object graphs.
//!
//! A copy walks the indirect graph of the source with a work list. Every
//! source reference reached gets one destination reference, allocated when
//! it is first seen, so shared objects stay shared and cycles terminate.

use super::destination::{PdfDestination, target_page};
use super::page::{INHERITABLE, PdfPage, inherited_attribute};
use super::pdf_document::PdfDocument;
use super::registry::ObjectRegistry;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;
use std::ops::Range;

/// Page keys that are not carried over to a copy.
const DROPPED_PAGE_KEYS: [&str; 2] = ["Parent", "B"];

/// State of one copy call.
struct PageCopier<'a> {
    src: &'a ObjectRegistry,
    dest: &'a mut ObjectRegistry,
    /// Source reference -> destination reference
    cache: FxHashMap<ObjRef, ObjRef>,
    /// Source pages outside the copied range; references to them become null
    excluded: FxHashSet<ObjRef>,
    queue: Vec<(ObjRef, ObjRef)>,
}

impl<'a> PageCopier<'a> {
    fn new(src: &'a ObjectRegistry, dest: &'a mut ObjectRegistry) -> Self {
        Self {
            src,
            dest,
            cache: FxHashMap::default(),
            excluded: FxHashSet::default(),
            queue: Vec::new(),
        }
    }

    /// Destination reference for `r`, allocated and queued on first sight.
    fn map_ref(&mut self, r: ObjRef) -> Result<PdfObject> {
        if self.excluded.contains(&r) {
            return Ok(PdfObject::Null);
        }
        if let Some(mapped) = self.cache.get(&r) {
            return Ok(PdfObject::Ref(*mapped));
        }
        let mapped = self.dest.allocate()?;
        self.cache.insert(r, mapped);
        self.queue.push((r, mapped));
        Ok(PdfObject::Ref(mapped))
    }

    /// Copies a direct value, mapping every reference inside it.
    fn copy_value(&mut self, obj: &PdfObject) -> Result<PdfObject> {
        Ok(match obj {
            PdfObject::Ref(r) => self.map_ref(*r)?,
            PdfObject::Array(items) => PdfObject::Array(
                items
                    .iter()
                    .map(|item| self.copy_value(item))
                    .collect::<Result<_>>()?,
            ),
            PdfObject::Dict(dict) => PdfObject::Dict(self.copy_dict(dict)?),
            PdfObject::Stream(stream) => {
                let attrs = self.copy_dict(&stream.attrs)?;
                PdfObject::from(PdfStream::new(attrs, stream.rawdata_bytes()))
            }
            other => other.clone(),
        })
    }

    fn copy_dict(&mut self, dict: &PdfDict) -> Result<PdfDict> {
        dict.iter()
            .map(|(k, v)| Ok((k.clone(), self.copy_value(v)?)))
            .collect()
    }

    /// Drains the work list: copies every object reached so far.
    fn run(&mut self) -> Result<()> {
        while let Some((src_ref, dest_ref)) = self.queue.pop() {
            let value = match self.src.get(src_ref) {
                Ok(obj) => self.copy_value(obj)?,
                Err(err) => {
                    tracing::warn!(error = %err, reference = %src_ref, "copying unavailable object as null");
                    PdfObject::Null
                }
            };
            self.dest.set(dest_ref, value)?;
        }
        Ok(())
    }

    /// Copy of a page dictionary with inherited attributes made explicit.
    fn page_dict(&mut self, page: ObjRef) -> Result<PdfDict> {
        let mut dict = self.src.lookup(page).as_dict()?.clone();
        for key in DROPPED_PAGE_KEYS {
            dict.shift_remove(key);
        }
        for key in INHERITABLE {
            if !dict.contains_key(key)
                && let Some(value) = inherited_attribute(self.src, page, key)
            {
                dict.insert(key.to_string(), value);
            }
        }
        self.copy_dict(&dict)
    }
}

impl PdfDocument {
    /// Copies pages `range` of this document to the end of `dest`.
    pub fn copy_pages_to(&self, range: Range<usize>, dest: &mut PdfDocument) -> Result<Vec<PdfPage>> {
        let at = dest.page_count();
        self.copy_pages_to_at(range, dest, at)
    }

    /// Copies pages `range` of this document into `dest`, starting at page index `at`.
    ///
    /// Named destinations used by copied link annotations are carried over:
    /// an equal entry with the same name in `dest` is reused, otherwise a new
    /// entry is added, renamed when the name is already taken.
    pub fn copy_pages_to_at(
        &self,
        range: Range<usize>,
        dest: &mut PdfDocument,
        at: usize,
    ) -> Result<Vec<PdfPage>> {
        dest.ensure_writable()?;
        if range.end > self.page_count() || range.start > range.end {
            return Err(PdfError::PageIndexOutOfRange(range.end));
        }
        if at > dest.page_count() {
            return Err(PdfError::PageIndexOutOfRange(at));
        }
        let src_pages: Vec<ObjRef> = self.pages.refs()[range.clone()].to_vec();
        let src_dests = self.dests_snapshot();

        let mut copier = PageCopier::new(&self.registry, &mut dest.registry);
        copier.excluded = self
            .pages
            .refs()
            .iter()
            .copied()
            .filter(|p| !src_pages.contains(p))
            .collect();
        let mut page_map = Vec::with_capacity(src_pages.len());
        for &page in &src_pages {
            let mapped = copier.dest.allocate()?;
            copier.cache.insert(page, mapped);
            page_map.push((page, mapped));
        }
        for &(page, mapped) in &page_map {
            let dict = copier.page_dict(page)?;
            copier.dest.set(mapped, dict)?;
        }
        copier.run()?;

        // named destinations of copied links, resolved in the source
        let mut named = Vec::new();
        for &(page, _) in &page_map {
            for annot in link_annotations(&self.registry, page) {
                let Some(PdfDestination::Named(name)) = PdfDestination::from_item(&self.registry, &PdfObject::Ref(annot))
                else {
                    continue;
                };
                let Some(target) = PdfDestination::Named(name.clone()).explicit_array(&self.registry, &src_dests) else {
                    tracing::warn!(name = %String::from_utf8_lossy(&name), "named destination not found in source");
                    continue;
                };
                let Some(target_ref) = target
                    .first()
                    .and_then(|first| target_page(first, self.pages.refs()))
                    .filter(|p| src_pages.contains(p))
                else {
                    continue;
                };
                // a page index becomes a reference to the copied page
                let copied = PdfObject::Array(
                    std::iter::once(copier.copy_value(&PdfObject::Ref(target_ref)))
                        .chain(target.iter().skip(1).map(|v| copier.copy_value(v)))
                        .collect::<Result<_>>()?,
                );
                if let Some(dest_annot) = copier.cache.get(&annot).copied() {
                    named.push((dest_annot, name, copied));
                }
            }
        }
        copier.run()?;
        let cache_len = copier.cache.len();
        drop(copier);

        for (annot, name, target) in named {
            let final_name = dest.merge_named_destination(&name, target)?;
            if final_name != name {
                rename_link_destination(&mut dest.registry, annot, &final_name)?;
            }
        }

        let mut copied = Vec::with_capacity(page_map.len());
        for (i, &(_, mapped)) in page_map.iter().enumerate() {
            dest.pages.insert(&mut dest.registry, at + i, mapped)?;
            copied.push(PdfPage(mapped));
        }
        tracing::debug!(pages = copied.len(), objects = cache_len, "pages copied");
        Ok(copied)
    }

    /// Adds `target` to the Dests tree under `name`, or under a free variant
    /// of it when a different destination already uses the name. Returns the
    /// name in use.
    fn merge_named_destination(&mut self, name: &[u8], target: PdfObject) -> Result<Vec<u8>> {
        let mut catalog = self.catalog();
        let mut tree = catalog.get_name_tree("Dests");
        let mut candidate = name.to_vec();
        let mut counter = 0;
        loop {
            let existing = tree.get(&candidate).cloned();
            match existing {
                None => {
                    tree.add_entry(candidate.clone(), target)?;
                    return Ok(candidate);
                }
                Some(existing) if same_destination(tree.registry, &existing, &target) => {
                    return Ok(candidate);
                }
                Some(_) => {
                    counter += 1;
                    candidate = [name, format!("_{counter}").as_bytes()].concat();
                }
            }
        }
    }
}

/// Link annotations of `page`.
fn link_annotations(registry: &ObjectRegistry, page: ObjRef) -> Vec<ObjRef> {
    let Some(PdfObject::Array(annots)) = registry.lookup(page).get("Annots").map(|a| registry.resolve(a)) else {
        return Vec::new();
    };
    annots
        .iter()
        .filter_map(|a| a.as_ref().ok())
        .filter(|a| matches!(registry.lookup(*a).get("Subtype"), Some(PdfObject::Name(s)) if s == "Link"))
        .collect()
}

/// Points a link's `/Dest` (or GoTo `/D`) at a different name.
fn rename_link_destination(registry: &mut ObjectRegistry, annot: ObjRef, name: &[u8]) -> Result<()> {
    let dict = registry.get_dict_mut(annot)?;
    if dict.contains_key("Dest") {
        dict.insert("Dest".into(), PdfObject::string(name));
        return Ok(());
    }
    let action_ref = match dict.get_mut("A") {
        Some(PdfObject::Dict(action)) => {
            action.insert("D".into(), PdfObject::string(name));
            return Ok(());
        }
        Some(PdfObject::Ref(r)) => *r,
        _ => return Ok(()),
    };
    registry.get_dict_mut(action_ref)?.insert("D".into(), PdfObject::string(name));
    Ok(())
}

/// Same target page, same number of parameters, same values.
fn same_destination(registry: &ObjectRegistry, existing: &PdfObject, target: &PdfObject) -> bool {
    let existing = match registry.resolve(existing) {
        PdfObject::Dict(dict) => dict.get("D").map_or(&PdfObject::Null, |d| registry.resolve(d)),
        other => other,
    };
    match (existing, target) {
        (PdfObject::Array(a), PdfObject::Array(b)) => a == b,
        _ => false,
    }
}

/// Structural equality of two objects, possibly from different documents.
///
/// References are followed on both sides; a pair of references already under
/// comparison counts as equal, so cyclic graphs terminate.
pub fn compare_objects(
    a_registry: &ObjectRegistry,
    a: &PdfObject,
    b_registry: &ObjectRegistry,
    b: &PdfObject,
) -> bool {
    Comparison::new(a_registry, b_registry, &[]).run(a, b)
}

/// Structural equality of two dictionaries; `/Parent` links are not compared.
pub fn compare_dictionaries(
    a_registry: &ObjectRegistry,
    a: &PdfDict,
    b_registry: &ObjectRegistry,
    b: &PdfDict,
) -> bool {
    let a = PdfObject::Dict(a.clone());
    let b = PdfObject::Dict(b.clone());
    Comparison::new(a_registry, b_registry, &["Parent"]).run(&a, &b)
}

struct Comparison<'a> {
    a: &'a ObjectRegistry,
    b: &'a ObjectRegistry,
    ignored: &'a [&'a str],
    seen: FxHashSet<(ObjRef, ObjRef)>,
}

impl<'a> Comparison<'a> {
    fn new(a: &'a ObjectRegistry, b: &'a ObjectRegistry, ignored: &'a [&'a str]) -> Self {
        Self {
            a,
            b,
            ignored,
            seen: FxHashSet::default(),
        }
    }

    fn run(&mut self, a: &'a PdfObject, b: &'a PdfObject) -> bool {
        let mut stack = vec![(a, b)];
        while let Some((a, b)) = stack.pop() {
            if let (PdfObject::Ref(ra), PdfObject::Ref(rb)) = (a, b)
                && !self.seen.insert((*ra, *rb))
            {
                continue;
            }
            let a = self.a.resolve(a);
            let b = self.b.resolve(b);
            match (a, b) {
                (PdfObject::Array(xs), PdfObject::Array(ys)) => {
                    if xs.len() != ys.len() {
                        return false;
                    }
                    stack.extend(xs.iter().zip(ys));
                }
                (PdfObject::Dict(x), PdfObject::Dict(y)) => {
                    if !self.push_dicts(x, y, &mut stack) {
                        return false;
                    }
                }
                (PdfObject::Stream(x), PdfObject::Stream(y)) => {
                    if x.rawdata() != y.rawdata() || !self.push_dicts(&x.attrs, &y.attrs, &mut stack) {
                        return false;
                    }
                }
                (x, y) => {
                    if x != y {
                        return false;
                    }
                }
            }
        }
        true
    }

    fn push_dicts(
        &self,
        x: &'a PdfDict,
        y: &'a PdfDict,
        stack: &mut Vec<(&'a PdfObject, &'a PdfObject)>,
    ) -> bool {
        let keys = |d: &'a PdfDict| -> BTreeMap<&'a str, &'a PdfObject> {
            d.iter()
                .filter(|(k, _)| !self.ignored.contains(&k.as_str()))
                .map(|(k, v)| (k.as_str(), v))
                .collect()
        };
        let (xk, yk) = (keys(x), keys(y));
        if xk.len() != yk.len() {
            return false;
        }
        for (key, xv) in xk {
            match yk.get(key) {
                Some(yv) => stack.push((xv, yv)),
                None => return false,
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_handles_cycles_and_renumbering() {
        let mut a = ObjectRegistry::new();
        let a1 = a.allocate().unwrap();
        let a2 = a.allocate().unwrap();
        a.set(a1, crate::pdf_dict! { "Next" => a2, "V" => 1 }).unwrap();
        a.set(a2, crate::pdf_dict! { "Next" => a1, "V" => 2 }).unwrap();

        let mut b = ObjectRegistry::new();
        b.register(PdfObject::Null).unwrap();
        let b1 = b.allocate().unwrap();
        let b2 = b.allocate().unwrap();
        b.set(b1, crate::pdf_dict! { "Next" => b2, "V" => 1 }).unwrap();
        b.set(b2, crate::pdf_dict! { "Next" => b1, "V" => 2 }).unwrap();

        assert!(compare_objects(&a, &a1.into(), &b, &b1.into()));
        assert!(!compare_objects(&a, &a1.into(), &b, &b2.into()));
    }

    #[test]
    fn test_compare_dictionaries_ignores_parent() {
        let registry = ObjectRegistry::new();
        let x = crate::pdf_dict! { "Parent" => ObjRef::new(1, 0), "Rotate" => 90 };
        let y = crate::pdf_dict! { "Parent" => ObjRef::new(7, 0), "Rotate" => 90 };
        assert!(compare_dictionaries(&registry, &x, &registry, &y));
    }
}
