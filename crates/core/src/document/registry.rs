//! Indirect object registry.
//!
//! Owns every indirect object of a document together with the
//! cross-reference table that numbers them. Containers only ever hold
//! `ObjRef`s; the registry is the single owner of the referenced values.

use super::xref::{CrossReferenceTable, XrefEntry};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use rustc_hash::{FxHashMap, FxHashSet};

/// Longest chain of references-to-references followed by `resolve`.
const MAX_REFERENCE_HOPS: usize = 32;

static NULL: PdfObject = PdfObject::Null;

#[derive(Debug, Default)]
pub struct ObjectRegistry {
    pub(crate) xref: CrossReferenceTable,
    /// Values keyed by number, with the generation they were stored under
    objects: FxHashMap<u32, (u16, PdfObject)>,
    /// Numbers changed since load; these make up an incremental section
    modified: FxHashSet<u32>,
    /// Numbers already written to the output and released from memory
    flushed: FxHashSet<u32>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh reference without a value.
    pub fn allocate(&mut self) -> Result<ObjRef> {
        let r = self.xref.allocate()?;
        self.modified.insert(r.objid);
        Ok(r)
    }

    /// Allocates a reference and stores `obj` under it.
    pub fn register(&mut self, obj: impl Into<PdfObject>) -> Result<ObjRef> {
        let r = self.allocate()?;
        self.objects.insert(r.objid, (r.genno, obj.into()));
        Ok(r)
    }

    /// Stores an object read from an existing file without marking it modified.
    pub(crate) fn insert_loaded(&mut self, r: ObjRef, obj: PdfObject) {
        self.objects.insert(r.objid, (r.genno, obj));
    }

    /// Value stored under exactly `r`; a reference with another generation
    /// than the stored one is stale.
    fn slot(&self, r: ObjRef) -> Option<&PdfObject> {
        match self.objects.get(&r.objid) {
            Some((genno, obj)) if *genno == r.genno => Some(obj),
            _ => None,
        }
    }

    /// Whether `r` names the object currently using its number.
    fn is_current(&self, r: ObjRef) -> bool {
        match self.objects.get(&r.objid) {
            Some((genno, _)) => *genno == r.genno,
            None => self
                .xref
                .get(r.objid)
                .is_some_and(|e| e.is_in_use() && e.genno() == r.genno),
        }
    }

    pub fn contains(&self, r: ObjRef) -> bool {
        self.slot(r).is_some()
    }

    pub fn is_flushed(&self, r: ObjRef) -> bool {
        self.flushed.contains(&r.objid)
    }

    pub fn is_modified(&self, r: ObjRef) -> bool {
        self.modified.contains(&r.objid)
    }

    pub fn get(&self, r: ObjRef) -> Result<&PdfObject> {
        if self.flushed.contains(&r.objid) {
            return Err(PdfError::ObjectFlushed(r.objid));
        }
        self.slot(r).ok_or(PdfError::ObjectNotFound(r.objid))
    }

    /// Mutable access; the object is written again on the next save.
    pub fn get_mut(&mut self, r: ObjRef) -> Result<&mut PdfObject> {
        if self.flushed.contains(&r.objid) {
            return Err(PdfError::ObjectFlushed(r.objid));
        }
        let obj = match self.objects.get_mut(&r.objid) {
            Some((genno, obj)) if *genno == r.genno => obj,
            _ => return Err(PdfError::ObjectNotFound(r.objid)),
        };
        self.modified.insert(r.objid);
        Ok(obj)
    }

    pub fn get_dict_mut(&mut self, r: ObjRef) -> Result<&mut PdfDict> {
        self.get_mut(r)?.as_dict_mut()
    }

    /// Replaces the value stored under `r`.
    pub fn set(&mut self, r: ObjRef, obj: impl Into<PdfObject>) -> Result<()> {
        if self.flushed.contains(&r.objid) {
            return Err(PdfError::ObjectFlushed(r.objid));
        }
        if !self.xref.get(r.objid).is_some_and(XrefEntry::is_in_use) || !self.is_current(r) {
            return Err(PdfError::ObjectNotFound(r.objid));
        }
        self.objects.insert(r.objid, (r.genno, obj.into()));
        self.modified.insert(r.objid);
        Ok(())
    }

    /// Drops the object and releases its number for reuse. A stale
    /// reference frees nothing.
    pub fn free(&mut self, r: ObjRef) {
        if !self.is_current(r) {
            tracing::warn!(reference = %r, "free of a stale reference ignored");
            return;
        }
        self.objects.remove(&r.objid);
        self.flushed.remove(&r.objid);
        self.xref.free(r);
        self.modified.insert(r.objid);
    }

    /// Follows references until a direct object is reached.
    ///
    /// A reference to a freed, flushed or missing object, or one whose
    /// generation is not the current one, resolves to `Null`.
    pub fn resolve<'a>(&'a self, obj: &'a PdfObject) -> &'a PdfObject {
        let mut current = obj;
        for _ in 0..MAX_REFERENCE_HOPS {
            let PdfObject::Ref(r) = current else {
                return current;
            };
            match self.slot(*r) {
                Some(target) if !self.flushed.contains(&r.objid) => current = target,
                _ => {
                    tracing::warn!(reference = %r, "dangling reference resolved to null");
                    return &NULL;
                }
            }
        }
        tracing::warn!("reference chain too long, resolved to null");
        &NULL
    }

    /// Value behind `r`, resolved; `Null` when dangling.
    pub fn lookup(&self, r: ObjRef) -> &PdfObject {
        match self.slot(r) {
            Some(obj) if !self.flushed.contains(&r.objid) => self.resolve(obj),
            _ => {
                tracing::warn!(reference = %r, "dangling reference resolved to null");
                &NULL
            }
        }
    }

    /// Resolves `obj` and returns its dictionary (stream attributes included).
    pub fn resolve_dict<'a>(&'a self, obj: &'a PdfObject) -> Option<&'a PdfDict> {
        self.resolve(obj).as_dict().ok()
    }

    /// Looks `key` up in `dict` and resolves the value.
    pub fn get_in<'a>(&'a self, dict: &'a PdfDict, key: &str) -> Option<&'a PdfObject> {
        dict.get(key).map(|v| self.resolve(v)).filter(|v| !v.is_null())
    }

    /// Removes the value for writing, marking the number flushed.
    pub(crate) fn take_for_flush(&mut self, r: ObjRef) -> Option<PdfObject> {
        if self.slot(r).is_none() {
            return None;
        }
        let (_, obj) = self.objects.remove(&r.objid)?;
        self.flushed.insert(r.objid);
        Some(obj)
    }

    /// Numbers changed since load, ascending.
    pub fn modified_numbers(&self) -> Vec<u32> {
        let mut numbers: Vec<u32> = self.modified.iter().copied().collect();
        numbers.sort_unstable();
        numbers
    }

    /// References of all in-use objects held in memory, ascending.
    pub fn live_refs(&self) -> Vec<ObjRef> {
        self.xref
            .in_use()
            .filter(|r| self.slot(*r).is_some())
            .collect()
    }

    pub fn xref(&self) -> &CrossReferenceTable {
        &self.xref
    }

    pub(crate) fn xref_mut(&mut self) -> &mut CrossReferenceTable {
        &mut self.xref
    }

    pub(crate) fn clear_modified(&mut self) {
        self.modified.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut reg = ObjectRegistry::new();
        let r = reg.register(PdfObject::Int(7)).unwrap();
        assert_eq!(reg.get(r).unwrap(), &PdfObject::Int(7));
        assert!(reg.is_modified(r));
    }

    #[test]
    fn test_resolve_chain_and_dangling() {
        let mut reg = ObjectRegistry::new();
        let inner = reg.register(PdfObject::name("X")).unwrap();
        let outer = reg.register(inner).unwrap();
        assert_eq!(
            reg.resolve(&PdfObject::Ref(outer)),
            &PdfObject::name("X")
        );
        reg.free(inner);
        assert!(reg.resolve(&PdfObject::Ref(outer)).is_null());
    }

    #[test]
    fn test_flushed_object_rejects_access() {
        let mut reg = ObjectRegistry::new();
        let r = reg.register(PdfObject::Int(1)).unwrap();
        reg.take_for_flush(r).unwrap();
        assert!(matches!(reg.get_mut(r), Err(PdfError::ObjectFlushed(_))));
        assert!(matches!(
            reg.set(r, PdfObject::Int(2)),
            Err(PdfError::ObjectFlushed(_))
        ));
    }

    #[test]
    fn test_freed_number_reused() {
        let mut reg = ObjectRegistry::new();
        let a = reg.register(PdfObject::Null).unwrap();
        reg.free(a);
        let b = reg.register(PdfObject::Bool(true)).unwrap();
        assert_eq!(b.objid, a.objid);
        assert_eq!(b.genno, 1);
    }

    #[test]
    fn test_stale_generation_is_dangling() {
        let mut reg = ObjectRegistry::new();
        let old = reg.register(PdfObject::name("Old")).unwrap();
        reg.free(old);
        let new = reg.register(PdfObject::name("New")).unwrap();
        assert_eq!((new.objid, new.genno), (old.objid, 1));

        assert!(reg.resolve(&PdfObject::Ref(old)).is_null());
        assert!(reg.lookup(old).is_null());
        assert!(matches!(reg.get(old), Err(PdfError::ObjectNotFound(_))));
        assert!(matches!(reg.get_mut(old), Err(PdfError::ObjectNotFound(_))));
        assert!(reg.set(old, PdfObject::Int(0)).is_err());
        assert!(!reg.contains(old));

        // freeing through the stale reference leaves the new object alone
        reg.free(old);
        assert_eq!(reg.lookup(new), &PdfObject::name("New"));
        assert_eq!(reg.live_refs(), vec![new]);
    }
}
