//! Serializing a document: body, object streams, cross-reference section
//! and trailer, either as a complete file or as an incremental update
//! appended to the original bytes.

use super::registry::ObjectRegistry;
use super::serialize::{write_indirect, write_object};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use itertools::Itertools;
use rustc_hash::FxHashSet;

/// Most objects packed into one object stream.
pub const MAX_OBJECTS_PER_STREAM: usize = 200;

/// Options for writing a document.
#[derive(Debug, Clone, PartialEq)]
pub struct WriterProperties {
    /// Pack eligible objects into object streams and write an xref stream.
    pub full_compression: bool,

    /// zlib level (0-9) used for object streams, xref streams and `compress_streams`.
    pub compression_level: u32,

    /// Flate-compress unfiltered content streams on write.
    pub compress_streams: bool,

    /// Version written in the `%PDF-x.y` header.
    pub pdf_version: String,

    /// Write a trailer `/ID`.
    pub add_document_id: bool,
}

impl Default for WriterProperties {
    fn default() -> Self {
        Self {
            full_compression: false,
            compression_level: 6,
            compress_streams: false,
            pdf_version: "1.7".to_string(),
            add_document_id: true,
        }
    }
}

impl WriterProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_full_compression_mode(mut self, on: bool) -> Self {
        self.full_compression = on;
        self
    }

    pub fn set_compression_level(mut self, level: u32) -> Self {
        self.compression_level = level.min(9);
        self
    }

    pub fn set_compress_streams(mut self, on: bool) -> Self {
        self.compress_streams = on;
        self
    }

    pub fn set_pdf_version(mut self, version: &str) -> Self {
        self.pdf_version = version.to_string();
        self
    }

    pub fn add_document_id(mut self, on: bool) -> Self {
        self.add_document_id = on;
        self
    }
}

/// Options for modifying an existing document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StampingProperties {
    /// Keep the original bytes and append an incremental update section.
    pub append_mode: bool,
}

impl StampingProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_append_mode(mut self) -> Self {
        self.append_mode = true;
        self
    }
}

/// Trailer values the document hands to the writer at close.
#[derive(Debug, Clone)]
pub(crate) struct TrailerInfo {
    pub root: ObjRef,
    pub info: Option<ObjRef>,
    /// First `/ID` element of the original file, kept across updates
    pub original_id: Option<Vec<u8>>,
    /// Offset of the previous section when appending
    pub prev: Option<u64>,
    pub encrypt: Option<PdfObject>,
    pub use_xref_stream: bool,
}

/// Output buffer plus the bookkeeping needed to flush objects early.
#[derive(Debug)]
pub(crate) struct PdfWriter {
    props: WriterProperties,
    out: Vec<u8>,
    written: FxHashSet<u32>,
    incremental: bool,
}

impl PdfWriter {
    /// Writer for a complete file; the header is written immediately.
    pub fn new(props: WriterProperties) -> Self {
        let mut out = Vec::new();
        out.extend_from_slice(format!("%PDF-{}\n", props.pdf_version).as_bytes());
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            props,
            out,
            written: FxHashSet::default(),
            incremental: false,
        }
    }

    /// Writer that appends an update section to `original`.
    pub fn appending(props: WriterProperties, original: &[u8]) -> Self {
        let mut out = original.to_vec();
        if !out.ends_with(b"\n") {
            out.push(b'\n');
        }
        Self {
            props,
            out,
            written: FxHashSet::default(),
            incremental: true,
        }
    }

    pub fn properties(&self) -> &WriterProperties {
        &self.props
    }

    pub fn is_incremental(&self) -> bool {
        self.incremental
    }

    /// Writes `r` now and drops it from memory. Later access reports it as flushed.
    pub fn flush_object(&mut self, registry: &mut ObjectRegistry, r: ObjRef) -> Result<()> {
        if self.written.contains(&r.objid) {
            return Ok(());
        }
        hoist_streams(registry, r)?;
        let Some(obj) = registry.take_for_flush(r) else {
            return Err(PdfError::ObjectNotFound(r.objid));
        };
        self.write_direct(registry, r, &obj)
    }

    fn write_direct(&mut self, registry: &mut ObjectRegistry, r: ObjRef, obj: &PdfObject) -> Result<()> {
        let compressed;
        let obj = match obj {
            PdfObject::Stream(stream) if self.props.compress_streams && !stream.has_filters() => {
                let mut stream = PdfStream::clone(stream);
                stream.compress(self.props.compression_level)?;
                compressed = PdfObject::from(stream);
                &compressed
            }
            _ => obj,
        };
        registry.xref_mut().set_offset(r, self.out.len() as u64);
        write_indirect(&mut self.out, r, obj);
        self.written.insert(r.objid);
        Ok(())
    }

    /// Writes the remaining objects, the cross-reference section and the trailer.
    pub fn finish(mut self, registry: &mut ObjectRegistry, trailer: TrailerInfo) -> Result<Vec<u8>> {
        let mut candidates: Vec<ObjRef> = if self.incremental {
            let modified: FxHashSet<u32> = registry.modified_numbers().into_iter().collect();
            registry
                .live_refs()
                .into_iter()
                .filter(|r| modified.contains(&r.objid))
                .collect()
        } else {
            registry.live_refs()
        };
        candidates.retain(|r| !self.written.contains(&r.objid));
        let mut extra = Vec::new();
        for r in &candidates {
            extra.extend(hoist_streams(registry, *r)?);
        }
        candidates.extend(extra);
        candidates.sort_unstable();

        let encrypt_ref = match &trailer.encrypt {
            Some(PdfObject::Ref(r)) => Some(*r),
            _ => None,
        };
        let use_xref_stream = self.props.full_compression || trailer.use_xref_stream;

        let mut direct = candidates.clone();
        if self.props.full_compression {
            // candidates are fixed before any object stream number is allocated
            let eligible: Vec<ObjRef> = candidates
                .iter()
                .copied()
                .filter(|r| {
                    r.genno == 0
                        && Some(*r) != encrypt_ref
                        && matches!(registry.get(*r), Ok(obj) if !matches!(obj, PdfObject::Stream(_)))
                })
                .collect();
            let packed: FxHashSet<u32> = eligible.iter().map(|r| r.objid).collect();
            direct.retain(|r| !packed.contains(&r.objid));
            for chunk in &eligible.into_iter().chunks(MAX_OBJECTS_PER_STREAM) {
                let members: Vec<ObjRef> = chunk.collect();
                let objstm = self.build_object_stream(registry, &members)?;
                let stm_ref = registry.register(objstm)?;
                for (index, member) in members.iter().enumerate() {
                    registry
                        .xref_mut()
                        .mark_compressed(*member, stm_ref.objid, index as u32);
                    self.written.insert(member.objid);
                }
                direct.push(stm_ref);
            }
            tracing::debug!(objects = packed.len(), "packed objects into object streams");
        }

        for r in direct {
            let obj = registry.get(r)?.clone();
            self.write_direct(registry, r, &obj)?;
        }

        let id = self.document_id(&trailer);
        let mut trailer_dict = PdfDict::new();
        trailer_dict.insert("Root".into(), PdfObject::Ref(trailer.root));
        if let Some(info) = trailer.info {
            trailer_dict.insert("Info".into(), PdfObject::Ref(info));
        }
        if let Some(encrypt) = trailer.encrypt {
            trailer_dict.insert("Encrypt".into(), encrypt);
        }
        if let Some(id) = id {
            trailer_dict.insert("ID".into(), id);
        }
        if let Some(prev) = trailer.prev {
            trailer_dict.insert("Prev".into(), PdfObject::Int(prev as i64));
        }

        let only = self.incremental.then(|| registry.modified_numbers());
        let startxref = if use_xref_stream {
            self.write_xref_stream(registry, trailer_dict, only)?
        } else {
            self.write_xref_table(registry, trailer_dict, only.as_deref())?
        };
        self.out
            .extend_from_slice(format!("startxref\n{}\n%%EOF\n", startxref).as_bytes());
        registry.clear_modified();
        Ok(self.out)
    }

    fn build_object_stream(&self, registry: &ObjectRegistry, members: &[ObjRef]) -> Result<PdfStream> {
        let mut header = Vec::new();
        let mut body = Vec::new();
        for member in members {
            header.extend_from_slice(format!("{} {} ", member.objid, body.len()).as_bytes());
            write_object(&mut body, registry.get(*member)?);
            body.push(b'\n');
        }
        let first = header.len();
        header.extend_from_slice(&body);
        let mut stream = PdfStream::new(
            crate::pdf_dict! {
                "Type" => PdfObject::name("ObjStm"),
                "N" => members.len(),
                "First" => first,
            },
            header,
        );
        stream.compress(self.props.compression_level)?;
        Ok(stream)
    }

    fn document_id(&self, trailer: &TrailerInfo) -> Option<PdfObject> {
        if !self.props.add_document_id && trailer.original_id.is_none() {
            return None;
        }
        let digest = md5::compute(&self.out).0.to_vec();
        let first = trailer.original_id.clone().unwrap_or_else(|| digest.clone());
        Some(PdfObject::Array(vec![
            PdfObject::String(first),
            PdfObject::String(digest),
        ]))
    }

    fn write_xref_table(
        &mut self,
        registry: &ObjectRegistry,
        mut trailer: PdfDict,
        only: Option<&[u32]>,
    ) -> Result<u64> {
        let startxref = self.out.len() as u64;
        registry.xref().write_classic(&mut self.out, only)?;
        trailer.insert("Size".into(), PdfObject::from(registry.xref().size() as i64));
        trailer.move_index(trailer.len() - 1, 0);
        self.out.extend_from_slice(b"trailer\n");
        write_object(&mut self.out, &PdfObject::Dict(trailer));
        self.out.push(b'\n');
        tracing::debug!(offset = startxref, "wrote cross-reference table");
        Ok(startxref)
    }

    fn write_xref_stream(
        &mut self,
        registry: &mut ObjectRegistry,
        trailer: PdfDict,
        only: Option<Vec<u32>>,
    ) -> Result<u64> {
        let xref_ref = registry.allocate()?;
        let startxref = self.out.len() as u64;
        registry.xref_mut().set_offset(xref_ref, startxref);
        let only = only.map(|mut numbers| {
            numbers.push(xref_ref.objid);
            numbers
        });
        let (rows, w, index) = registry.xref().stream_rows(only.as_deref())?;
        let size = registry.xref().size();

        let mut attrs = crate::pdf_dict! {
            "Type" => PdfObject::name("XRef"),
            "Size" => size as i64,
            "W" => PdfObject::Array(w.iter().map(|&n| PdfObject::from(n)).collect()),
        };
        if index != [(0, size)] {
            let pairs = index
                .iter()
                .flat_map(|&(first, count)| [PdfObject::from(first as i64), PdfObject::from(count as i64)])
                .collect::<Vec<_>>();
            attrs.insert("Index".into(), PdfObject::Array(pairs));
        }
        attrs.extend(trailer);
        let mut stream = PdfStream::new(attrs, rows);
        stream.compress(self.props.compression_level)?;
        write_indirect(&mut self.out, xref_ref, &PdfObject::from(stream));
        self.written.insert(xref_ref.objid);
        tracing::debug!(offset = startxref, "wrote cross-reference stream");
        Ok(startxref)
    }
}

/// Replaces streams nested inside `r` by references to new indirect objects.
fn hoist_streams(registry: &mut ObjectRegistry, r: ObjRef) -> Result<Vec<ObjRef>> {
    let mut hoisted = Vec::new();
    let mut pending = vec![r];
    while let Some(current) = pending.pop() {
        let Ok(obj) = registry.get(current) else {
            continue;
        };
        if !contains_nested_stream(obj, true) {
            continue;
        }
        let mut obj = std::mem::take(registry.get_mut(current)?);
        let mut nested = Vec::new();
        extract_nested_streams(&mut obj, true, &mut nested);
        for (path, stream) in nested {
            let new_ref = registry.register(stream)?;
            if let Some(slot) = slot_mut(&mut obj, &path) {
                *slot = PdfObject::Ref(new_ref);
            }
            hoisted.push(new_ref);
            pending.push(new_ref);
        }
        registry.set(current, obj)?;
    }
    Ok(hoisted)
}

/// Path from an object down to a nested value: dictionary keys or array indices.
#[derive(Debug, Clone)]
enum Step {
    Key(String),
    Index(usize),
}

fn contains_nested_stream(obj: &PdfObject, top: bool) -> bool {
    match obj {
        PdfObject::Stream(stream) => {
            !top || stream.attrs.values().any(|v| contains_nested_stream(v, false))
        }
        PdfObject::Dict(dict) => dict.values().any(|v| contains_nested_stream(v, false)),
        PdfObject::Array(arr) => arr.iter().any(|v| contains_nested_stream(v, false)),
        _ => false,
    }
}

/// Takes every nested stream out of `obj`, leaving `Null` in its slot.
fn extract_nested_streams(obj: &mut PdfObject, top: bool, found: &mut Vec<(Vec<Step>, PdfObject)>) {
    let mut stack: Vec<(Vec<Step>, bool)> = vec![(Vec::new(), top)];
    while let Some((path, is_top)) = stack.pop() {
        let Some(slot) = slot_mut(obj, &path) else {
            continue;
        };
        if let PdfObject::Stream(_) = slot
            && !is_top
        {
            found.push((path, std::mem::take(slot)));
            continue;
        }
        let children: Vec<Step> = match slot {
            PdfObject::Stream(stream) => stream.attrs.keys().cloned().map(Step::Key).collect(),
            PdfObject::Dict(dict) => dict.keys().cloned().map(Step::Key).collect(),
            PdfObject::Array(arr) => (0..arr.len()).map(Step::Index).collect(),
            _ => Vec::new(),
        };
        for step in children {
            let mut child = path.clone();
            child.push(step);
            stack.push((child, false));
        }
    }
}

fn slot_mut<'a>(obj: &'a mut PdfObject, path: &[Step]) -> Option<&'a mut PdfObject> {
    let mut current = obj;
    for step in path {
        current = match (current, step) {
            (PdfObject::Stream(stream), Step::Key(key)) => stream.attrs.get_mut(key)?,
            (PdfObject::Dict(dict), Step::Key(key)) => dict.get_mut(key)?,
            (PdfObject::Array(arr), Step::Index(i)) => arr.get_mut(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::reader::PdfReader;

    fn minimal(registry: &mut ObjectRegistry) -> ObjRef {
        let pages = registry
            .register(crate::pdf_dict! {
                "Type" => PdfObject::name("Pages"),
                "Kids" => PdfObject::Array(vec![]),
                "Count" => 0,
            })
            .unwrap();
        registry
            .register(crate::pdf_dict! {
                "Type" => PdfObject::name("Catalog"),
                "Pages" => pages,
            })
            .unwrap()
    }

    fn trailer(root: ObjRef) -> TrailerInfo {
        TrailerInfo {
            root,
            info: None,
            original_id: None,
            prev: None,
            encrypt: None,
            use_xref_stream: false,
        }
    }

    #[test]
    fn test_classic_output_reads_back() {
        let mut registry = ObjectRegistry::new();
        let root = minimal(&mut registry);
        let bytes = PdfWriter::new(WriterProperties::default())
            .finish(&mut registry, trailer(root))
            .unwrap();
        assert!(bytes.starts_with(b"%PDF-1.7\n"));
        assert!(bytes.ends_with(b"%%EOF\n"));
        let loaded = PdfReader::new(bytes).read().unwrap();
        assert!(!loaded.has_rebuilt_xref);
        assert!(loaded.trailer.contains_key("ID"));
    }

    #[test]
    fn test_full_compression_reads_back() {
        let mut registry = ObjectRegistry::new();
        let root = minimal(&mut registry);
        for i in 0..250 {
            registry.register(PdfObject::Int(i)).unwrap();
        }
        let props = WriterProperties::new().set_full_compression_mode(true);
        let bytes = PdfWriter::new(props).finish(&mut registry, trailer(root)).unwrap();
        let loaded = PdfReader::new(bytes).read().unwrap();
        assert!(!loaded.has_rebuilt_xref);
        assert!(loaded.uses_xref_stream);
        // 252 eligible objects need two object streams
        let objstms = loaded
            .containers
            .iter()
            .filter(|r| loaded.registry.lookup(**r).is_type("ObjStm"))
            .count();
        assert_eq!(objstms, 2);
        assert_eq!(loaded.registry.lookup(ObjRef::new(3, 0)), &PdfObject::Int(0));
    }

    #[test]
    fn test_nested_stream_is_hoisted() {
        let mut registry = ObjectRegistry::new();
        let root = minimal(&mut registry);
        let holder = registry
            .register(crate::pdf_dict! {
                "Inner" => PdfStream::from_data(b"data".to_vec()),
            })
            .unwrap();
        let bytes = PdfWriter::new(WriterProperties::default())
            .finish(&mut registry, trailer(root))
            .unwrap();
        let loaded = PdfReader::new(bytes).read().unwrap();
        let inner = loaded.registry.lookup(holder).get("Inner").unwrap().clone();
        assert!(inner.is_ref());
        assert_eq!(
            loaded.registry.resolve(&inner).as_stream().unwrap().rawdata(),
            b"data"
        );
    }

    #[test]
    fn test_flushed_object_written_once() {
        let mut registry = ObjectRegistry::new();
        let root = minimal(&mut registry);
        let big = registry.register(PdfObject::name("Flushed")).unwrap();
        let mut writer = PdfWriter::new(WriterProperties::default());
        writer.flush_object(&mut registry, big).unwrap();
        let bytes = writer.finish(&mut registry, trailer(root)).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert_eq!(text.matches("/Flushed").count(), 1);
        let loaded = PdfReader::new(bytes.to_vec()).read().unwrap();
        assert!(!loaded.has_rebuilt_xref);
        assert_eq!(loaded.registry.lookup(big), &PdfObject::name("Flushed"));
    }

    #[test]
    fn test_unwritten_allocation_is_fatal() {
        let mut registry = ObjectRegistry::new();
        let root = minimal(&mut registry);
        registry.allocate().unwrap();
        let err = PdfWriter::new(WriterProperties::default())
            .finish(&mut registry, trailer(root))
            .unwrap_err();
        assert!(matches!(err, PdfError::DocumentCorrupted(_)));
    }
}
