//! The document: owner of the object registry, page tree, catalog caches and
//! (when writable) the output writer.

use super::catalog::{CatalogState, PdfCatalog, format_page_labels, write_catalog_state};
use super::name_tree::PdfNameTree;
use super::page::{DEFAULT_PAGE_SIZE, INHERITABLE, PageTree, PdfPage, inherited_attribute, new_page_dict, rect_from};
use super::reader::PdfReader;
use super::registry::ObjectRegistry;
use super::writer::{PdfWriter, StampingProperties, TrailerInfo, WriterProperties};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};
use crate::utils::{Rect, decode_text};
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::Write;

const PRODUCER: &str = concat!("vellum ", env!("CARGO_PKG_VERSION"));

#[derive(Debug)]
pub struct PdfDocument {
    pub(crate) registry: ObjectRegistry,
    pub(crate) catalog_ref: ObjRef,
    pub(crate) info_ref: Option<ObjRef>,
    pub(crate) state: CatalogState,
    pub(crate) pages: PageTree,
    writer: Option<PdfWriter>,
    /// First element of the original `/ID`
    original_id: Option<Vec<u8>>,
    encrypt: Option<PdfObject>,
    has_rebuilt_xref: bool,
    uses_xref_stream: bool,
    startxref: u64,
    version: Option<String>,
}

impl PdfDocument {
    /// New empty document.
    pub fn new(props: WriterProperties) -> Result<Self> {
        let mut registry = ObjectRegistry::new();
        let pages_ref = registry.register(crate::pdf_dict! {
            "Type" => PdfObject::name("Pages"),
            "Kids" => PdfObject::Array(Vec::new()),
            "Count" => 0,
        })?;
        let catalog_ref = registry.register(crate::pdf_dict! {
            "Type" => PdfObject::name("Catalog"),
            "Pages" => pages_ref,
        })?;
        let info_ref = registry.register(crate::pdf_dict! { "Producer" => PdfObject::text(PRODUCER) })?;
        let version = Some(props.pdf_version.clone());
        Ok(Self {
            registry,
            catalog_ref,
            info_ref: Some(info_ref),
            state: CatalogState::default(),
            pages: PageTree::new(pages_ref),
            writer: Some(PdfWriter::new(props)),
            original_id: None,
            encrypt: None,
            has_rebuilt_xref: false,
            uses_xref_stream: false,
            startxref: 0,
            version,
        })
    }

    /// Opens an existing document read-only.
    pub fn open(data: impl Into<Bytes>) -> Result<Self> {
        Self::load(data.into(), None)
    }

    /// Opens an existing document for modification.
    ///
    /// In append mode the original bytes are kept as they are and the changes
    /// are written as an incremental update; otherwise the file is rewritten.
    pub fn open_for_stamping(
        data: impl Into<Bytes>,
        props: WriterProperties,
        stamping: StampingProperties,
    ) -> Result<Self> {
        let data = data.into();
        let writer = if stamping.append_mode {
            PdfWriter::appending(props, &data)
        } else {
            PdfWriter::new(props)
        };
        Self::load(data, Some(writer))
    }

    fn load(data: Bytes, writer: Option<PdfWriter>) -> Result<Self> {
        let loaded = PdfReader::new(data).read()?;
        let mut registry = loaded.registry;
        let trailer = loaded.trailer;

        let catalog_ref = trailer
            .get("Root")
            .and_then(|r| r.as_ref().ok())
            .ok_or(PdfError::NoCatalog)?;
        let pages_ref = match registry.lookup(catalog_ref).get("Pages") {
            Some(PdfObject::Ref(r)) => *r,
            _ => return Err(PdfError::DocumentCorrupted("catalog has no /Pages reference".into())),
        };
        let info_ref = trailer.get("Info").and_then(|r| r.as_ref().ok());
        let original_id = trailer
            .get("ID")
            .and_then(|id| id.as_array().ok())
            .and_then(|id| id.first())
            .and_then(|first| first.as_string().ok())
            .map(<[u8]>::to_vec);

        let rewriting = writer.as_ref().is_some_and(|w| !w.is_incremental());
        if rewriting {
            // a full rewrite produces its own object and xref streams
            for container in &loaded.containers {
                registry.free(*container);
            }
            let unloaded: Vec<ObjRef> = registry
                .xref()
                .in_use()
                .filter(|r| !registry.contains(*r))
                .collect();
            for r in unloaded {
                tracing::warn!(reference = %r, "dropping object that could not be loaded");
                registry.free(r);
            }
        }

        let pages = PageTree::read(&registry, pages_ref);
        Ok(Self {
            registry,
            catalog_ref,
            info_ref,
            state: CatalogState::default(),
            pages,
            writer,
            original_id,
            encrypt: trailer.get("Encrypt").cloned(),
            has_rebuilt_xref: loaded.has_rebuilt_xref,
            uses_xref_stream: loaded.uses_xref_stream,
            startxref: loaded.startxref,
            version: loaded.version,
        })
    }

    pub fn is_writable(&self) -> bool {
        self.writer.is_some()
    }

    pub(crate) fn ensure_writable(&self) -> Result<()> {
        if self.is_writable() {
            Ok(())
        } else {
            Err(PdfError::NotWritable)
        }
    }

    /// Whether the cross-reference table had to be rebuilt by scanning the file.
    pub fn has_rebuilt_xref(&self) -> bool {
        self.has_rebuilt_xref
    }

    /// Whether the last cross-reference section of the file was a stream.
    pub fn uses_xref_stream(&self) -> bool {
        self.uses_xref_stream
    }

    /// Offset of the last cross-reference section of an opened file.
    pub fn startxref(&self) -> u64 {
        self.startxref
    }

    /// Version from the file header.
    pub fn pdf_version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn registry(&self) -> &ObjectRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ObjectRegistry {
        &mut self.registry
    }

    /// Registers `obj` as a new indirect object.
    pub fn add_object(&mut self, obj: impl Into<PdfObject>) -> Result<ObjRef> {
        self.ensure_writable()?;
        self.registry.register(obj)
    }

    pub fn get_object(&self, r: ObjRef) -> Result<&PdfObject> {
        self.registry.get(r)
    }

    pub fn resolve<'a>(&'a self, obj: &'a PdfObject) -> &'a PdfObject {
        self.registry.resolve(obj)
    }

    pub fn catalog(&mut self) -> PdfCatalog<'_> {
        PdfCatalog { doc: self }
    }

    pub fn catalog_ref(&self) -> ObjRef {
        self.catalog_ref
    }

    // pages

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, index: usize) -> Result<PdfPage> {
        self.pages
            .get(index)
            .map(PdfPage)
            .ok_or(PdfError::PageIndexOutOfRange(index))
    }

    pub fn pages(&self) -> Vec<PdfPage> {
        self.pages.refs().iter().map(|&p| PdfPage(p)).collect()
    }

    pub fn page_index(&self, page: PdfPage) -> Option<usize> {
        self.pages.position(page.0)
    }

    /// Appends an A4 page.
    pub fn add_new_page(&mut self) -> Result<PdfPage> {
        self.insert_new_page(self.page_count(), DEFAULT_PAGE_SIZE)
    }

    pub fn add_new_page_with_size(&mut self, size: Rect) -> Result<PdfPage> {
        self.insert_new_page(self.page_count(), size)
    }

    /// Inserts an empty page at `index`.
    pub fn insert_new_page(&mut self, index: usize, size: Rect) -> Result<PdfPage> {
        self.ensure_writable()?;
        if index > self.page_count() {
            return Err(PdfError::PageIndexOutOfRange(index));
        }
        let resources = self.registry.register(PdfDict::new())?;
        let page = self.registry.register(new_page_dict(size, resources))?;
        self.pages.insert(&mut self.registry, index, page)?;
        Ok(PdfPage(page))
    }

    /// Removes the page at `index` together with the outline items pointing at it.
    pub fn remove_page(&mut self, index: usize) -> Result<()> {
        self.ensure_writable()?;
        let page = self.pages.remove(index)?;
        self.catalog().remove_outlines_for_page(page)
    }

    /// Inherited page attribute (Resources, MediaBox, CropBox, Rotate) or a plain entry.
    pub fn page_attribute(&self, page: PdfPage, key: &str) -> Option<PdfObject> {
        inherited_attribute(&self.registry, page.0, key)
    }

    pub fn media_box(&self, page: PdfPage) -> Option<Rect> {
        let media = self.page_attribute(page, "MediaBox")?;
        rect_from(&self.registry, &media)
    }

    pub fn crop_box(&self, page: PdfPage) -> Option<Rect> {
        match self.page_attribute(page, "CropBox") {
            Some(crop) => rect_from(&self.registry, &crop),
            None => self.media_box(page),
        }
    }

    pub fn rotation(&self, page: PdfPage) -> i64 {
        self.page_attribute(page, "Rotate")
            .and_then(|r| self.registry.resolve(&r).as_int().ok())
            .map_or(0, |r| r.rem_euclid(360))
    }

    pub fn set_rotation(&mut self, page: PdfPage, degrees: i64) -> Result<()> {
        self.ensure_writable()?;
        if degrees % 90 != 0 {
            return Err(PdfError::InvalidArgument(format!("rotation {degrees}")));
        }
        self.registry
            .get_dict_mut(page.0)?
            .insert("Rotate".into(), PdfObject::Int(degrees.rem_euclid(360)));
        Ok(())
    }

    /// Writes the page and its content streams now and releases them.
    ///
    /// The page can no longer be changed afterwards.
    pub fn flush_page(&mut self, page: PdfPage) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(PdfError::NotWritable);
        };
        if self.registry.is_flushed(page.0) {
            return Ok(());
        }
        let root = self.pages.root;
        let mut inherited = Vec::new();
        for key in INHERITABLE {
            if self.registry.lookup(page.0).get(key).is_none()
                && let Some(value) = inherited_attribute(&self.registry, page.0, key)
            {
                inherited.push((key, value));
            }
        }
        let dict = self.registry.get_dict_mut(page.0)?;
        let reparented = dict.get("Parent") != Some(&PdfObject::Ref(root));
        for (key, value) in inherited {
            dict.insert(key.into(), value);
        }
        dict.insert("Parent".into(), PdfObject::Ref(root));
        let contents = dict.get("Contents").cloned();
        if reparented {
            self.pages.mark_modified();
        }

        let contents: Vec<ObjRef> = match contents {
            Some(PdfObject::Ref(r)) => match self.registry.lookup(r) {
                PdfObject::Array(arr) => arr.iter().filter_map(|c| c.as_ref().ok()).chain([r]).collect(),
                _ => vec![r],
            },
            Some(PdfObject::Array(arr)) => arr.iter().filter_map(|c| c.as_ref().ok()).collect(),
            _ => Vec::new(),
        };
        for content in contents {
            if self.registry.contains(content) && !self.registry.is_flushed(content) {
                writer.flush_object(&mut self.registry, content)?;
            }
        }
        writer.flush_object(&mut self.registry, page.0)
    }

    // document information

    pub fn info(&self) -> Option<&PdfDict> {
        self.registry.lookup(self.info_ref?).as_dict().ok()
    }

    /// Text entry of the information dictionary.
    pub fn info_text(&self, key: &str) -> Option<String> {
        let info = self.info()?;
        self.registry
            .get_in(info, key)
            .and_then(|v| v.as_string().ok())
            .map(decode_text)
    }

    /// Sets a text entry (Title, Author, Subject, Keywords, Creator, ...).
    pub fn set_info(&mut self, key: &str, value: &str) -> Result<()> {
        self.ensure_writable()?;
        let info_ref = match self.info_ref {
            Some(r) if self.registry.contains(r) => r,
            _ => {
                let r = self.registry.register(PdfDict::new())?;
                self.info_ref = Some(r);
                r
            }
        };
        self.registry
            .get_dict_mut(info_ref)?
            .insert(key.to_string(), PdfObject::text(value));
        Ok(())
    }

    /// Page labels of every page, from `/PageLabels`.
    pub fn page_labels(&mut self) -> Result<Vec<String>> {
        let page_count = self.page_count();
        let ranges = self.catalog().page_labels_tree().get_numbers().clone();
        if ranges.is_empty() {
            return Err(PdfError::NoPageLabels);
        }
        Ok(format_page_labels(&self.registry, &ranges, page_count))
    }

    /// Named destinations, without caching the Dests tree.
    pub(crate) fn dests_snapshot(&self) -> BTreeMap<Vec<u8>, PdfObject> {
        if let Some(tree) = self.state.name_trees.get("Dests") {
            return tree.snapshot(&self.registry);
        }
        let catalog = self.registry.lookup(self.catalog_ref);
        let source = catalog
            .get("Names")
            .and_then(|n| self.registry.resolve_dict(n))
            .and_then(|n| n.get("Dests"))
            .cloned();
        PdfNameTree::with_legacy(source, catalog.get("Dests").cloned()).snapshot(&self.registry)
    }

    /// Finishes the document and returns the complete file.
    pub fn close(mut self) -> Result<Vec<u8>> {
        let Some(writer) = self.writer.take() else {
            return Err(PdfError::NotWritable);
        };
        write_catalog_state(&mut self.registry, self.catalog_ref, &mut self.state)?;
        self.pages.write(&mut self.registry)?;

        let incremental = writer.is_incremental();
        let trailer = TrailerInfo {
            root: self.catalog_ref,
            info: self.info_ref.filter(|r| self.registry.xref().get(r.objid).is_some_and(|e| e.is_in_use())),
            original_id: self.original_id.take(),
            prev: incremental.then_some(self.startxref),
            encrypt: self.encrypt.take(),
            use_xref_stream: incremental && self.uses_xref_stream,
        };
        let bytes = writer.finish(&mut self.registry, trailer)?;
        tracing::debug!(bytes = bytes.len(), incremental, "document closed");
        Ok(bytes)
    }

    /// Closes the document into `out`.
    pub fn write_to<W: Write>(self, out: &mut W) -> Result<()> {
        let bytes = self.close()?;
        out.write_all(&bytes)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send<T: Send>() {}

    #[test]
    fn test_document_is_send() {
        assert_send::<PdfDocument>();
    }

    #[test]
    fn test_new_document_round_trip() {
        let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
        doc.add_new_page().unwrap();
        doc.add_new_page_with_size((0.0, 0.0, 200.0, 300.0)).unwrap();
        doc.set_info("Title", "Report").unwrap();
        let bytes = doc.close().unwrap();

        let reopened = PdfDocument::open(bytes).unwrap();
        assert!(!reopened.has_rebuilt_xref());
        assert!(!reopened.is_writable());
        assert_eq!(reopened.page_count(), 2);
        let second = reopened.page(1).unwrap();
        assert_eq!(reopened.media_box(second), Some((0.0, 0.0, 200.0, 300.0)));
        assert_eq!(reopened.info_text("Title").as_deref(), Some("Report"));
    }

    #[test]
    fn test_read_only_rejects_changes() {
        let doc = PdfDocument::new(WriterProperties::default()).unwrap();
        let mut reopened = PdfDocument::open(doc.close().unwrap()).unwrap();
        assert!(matches!(reopened.add_new_page(), Err(PdfError::NotWritable)));
        assert!(matches!(reopened.page(0), Err(PdfError::PageIndexOutOfRange(0))));
    }

    #[test]
    fn test_remove_page() {
        let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
        let first = doc.add_new_page().unwrap();
        let second = doc.add_new_page().unwrap();
        doc.remove_page(0).unwrap();
        assert_eq!(doc.pages(), vec![second]);
        assert_eq!(doc.page_index(first), None);
    }
}
