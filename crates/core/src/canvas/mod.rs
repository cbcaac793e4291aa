//! Content-stream canvas.
//!
//! `PdfCanvas` writes content-stream operators for a page or a form XObject
//! and keeps the graphics state they produce: the current state, the `q`/`Q`
//! stack and the marked-content depth. Operators go to an in-memory buffer
//! that is committed to the target stream on [`PdfCanvas::release`] (or when
//! the canvas is dropped).
//!
//! - `ops` - the operators, grouped by category
//! - `resources` - generated resource names
//! - `font`, `image` - font handles and XObjects drawn by the canvas
//! - `processor`, `render_info` - reading content streams back

pub mod font;
pub mod image;
mod ops;
pub mod processor;
pub mod render_info;
pub mod resources;

pub use font::{FontEncoder, PdfFont, STANDARD_FONTS, WinAnsiEncoder};
pub use image::{ImageParams, PdfFormXObject, PdfImageXObject};
pub use ops::text::TextItem;
pub use processor::{ContentListener, ContentProcessor};
pub use render_info::{CanvasTag, ImageRenderInfo};
pub use resources::{PdfResources, ResourceType};

use crate::document::PdfDocument;
use crate::document::page::{PdfPage, inherited_attribute};
use crate::document::registry::ObjectRegistry;
use crate::document::serialize::{write_name, write_object, write_string};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use crate::model::state::CanvasGraphicsState;
use crate::utils::write_number;
use bytes::Bytes;
use rustc_hash::FxHashMap;

/// Where a page canvas writes its operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPosition {
    /// Append to the last content stream (or a new one after it when it is filtered)
    Append,
    /// A new content stream drawn before the existing ones
    Before,
}

pub struct PdfCanvas<'a> {
    pub(crate) doc: &'a mut PdfDocument,
    content: ObjRef,
    pub(crate) resources: PdfResources,
    pub(crate) out: Vec<u8>,
    pub(crate) state: CanvasGraphicsState,
    pub(crate) stack: Vec<CanvasGraphicsState>,
    /// Open BMC/BDC spans
    pub(crate) marked_content_depth: usize,
    /// Spans opened by each `begin_layer` still open
    pub(crate) layer_depths: Vec<usize>,
    /// Fonts selected so far, for encoding text
    pub(crate) fonts: FxHashMap<ObjRef, PdfFont>,
    pub(crate) in_text: bool,
    released: bool,
}

impl<'a> PdfCanvas<'a> {
    /// Canvas appending to the content of `page`.
    pub fn new(doc: &'a mut PdfDocument, page: PdfPage) -> Result<Self> {
        Self::with_position(doc, page, ContentPosition::Append)
    }

    /// Canvas on a new content stream placed before the existing page content.
    pub fn new_before(doc: &'a mut PdfDocument, page: PdfPage) -> Result<Self> {
        Self::with_position(doc, page, ContentPosition::Before)
    }

    pub fn with_position(doc: &'a mut PdfDocument, page: PdfPage, position: ContentPosition) -> Result<Self> {
        doc.ensure_writable()?;
        let page = page.objref();
        if doc.registry.is_flushed(page) {
            return Err(PdfError::ObjectFlushed(page.objid));
        }
        let resources = page_resources(&mut doc.registry, page)?;
        let content = content_stream(&mut doc.registry, page, position)?;
        Ok(Self::from_parts(doc, content, resources))
    }

    /// Canvas drawing into a form XObject.
    ///
    /// The form's content is rewritten unfiltered on commit, so a form whose
    /// filters cannot be decoded is a `DecodeError`.
    pub fn for_form(doc: &'a mut PdfDocument, form: &PdfFormXObject) -> Result<Self> {
        doc.ensure_writable()?;
        let form = form.objref();
        let stream = doc.registry.get(form)?.as_stream()?;
        if stream.has_filters() {
            stream.decode()?;
        }
        let resources = match doc.registry.get(form)?.get("Resources").cloned() {
            Some(PdfObject::Ref(r)) => r,
            other => {
                let dict = other.and_then(|o| o.as_dict().ok().cloned()).unwrap_or_default();
                let r = doc.registry.register(dict)?;
                doc.registry
                    .get_dict_mut(form)?
                    .insert("Resources".into(), PdfObject::Ref(r));
                r
            }
        };
        Ok(Self::from_parts(doc, form, resources))
    }

    fn from_parts(doc: &'a mut PdfDocument, content: ObjRef, resources: ObjRef) -> Self {
        Self {
            doc,
            content,
            resources: PdfResources::new(resources),
            out: Vec::new(),
            state: CanvasGraphicsState::new(),
            stack: Vec::new(),
            marked_content_depth: 0,
            layer_depths: Vec::new(),
            fonts: FxHashMap::default(),
            in_text: false,
            released: false,
        }
    }

    /// Stream object receiving the operators.
    pub fn content_ref(&self) -> ObjRef {
        self.content
    }

    pub fn resources(&self) -> &PdfResources {
        &self.resources
    }

    pub fn graphics_state(&self) -> &CanvasGraphicsState {
        &self.state
    }

    /// Depth of the `q`/`Q` stack.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    /// Operators written since the last commit.
    pub fn pending(&self) -> &[u8] {
        &self.out
    }

    /// Adds `value` to the canvas resources and returns its name.
    pub(crate) fn add_resource(&mut self, kind: ResourceType, value: PdfObject) -> Result<String> {
        self.resources.add(&mut self.doc.registry, kind, value)
    }

    /// Writes the buffered operators into the target stream.
    fn commit(&mut self) -> Result<()> {
        if self.out.is_empty() {
            return Ok(());
        }
        let stream = self.doc.registry.get_mut(self.content)?.as_stream_mut()?;
        let mut data = if stream.has_filters() {
            stream.decode()?
        } else {
            stream.rawdata().to_vec()
        };
        if data.last().is_some_and(|b| !b.is_ascii_whitespace()) {
            data.push(b'\n');
        }
        data.append(&mut self.out);
        stream.set_data(data);
        Ok(())
    }

    /// Commits the operators and ends the canvas.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        if !self.stack.is_empty() {
            tracing::warn!(depth = self.stack.len(), "canvas released with unrestored graphics state");
        }
        if self.marked_content_depth > 0 {
            tracing::warn!(depth = self.marked_content_depth, "canvas released inside marked content");
        }
        self.commit()
    }

    // operator writing

    pub(crate) fn write_numbers(&mut self, values: &[f64]) {
        for &value in values {
            write_number(&mut self.out, value);
            self.out.push(b' ');
        }
    }

    pub(crate) fn write_name(&mut self, name: &str) {
        write_name(&mut self.out, name);
        self.out.push(b' ');
    }

    pub(crate) fn write_string(&mut self, bytes: &[u8]) {
        write_string(&mut self.out, bytes);
        self.out.push(b' ');
    }

    pub(crate) fn write_object(&mut self, obj: &PdfObject) {
        write_object(&mut self.out, obj);
        self.out.push(b' ');
    }

    pub(crate) fn write_operator(&mut self, op: &str) {
        self.out.extend_from_slice(op.as_bytes());
        self.out.push(b'\n');
    }

    /// Writes `values op`.
    pub(crate) fn numbers_op(&mut self, values: &[f64], op: &str) {
        self.write_numbers(values);
        self.write_operator(op);
    }
}

impl Drop for PdfCanvas<'_> {
    fn drop(&mut self) {
        if !self.released
            && let Err(err) = self.commit()
        {
            tracing::warn!(error = %err, "canvas content lost on drop");
        }
    }
}

/// Indirect resource dictionary of `page`, made explicit on the page.
fn page_resources(registry: &mut ObjectRegistry, page: ObjRef) -> Result<ObjRef> {
    let own = registry.lookup(page).get("Resources").cloned();
    let resources = match own {
        Some(PdfObject::Ref(r)) if registry.lookup(r).as_dict().is_ok() => return Ok(r),
        Some(PdfObject::Dict(dict)) => registry.register(dict)?,
        Some(_) => registry.register(PdfDict::new())?,
        None => match inherited_attribute(registry, page, "Resources") {
            Some(PdfObject::Ref(r)) if registry.lookup(r).as_dict().is_ok() => r,
            Some(PdfObject::Dict(dict)) => registry.register(dict)?,
            _ => registry.register(PdfDict::new())?,
        },
    };
    registry
        .get_dict_mut(page)?
        .insert("Resources".into(), PdfObject::Ref(resources));
    Ok(resources)
}

/// Content stream of `page` to write into, created when needed.
fn content_stream(registry: &mut ObjectRegistry, page: ObjRef, position: ContentPosition) -> Result<ObjRef> {
    let contents = registry.lookup(page).get("Contents").cloned();
    // a /Contents reference may point at an array object
    let array_ref = match &contents {
        Some(PdfObject::Ref(r)) if matches!(registry.lookup(*r), PdfObject::Array(_)) => Some(*r),
        _ => None,
    };
    let streams: Vec<ObjRef> = match (&contents, array_ref) {
        (_, Some(r)) => array_refs(registry.lookup(r)),
        (Some(PdfObject::Ref(r)), None) => vec![*r],
        (Some(arr @ PdfObject::Array(_)), None) => array_refs(arr),
        _ => Vec::new(),
    };

    if position == ContentPosition::Append
        && let Some(&last) = streams.last()
        && !registry.is_flushed(last)
        && matches!(registry.lookup(last), PdfObject::Stream(s) if !s.has_filters())
    {
        return Ok(last);
    }

    let stream = registry.register(PdfStream::from_data(Bytes::new()))?;
    let mut refs: Vec<PdfObject> = streams.into_iter().map(PdfObject::Ref).collect();
    match position {
        ContentPosition::Append => refs.push(PdfObject::Ref(stream)),
        ContentPosition::Before => refs.insert(0, PdfObject::Ref(stream)),
    }
    let value = match refs.len() {
        1 => PdfObject::Ref(stream),
        _ => PdfObject::Array(refs),
    };
    match array_ref {
        Some(r) => registry.set(r, value)?,
        None => {
            registry.get_dict_mut(page)?.insert("Contents".into(), value);
        }
    }
    Ok(stream)
}

fn array_refs(obj: &PdfObject) -> Vec<ObjRef> {
    match obj {
        PdfObject::Array(arr) => arr.iter().filter_map(|c| c.as_ref().ok()).collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::WriterProperties;

    fn content_of(doc: &PdfDocument, r: ObjRef) -> String {
        let stream = doc.get_object(r).unwrap().as_stream().unwrap();
        String::from_utf8(stream.rawdata().to_vec()).unwrap()
    }

    #[test]
    fn test_second_canvas_appends_to_same_stream() {
        let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.save_state();
        canvas.restore_state().unwrap();
        let first = canvas.content_ref();
        canvas.release().unwrap();

        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.move_to(1.0, 2.0);
        assert_eq!(canvas.content_ref(), first);
        drop(canvas);
        assert_eq!(content_of(&doc, first), "q\nQ\n1 2 m\n");
    }

    #[test]
    fn test_form_with_undecodable_filter_is_refused() {
        let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
        let encoded = PdfStream::new(
            crate::pdf_dict! {
                "Type" => PdfObject::name("XObject"),
                "Subtype" => PdfObject::name("Form"),
                "BBox" => PdfObject::numbers(&[0.0, 0.0, 10.0, 10.0]),
                "Filter" => PdfObject::name("ASCIIHexDecode"),
            },
            &b"<30206720>"[..],
        );
        let r = doc.add_object(encoded).unwrap();
        let form = PdfFormXObject::from_existing(&doc, r).unwrap();
        assert_eq!(form.bbox(), (0.0, 0.0, 10.0, 10.0));

        assert!(matches!(
            PdfCanvas::for_form(&mut doc, &form),
            Err(PdfError::DecodeError(_))
        ));
        let stream = doc.get_object(r).unwrap().as_stream().unwrap();
        assert_eq!(stream.get("Filter"), Some(&PdfObject::name("ASCIIHexDecode")));
        assert_eq!(stream.rawdata(), b"<30206720>");
    }

    #[test]
    fn test_filtered_stream_gets_a_new_one() {
        let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut compressed = PdfStream::from_data(&b"0 g"[..]);
        compressed.compress(6).unwrap();
        let old = doc.add_object(compressed).unwrap();
        doc.registry_mut()
            .get_dict_mut(page.objref())
            .unwrap()
            .insert("Contents".into(), PdfObject::Ref(old));

        let canvas = PdfCanvas::new(&mut doc, page).unwrap();
        let new = canvas.content_ref();
        canvas.release().unwrap();
        assert_ne!(new, old);
        assert_eq!(
            doc.get_object(page.objref()).unwrap().get("Contents"),
            Some(&PdfObject::Array(vec![old.into(), new.into()]))
        );
    }
}
