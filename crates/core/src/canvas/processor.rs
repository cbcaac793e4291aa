//! Content stream processing.
//!
//! Walks the operators of a page (and of the form XObjects it draws),
//! tracking the transformation matrix and marked content, and reports every
//! image to a [`ContentListener`].

use super::render_info::{CanvasTag, ImageRenderInfo};
use crate::document::PdfDocument;
use crate::document::page::{PdfPage, inherited_attribute};
use crate::document::registry::ObjectRegistry;
use crate::error::Result;
use crate::model::color::INLINE_COLORSPACE_ABBREV;
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use crate::parser::pdf_parser::{ContentParser, Operation};
use crate::utils::{MATRIX_IDENTITY, Matrix, matrix_from_slice, mult_matrix};

/// Nesting limit for form XObjects drawing form XObjects.
const MAX_FORM_DEPTH: usize = 32;

/// Receives what the processor finds.
pub trait ContentListener {
    fn render_image(&mut self, info: ImageRenderInfo);

    /// A marked content span opened.
    fn begin_marked_content(&mut self, _tag: &CanvasTag) {}

    /// The innermost marked content span closed.
    fn end_marked_content(&mut self) {}
}

impl ContentListener for Vec<ImageRenderInfo> {
    fn render_image(&mut self, info: ImageRenderInfo) {
        self.push(info);
    }
}

pub struct ContentProcessor<'a, L: ContentListener> {
    registry: &'a ObjectRegistry,
    listener: L,
    ctm: Matrix,
    saved: Vec<Matrix>,
    /// Open marked content, outermost first
    tags: Vec<CanvasTag>,
    /// Forms being processed
    forms: Vec<ObjRef>,
}

impl<'a> ContentProcessor<'a, Vec<ImageRenderInfo>> {
    /// Images drawn on `page`, in drawing order.
    pub fn page_images(doc: &'a PdfDocument, page: PdfPage) -> Result<Vec<ImageRenderInfo>> {
        let mut processor = Self::new(doc.registry(), Vec::new());
        processor.process_page(page)?;
        Ok(processor.into_listener())
    }
}

impl<'a, L: ContentListener> ContentProcessor<'a, L> {
    pub fn new(registry: &'a ObjectRegistry, listener: L) -> Self {
        Self {
            registry,
            listener,
            ctm: MATRIX_IDENTITY,
            saved: Vec::new(),
            tags: Vec::new(),
            forms: Vec::new(),
        }
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    /// Processes all content streams of `page` with its (possibly inherited) resources.
    pub fn process_page(&mut self, page: PdfPage) -> Result<()> {
        let page = page.objref();
        let data = page_content(self.registry, page);
        let resources = inherited_attribute(self.registry, page, "Resources")
            .and_then(|r| self.registry.resolve(&r).as_dict().ok().cloned())
            .unwrap_or_default();
        self.ctm = MATRIX_IDENTITY;
        self.saved.clear();
        self.tags.clear();
        self.process_content(&data, &resources)
    }

    /// Processes decoded content bytes drawn with `resources`.
    pub fn process_content(&mut self, data: &[u8], resources: &PdfDict) -> Result<()> {
        let ops = ContentParser::parse(data)?;
        for op in &ops {
            match op.op() {
                "q" => self.saved.push(self.ctm),
                "Q" => match self.saved.pop() {
                    Some(ctm) => self.ctm = ctm,
                    None => tracing::warn!("unbalanced Q ignored"),
                },
                "cm" => match matrix_from_slice(&op.numbers()) {
                    Some(m) => self.ctm = mult_matrix(m, self.ctm),
                    None => tracing::warn!(operands = op.operands.len(), "malformed cm ignored"),
                },
                "BMC" => self.begin_tag(op, None),
                "BDC" => {
                    let properties = op.operands.get(1).and_then(|p| self.properties(p, resources));
                    self.begin_tag(op, properties);
                }
                "EMC" => {
                    if self.tags.pop().is_some() {
                        self.listener.end_marked_content();
                    } else {
                        tracing::warn!("unbalanced EMC ignored");
                    }
                }
                "Do" => {
                    if let Some(name) = op.operands.first().and_then(|n| n.as_name().ok()) {
                        self.do_xobject(name, resources)?;
                    }
                }
                "BI" => self.inline_image(op, resources),
                _ => {}
            }
        }
        Ok(())
    }

    fn begin_tag(&mut self, op: &Operation, properties: Option<PdfDict>) {
        let role = op
            .operands
            .first()
            .and_then(|r| r.as_name().ok())
            .unwrap_or_default();
        let tag = CanvasTag::new(role, properties);
        self.listener.begin_marked_content(&tag);
        self.tags.push(tag);
    }

    /// Inline property list, or the `Properties` resource it names.
    fn properties(&self, operand: &PdfObject, resources: &PdfDict) -> Option<PdfDict> {
        match operand {
            PdfObject::Dict(dict) => Some(dict.clone()),
            PdfObject::Name(name) => resources
                .get("Properties")
                .and_then(|p| self.registry.resolve_dict(p))
                .and_then(|p| self.registry.get_in(p, name))
                .and_then(|p| p.as_dict().ok())
                .cloned(),
            _ => None,
        }
    }

    fn do_xobject(&mut self, name: &str, resources: &PdfDict) -> Result<()> {
        let registry = self.registry;
        let Some(entry) = resources
            .get("XObject")
            .and_then(|x| registry.resolve_dict(x))
            .and_then(|x| x.get(name))
        else {
            tracing::warn!(name, "Do with unknown XObject");
            return Ok(());
        };
        let objref = entry.as_ref().ok();
        let PdfObject::Stream(stream) = registry.resolve(entry) else {
            tracing::warn!(name, "XObject is not a stream");
            return Ok(());
        };

        match stream.get("Subtype").and_then(|s| s.as_name().ok()) {
            Some("Image") => {
                self.emit(PdfStream::clone(stream), objref, Some(name.to_string()), resources, false);
                Ok(())
            }
            Some("Form") => self.do_form(stream, objref, resources),
            other => {
                tracing::debug!(name, subtype = ?other, "XObject skipped");
                Ok(())
            }
        }
    }

    fn do_form(&mut self, form: &PdfStream, objref: Option<ObjRef>, resources: &PdfDict) -> Result<()> {
        if let Some(r) = objref
            && self.forms.contains(&r)
        {
            tracing::warn!(form = %r, "form XObject draws itself, skipped");
            return Ok(());
        }
        if self.forms.len() >= MAX_FORM_DEPTH {
            tracing::warn!(depth = self.forms.len(), "form XObjects nested too deep");
            return Ok(());
        }
        let data = match form.decode() {
            Ok(data) => data,
            Err(err) => {
                tracing::warn!(error = %err, "undecodable form XObject skipped");
                return Ok(());
            }
        };
        let registry = self.registry;
        let form_resources = form
            .get("Resources")
            .and_then(|r| registry.resolve_dict(r))
            .unwrap_or(resources);
        let matrix = form
            .get("Matrix")
            .and_then(|m| registry.resolve(m).as_array().ok())
            .and_then(|m| {
                let values: Vec<f64> = m.iter().filter_map(|v| v.as_num().ok()).collect();
                matrix_from_slice(&values)
            })
            .unwrap_or(MATRIX_IDENTITY);

        let ctm = self.ctm;
        let saved = self.saved.len();
        let tags = self.tags.len();
        self.ctm = mult_matrix(matrix, self.ctm);
        self.forms.extend(objref);
        let result = self.process_content(&data, form_resources);
        if objref.is_some() {
            self.forms.pop();
        }
        self.ctm = ctm;
        self.saved.truncate(saved);
        self.tags.truncate(tags);
        result
    }

    fn inline_image(&mut self, op: &Operation, resources: &PdfDict) {
        let (Some(PdfObject::Dict(params)), Some(PdfObject::String(data))) =
            (op.operands.first(), op.operands.get(1))
        else {
            tracing::warn!("malformed inline image skipped");
            return;
        };
        let mut params = params.clone();
        // abbreviated device spaces become their full names
        if let Some(full) = params
            .get("CS")
            .and_then(|cs| cs.as_name().ok())
            .and_then(|cs| INLINE_COLORSPACE_ABBREV.get(cs).copied())
        {
            params.insert("CS".into(), PdfObject::name(full));
        }
        let image = PdfStream::new(params, data.clone());
        self.emit(image, None, None, resources, true);
    }

    fn emit(&mut self, image: PdfStream, image_ref: Option<ObjRef>, name: Option<String>, resources: &PdfDict, inline: bool) {
        let color_space_dict = resources
            .get("ColorSpace")
            .and_then(|c| self.registry.resolve_dict(c))
            .cloned();
        self.listener.render_image(ImageRenderInfo {
            ctm: self.ctm,
            image,
            image_ref,
            name,
            color_space_dict,
            inline,
            tags: self.tags.iter().rev().cloned().collect(),
        });
    }
}

/// Decoded content streams of `page`, joined by newlines.
fn page_content(registry: &ObjectRegistry, page: ObjRef) -> Vec<u8> {
    let parts: Vec<&PdfObject> = match registry.lookup(page).get("Contents").map(|c| registry.resolve(c)) {
        Some(PdfObject::Array(parts)) => parts.iter().map(|p| registry.resolve(p)).collect(),
        Some(part) => vec![part],
        None => Vec::new(),
    };
    let mut data = Vec::new();
    for part in parts {
        match part.as_stream().map(PdfStream::decode) {
            Ok(Ok(bytes)) => {
                data.extend_from_slice(&bytes);
                data.push(b'\n');
            }
            Ok(Err(err)) => tracing::warn!(error = %err, "undecodable content stream skipped"),
            Err(_) if part.is_null() => {}
            Err(_) => tracing::warn!(got = part.type_name(), "content entry is not a stream"),
        }
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::PdfCanvas;
    use crate::canvas::image::{ImageParams, PdfFormXObject, PdfImageXObject};
    use crate::model::color::PdfColorSpace;

    #[test]
    fn test_images_in_page_and_form() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let params = ImageParams::new(1, 1, PdfColorSpace::device_gray());
        let image = PdfImageXObject::new(&mut doc, vec![0u8], params).unwrap();
        let form = PdfFormXObject::new(&mut doc, (0.0, 0.0, 10.0, 10.0)).unwrap();
        doc.registry_mut()
            .get_dict_mut(form.objref())
            .unwrap()
            .insert("Matrix".into(), PdfObject::numbers(&[2.0, 0.0, 0.0, 2.0, 0.0, 0.0]));

        let mut canvas = PdfCanvas::for_form(&mut doc, &form).unwrap();
        canvas.add_image_with_size(&image, 0.0, 0.0, 2.0, 2.0).unwrap();
        // a form drawing itself must not recurse forever
        canvas.add_xobject(&form, 0.0, 0.0).unwrap();
        canvas.release().unwrap();

        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_marked_content_with("Figure", &crate::pdf_dict! { "MCID" => 0 });
        canvas.add_image_with_size(&image, 10.0, 20.0, 100.0, 50.0).unwrap();
        canvas.end_marked_content().unwrap();
        canvas.add_xobject(&form, 5.0, 5.0).unwrap();
        canvas.release().unwrap();

        let images = ContentProcessor::page_images(&doc, page).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].ctm, (100.0, 0.0, 0.0, 50.0, 10.0, 20.0));
        assert_eq!(images[0].name.as_deref(), Some("Im1"));
        assert_eq!(images[0].image_ref, Some(image.objref()));
        assert_eq!(images[0].mcid(), Some(0));
        assert_eq!(images[1].ctm, (4.0, 0.0, 0.0, 4.0, 5.0, 5.0));
        assert_eq!(images[1].area(), 16.0);
        assert_eq!(images[1].mcid(), None);
    }

    #[test]
    fn test_inline_image() {
        let registry = ObjectRegistry::new();
        let mut processor = ContentProcessor::new(&registry, Vec::new());
        let content = b"q 10 0 0 10 1 2 cm BI /W 1 /H 1 /CS /G /BPC 8 ID \x7f EI Q";
        processor.process_content(content, &PdfDict::new()).unwrap();
        let images = processor.into_listener();
        assert_eq!(images.len(), 1);
        assert!(images[0].inline);
        assert_eq!(images[0].start_point(), (1.0, 2.0));
        assert_eq!(images[0].image.get("W"), Some(&PdfObject::Int(1)));
        assert_eq!(images[0].image.get("CS"), Some(&PdfObject::name("DeviceGray")));
    }
}
