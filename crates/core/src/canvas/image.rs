//! Image and form XObjects.

use crate::document::PdfDocument;
use crate::document::page::rect_from;
use crate::error::{PdfError, Result};
use crate::model::color::PdfColorSpace;
use crate::model::objects::{ObjRef, PdfDict, PdfObject, PdfStream};
use crate::utils::Rect;
use bytes::Bytes;

/// Parameters of an already encoded image payload.
#[derive(Debug, Clone)]
pub struct ImageParams {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: PdfColorSpace,
    /// Filter the payload is encoded with (`DCTDecode`, `FlateDecode`, ...), none for raw samples
    pub filter: Option<String>,
    pub decode_parms: Option<PdfDict>,
    /// Soft mask image
    pub smask: Option<ObjRef>,
}

impl ImageParams {
    pub fn new(width: u32, height: u32, color_space: PdfColorSpace) -> Self {
        Self {
            width,
            height,
            bits_per_component: 8,
            color_space,
            filter: None,
            decode_parms: None,
            smask: None,
        }
    }

    pub fn set_bits_per_component(mut self, bits: u8) -> Self {
        self.bits_per_component = bits;
        self
    }

    pub fn set_filter(mut self, filter: &str) -> Self {
        self.filter = Some(filter.to_string());
        self
    }

    pub fn set_decode_parms(mut self, parms: PdfDict) -> Self {
        self.decode_parms = Some(parms);
        self
    }

    pub fn set_smask(mut self, smask: ObjRef) -> Self {
        self.smask = Some(smask);
        self
    }
}

/// An image XObject registered in a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfImageXObject {
    objref: ObjRef,
    width: u32,
    height: u32,
}

impl PdfImageXObject {
    /// Registers an image stream built from encoded `data`.
    pub fn new(doc: &mut PdfDocument, data: impl Into<Bytes>, params: ImageParams) -> Result<Self> {
        if params.width == 0 || params.height == 0 {
            return Err(PdfError::InvalidArgument("image without pixels".into()));
        }
        let mut attrs = crate::pdf_dict! {
            "Type" => PdfObject::name("XObject"),
            "Subtype" => PdfObject::name("Image"),
            "Width" => params.width as i64,
            "Height" => params.height as i64,
            "BitsPerComponent" => params.bits_per_component as i64,
            "ColorSpace" => params.color_space.object.clone(),
        };
        if let Some(filter) = &params.filter {
            attrs.insert("Filter".into(), PdfObject::name(filter));
        }
        if let Some(parms) = params.decode_parms {
            attrs.insert("DecodeParms".into(), PdfObject::Dict(parms));
        }
        if let Some(smask) = params.smask {
            attrs.insert("SMask".into(), PdfObject::Ref(smask));
        }
        let objref = doc.add_object(PdfStream::new(attrs, data))?;
        Ok(Self {
            objref,
            width: params.width,
            height: params.height,
        })
    }

    pub fn objref(&self) -> ObjRef {
        self.objref
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// A form XObject: a reusable content stream with its own resources.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PdfFormXObject {
    objref: ObjRef,
    bbox: Rect,
}

impl PdfFormXObject {
    /// Registers an empty form with bounding box `bbox`; draw into it with
    /// [`PdfCanvas::for_form`](super::PdfCanvas::for_form).
    pub fn new(doc: &mut PdfDocument, bbox: Rect) -> Result<Self> {
        let resources = doc.add_object(PdfDict::new())?;
        let attrs = crate::pdf_dict! {
            "Type" => PdfObject::name("XObject"),
            "Subtype" => PdfObject::name("Form"),
            "BBox" => PdfObject::numbers(&[bbox.0, bbox.1, bbox.2, bbox.3]),
            "Resources" => resources,
        };
        let objref = doc.add_object(PdfStream::new(attrs, Bytes::new()))?;
        Ok(Self { objref, bbox })
    }

    /// Wraps a form XObject already in the document.
    pub fn from_existing(doc: &PdfDocument, objref: ObjRef) -> Result<Self> {
        let form = doc.get_object(objref)?;
        if !form.as_stream().is_ok_and(|s| s.get("Subtype") == Some(&PdfObject::name("Form"))) {
            return Err(PdfError::InvalidArgument(format!("{} is not a form XObject", objref)));
        }
        let bbox = form
            .get("BBox")
            .and_then(|b| rect_from(doc.registry(), b))
            .unwrap_or_default();
        Ok(Self { objref, bbox })
    }

    pub fn objref(&self) -> ObjRef {
        self.objref
    }

    pub fn bbox(&self) -> Rect {
        self.bbox
    }
}
