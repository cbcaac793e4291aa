//! What the content processor reports for each image.

use crate::model::objects::{ObjRef, PdfDict, PdfStream};
use crate::utils::{Matrix, Point, matrix_determinant};

/// A marked content span enclosing drawn content.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasTag {
    pub role: String,
    /// Property list, resolved when given by resource name
    pub properties: Option<PdfDict>,
}

impl CanvasTag {
    pub fn new(role: impl Into<String>, properties: Option<PdfDict>) -> Self {
        Self {
            role: role.into(),
            properties,
        }
    }

    pub fn mcid(&self) -> Option<i64> {
        self.properties
            .as_ref()
            .and_then(|p| p.get("MCID"))
            .and_then(|v| v.as_int().ok())
    }
}

/// An image drawn by a content stream.
#[derive(Debug, Clone)]
pub struct ImageRenderInfo {
    /// Transformation in effect at `Do` (or `BI`)
    pub ctm: Matrix,
    /// Image stream; for inline images, the `BI` parameters and data
    pub image: PdfStream,
    /// Indirect image object, none for inline images
    pub image_ref: Option<ObjRef>,
    /// Resource name used by `Do`
    pub name: Option<String>,
    /// `ColorSpace` resources visible to the image
    pub color_space_dict: Option<PdfDict>,
    pub inline: bool,
    /// Enclosing marked content, innermost first
    pub tags: Vec<CanvasTag>,
}

impl ImageRenderInfo {
    /// MCID of the innermost tag carrying one.
    pub fn mcid(&self) -> Option<i64> {
        self.tags.iter().find_map(CanvasTag::mcid)
    }

    /// Whether the image belongs to marked content `mcid`. With
    /// `topmost_only` only the nearest tag carrying an MCID counts.
    pub fn has_mcid(&self, mcid: i64, topmost_only: bool) -> bool {
        if topmost_only {
            self.mcid() == Some(mcid)
        } else {
            self.tags.iter().any(|tag| tag.mcid() == Some(mcid))
        }
    }

    /// Where the image's unit square origin lands.
    pub fn start_point(&self) -> Point {
        (self.ctm.4, self.ctm.5)
    }

    /// Signed area of the image in user space.
    pub fn area(&self) -> f64 {
        matrix_determinant(self.ctm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mcid_lookup() {
        let info = ImageRenderInfo {
            ctm: (100.0, 0.0, 0.0, 50.0, 10.0, 20.0),
            image: PdfStream::from_data(Vec::new()),
            image_ref: None,
            name: None,
            color_space_dict: None,
            inline: true,
            tags: vec![
                CanvasTag::new("Span", None),
                CanvasTag::new("Figure", Some(crate::pdf_dict! { "MCID" => 3 })),
                CanvasTag::new("Sect", Some(crate::pdf_dict! { "MCID" => 1 })),
            ],
        };
        assert_eq!(info.mcid(), Some(3));
        assert!(info.has_mcid(1, false));
        assert!(!info.has_mcid(1, true));
        assert_eq!(info.start_point(), (10.0, 20.0));
        assert_eq!(info.area(), 5000.0);
    }
}
