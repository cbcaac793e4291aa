//! PDF color space definitions.
//!
//! Color spaces form a closed set of kinds. Each value keeps the object that
//! is written into a resource dictionary (a name for device spaces, an array
//! or reference otherwise) plus the base space and tint transform where the
//! kind has them.

use super::objects::{ObjRef, PdfObject};
use crate::error::{PdfError, Result};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Color space families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorSpaceKind {
    DeviceGray,
    DeviceRgb,
    DeviceCmyk,
    CalGray,
    CalRgb,
    Lab,
    IccBased,
    Indexed,
    Separation,
    DeviceN,
    Pattern,
}

impl ColorSpaceKind {
    /// Family name as written in the first element of a color space array.
    pub const fn family_name(self) -> &'static str {
        match self {
            Self::DeviceGray => "DeviceGray",
            Self::DeviceRgb => "DeviceRGB",
            Self::DeviceCmyk => "DeviceCMYK",
            Self::CalGray => "CalGray",
            Self::CalRgb => "CalRGB",
            Self::Lab => "Lab",
            Self::IccBased => "ICCBased",
            Self::Indexed => "Indexed",
            Self::Separation => "Separation",
            Self::DeviceN => "DeviceN",
            Self::Pattern => "Pattern",
        }
    }

    fn from_family_name(name: &str) -> Option<Self> {
        Some(match name {
            "DeviceGray" | "G" => Self::DeviceGray,
            "DeviceRGB" | "RGB" => Self::DeviceRgb,
            "DeviceCMYK" | "CMYK" => Self::DeviceCmyk,
            "CalGray" => Self::CalGray,
            "CalRGB" => Self::CalRgb,
            "Lab" => Self::Lab,
            "ICCBased" => Self::IccBased,
            "Indexed" | "I" => Self::Indexed,
            "Separation" => Self::Separation,
            "DeviceN" => Self::DeviceN,
            "Pattern" => Self::Pattern,
            _ => return None,
        })
    }
}

/// Represents a PDF color space.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfColorSpace {
    /// Family of the color space
    pub kind: ColorSpaceKind,
    /// Number of color components
    pub ncomponents: usize,
    /// Object written into resources: a name, an array or a reference to one
    pub object: PdfObject,
    /// Base (alternate) space for Indexed, Separation, DeviceN and Pattern
    pub base: Option<Box<PdfColorSpace>>,
    /// Tint transform function for Separation and DeviceN
    pub tint_transform: Option<PdfObject>,
}

impl PdfColorSpace {
    fn device(kind: ColorSpaceKind, ncomponents: usize) -> Self {
        Self {
            kind,
            ncomponents,
            object: PdfObject::name(kind.family_name()),
            base: None,
            tint_transform: None,
        }
    }

    pub fn device_gray() -> Self {
        Self::device(ColorSpaceKind::DeviceGray, 1)
    }

    pub fn device_rgb() -> Self {
        Self::device(ColorSpaceKind::DeviceRgb, 3)
    }

    pub fn device_cmyk() -> Self {
        Self::device(ColorSpaceKind::DeviceCmyk, 4)
    }

    /// Colored pattern space (`/Pattern`).
    pub fn pattern() -> Self {
        Self::device(ColorSpaceKind::Pattern, 0)
    }

    /// Uncolored pattern space: `[/Pattern base]`.
    pub fn uncolored_pattern(base: PdfColorSpace) -> Self {
        Self {
            kind: ColorSpaceKind::Pattern,
            ncomponents: base.ncomponents,
            object: PdfObject::Array(vec![PdfObject::name("Pattern"), base.object.clone()]),
            base: Some(Box::new(base)),
            tint_transform: None,
        }
    }

    /// CIE-based gray space with the given white point.
    pub fn cal_gray(white_point: [f64; 3]) -> Self {
        Self::cie(ColorSpaceKind::CalGray, 1, white_point)
    }

    /// CIE-based RGB space with the given white point.
    pub fn cal_rgb(white_point: [f64; 3]) -> Self {
        Self::cie(ColorSpaceKind::CalRgb, 3, white_point)
    }

    /// CIE L*a*b* space with the given white point.
    pub fn lab(white_point: [f64; 3]) -> Self {
        Self::cie(ColorSpaceKind::Lab, 3, white_point)
    }

    fn cie(kind: ColorSpaceKind, ncomponents: usize, white_point: [f64; 3]) -> Self {
        let params = crate::pdf_dict! { "WhitePoint" => PdfObject::numbers(&white_point) };
        Self {
            kind,
            ncomponents,
            object: PdfObject::Array(vec![
                PdfObject::name(kind.family_name()),
                PdfObject::Dict(params),
            ]),
            base: None,
            tint_transform: None,
        }
    }

    /// ICC profile based space; `profile` is the indirect ICC stream.
    pub fn icc_based(profile: ObjRef, ncomponents: usize) -> Self {
        Self {
            kind: ColorSpaceKind::IccBased,
            ncomponents,
            object: PdfObject::Array(vec![PdfObject::name("ICCBased"), PdfObject::Ref(profile)]),
            base: None,
            tint_transform: None,
        }
    }

    /// Indexed space over `base` with `hival + 1` entries in `lookup`.
    pub fn indexed(base: PdfColorSpace, hival: u8, lookup: Vec<u8>) -> Self {
        Self {
            kind: ColorSpaceKind::Indexed,
            ncomponents: 1,
            object: PdfObject::Array(vec![
                PdfObject::name("Indexed"),
                base.object.clone(),
                PdfObject::Int(hival as i64),
                PdfObject::String(lookup),
            ]),
            base: Some(Box::new(base)),
            tint_transform: None,
        }
    }

    /// Separation (spot color) space.
    pub fn separation(colorant: &str, alternate: PdfColorSpace, tint_transform: PdfObject) -> Self {
        Self {
            kind: ColorSpaceKind::Separation,
            ncomponents: 1,
            object: PdfObject::Array(vec![
                PdfObject::name("Separation"),
                PdfObject::name(colorant),
                alternate.object.clone(),
                tint_transform.clone(),
            ]),
            base: Some(Box::new(alternate)),
            tint_transform: Some(tint_transform),
        }
    }

    /// DeviceN space over the named colorants.
    pub fn device_n(
        colorants: &[&str],
        alternate: PdfColorSpace,
        tint_transform: PdfObject,
    ) -> Self {
        Self {
            kind: ColorSpaceKind::DeviceN,
            ncomponents: colorants.len(),
            object: PdfObject::Array(vec![
                PdfObject::name("DeviceN"),
                PdfObject::Array(colorants.iter().map(|c| PdfObject::name(c)).collect()),
                alternate.object.clone(),
                tint_transform.clone(),
            ]),
            base: Some(Box::new(alternate)),
            tint_transform: Some(tint_transform),
        }
    }

    /// Wraps an already registered color space object (array or reference).
    ///
    /// The object is taken as is; `kind` and `ncomponents` describe it.
    pub fn from_registered(kind: ColorSpaceKind, ncomponents: usize, object: PdfObject) -> Self {
        Self {
            kind,
            ncomponents,
            object,
            base: None,
            tint_transform: None,
        }
    }

    /// Interprets a color space name or array read from a file.
    ///
    /// References inside the array are kept unresolved.
    pub fn from_object(obj: &PdfObject) -> Result<Self> {
        match obj {
            PdfObject::Name(name) => PREDEFINED_COLORSPACE
                .get(name.as_str())
                .cloned()
                .ok_or_else(|| PdfError::SyntaxError(format!("unknown color space /{}", name))),
            PdfObject::Array(arr) => {
                let family = arr
                    .first()
                    .and_then(|f| f.as_name().ok())
                    .and_then(ColorSpaceKind::from_family_name)
                    .ok_or_else(|| PdfError::SyntaxError("malformed color space array".into()))?;
                let ncomponents = match family {
                    ColorSpaceKind::DeviceN => arr
                        .get(1)
                        .and_then(|n| n.as_array().ok())
                        .map(Vec::len)
                        .unwrap_or(1),
                    ColorSpaceKind::IccBased | ColorSpaceKind::Pattern => 0,
                    ColorSpaceKind::CalRgb | ColorSpaceKind::Lab | ColorSpaceKind::DeviceRgb => 3,
                    ColorSpaceKind::DeviceCmyk => 4,
                    _ => 1,
                };
                let base = match family {
                    ColorSpaceKind::Indexed | ColorSpaceKind::Pattern => arr.get(1),
                    ColorSpaceKind::Separation | ColorSpaceKind::DeviceN => arr.get(2),
                    _ => None,
                }
                .and_then(|b| Self::from_object(b).ok())
                .map(Box::new);
                let tint_transform = match family {
                    ColorSpaceKind::Separation | ColorSpaceKind::DeviceN => arr.get(3).cloned(),
                    _ => None,
                };
                let ncomponents = match (family, &base) {
                    (ColorSpaceKind::Pattern, Some(b)) => b.ncomponents,
                    _ => ncomponents,
                };
                Ok(Self {
                    kind: family,
                    ncomponents,
                    object: obj.clone(),
                    base,
                    tint_transform,
                })
            }
            _ => Err(PdfError::TypeError {
                expected: "name or array",
                got: obj.type_name(),
            }),
        }
    }

    /// Device spaces are selected with `g`/`rg`/`k` and need no resource entry.
    pub fn is_device(&self) -> bool {
        matches!(
            self.kind,
            ColorSpaceKind::DeviceGray | ColorSpaceKind::DeviceRgb | ColorSpaceKind::DeviceCmyk
        )
    }

    /// Name written directly in `cs`/`CS` when the space needs no resource entry.
    pub fn inline_name(&self) -> Option<&str> {
        match &self.object {
            PdfObject::Name(name) => Some(name),
            _ => None,
        }
    }
}

/// Color spaces that can be named directly, keyed by name.
pub static PREDEFINED_COLORSPACE: LazyLock<HashMap<&'static str, PdfColorSpace>> =
    LazyLock::new(|| {
        HashMap::from([
            ("DeviceGray", PdfColorSpace::device_gray()),
            ("DeviceRGB", PdfColorSpace::device_rgb()),
            ("DeviceCMYK", PdfColorSpace::device_cmyk()),
            ("Pattern", PdfColorSpace::pattern()),
        ])
    });

/// Inline image color space abbreviations.
pub static INLINE_COLORSPACE_ABBREV: LazyLock<HashMap<&'static str, &'static str>> =
    LazyLock::new(|| {
        HashMap::from([
            ("G", "DeviceGray"),
            ("RGB", "DeviceRGB"),
            ("CMYK", "DeviceCMYK"),
            ("I", "Indexed"),
        ])
    });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separation_keeps_alternate_and_tint() {
        let tint = PdfObject::Ref(ObjRef::new(9, 0));
        let cs = PdfColorSpace::separation("Spot", PdfColorSpace::device_cmyk(), tint.clone());
        assert_eq!(cs.ncomponents, 1);
        assert_eq!(cs.base.as_ref().map(|b| b.kind), Some(ColorSpaceKind::DeviceCmyk));
        assert_eq!(cs.tint_transform, Some(tint));
        assert!(!cs.is_device());
    }

    #[test]
    fn test_from_object_array() {
        let obj = PdfObject::Array(vec![
            PdfObject::name("Indexed"),
            PdfObject::name("DeviceRGB"),
            PdfObject::Int(1),
            PdfObject::string([0, 0, 0, 255, 255, 255]),
        ]);
        let cs = PdfColorSpace::from_object(&obj).unwrap();
        assert_eq!(cs.kind, ColorSpaceKind::Indexed);
        assert_eq!(cs.base.unwrap().kind, ColorSpaceKind::DeviceRgb);
    }

    #[test]
    fn test_uncolored_pattern_components() {
        let cs = PdfColorSpace::uncolored_pattern(PdfColorSpace::device_rgb());
        assert_eq!(cs.kind, ColorSpaceKind::Pattern);
        assert_eq!(cs.ncomponents, 3);
    }
}
