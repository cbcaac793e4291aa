//! Color operators.
//!
//! Handles: G, g, RG, rg, K, k, CS, cs, SCN, scn
//!
//! Device colors use the shortcut operators. Other spaces are selected with
//! `cs`/`CS` only when they differ from the current one; patterns are named
//! through the `Pattern` resource category.

use crate::canvas::PdfCanvas;
use crate::canvas::resources::ResourceType;
use crate::error::{PdfError, Result};
use crate::model::color::{ColorSpaceKind, PdfColorSpace};
use crate::model::objects::PdfObject;
use crate::model::state::Color;

impl PdfCanvas<'_> {
    /// PDF operator: `g`
    pub fn set_fill_color_gray(&mut self, gray: f64) -> &mut Self {
        self.device_color(true, PdfColorSpace::device_gray(), Color::Gray(gray))
    }

    /// PDF operator: `G`
    pub fn set_stroke_color_gray(&mut self, gray: f64) -> &mut Self {
        self.device_color(false, PdfColorSpace::device_gray(), Color::Gray(gray))
    }

    /// PDF operator: `rg`
    pub fn set_fill_color_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.device_color(true, PdfColorSpace::device_rgb(), Color::Rgb(r, g, b))
    }

    /// PDF operator: `RG`
    pub fn set_stroke_color_rgb(&mut self, r: f64, g: f64, b: f64) -> &mut Self {
        self.device_color(false, PdfColorSpace::device_rgb(), Color::Rgb(r, g, b))
    }

    /// PDF operator: `k`
    pub fn set_fill_color_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> &mut Self {
        self.device_color(true, PdfColorSpace::device_cmyk(), Color::Cmyk(c, m, y, k))
    }

    /// PDF operator: `K`
    pub fn set_stroke_color_cmyk(&mut self, c: f64, m: f64, y: f64, k: f64) -> &mut Self {
        self.device_color(false, PdfColorSpace::device_cmyk(), Color::Cmyk(c, m, y, k))
    }

    /// Sets the non-stroking color in any color space.
    ///
    /// PDF operators: `g`, `rg`, `k` for device spaces, otherwise `cs` + `scn`
    pub fn set_fill_color(&mut self, space: &PdfColorSpace, color: Color) -> Result<&mut Self> {
        self.set_color(true, space, color)
    }

    /// Sets the stroking color in any color space.
    ///
    /// PDF operators: `G`, `RG`, `K` for device spaces, otherwise `CS` + `SCN`
    pub fn set_stroke_color(&mut self, space: &PdfColorSpace, color: Color) -> Result<&mut Self> {
        self.set_color(false, space, color)
    }

    fn device_color(&mut self, fill: bool, space: PdfColorSpace, color: Color) -> &mut Self {
        let op = match (space.kind, fill) {
            (ColorSpaceKind::DeviceGray, true) => "g",
            (ColorSpaceKind::DeviceGray, false) => "G",
            (ColorSpaceKind::DeviceRgb, true) => "rg",
            (ColorSpaceKind::DeviceRgb, false) => "RG",
            (_, true) => "k",
            (_, false) => "K",
        };
        self.numbers_op(&color.to_vec(), op);
        self.store_color(fill, space, color);
        self
    }

    fn store_color(&mut self, fill: bool, space: PdfColorSpace, color: Color) {
        if fill {
            self.state.fill_color_space = space;
            self.state.fill_color = color;
        } else {
            self.state.stroke_color_space = space;
            self.state.stroke_color = color;
        }
    }

    fn set_color(&mut self, fill: bool, space: &PdfColorSpace, color: Color) -> Result<&mut Self> {
        let components = color.to_vec();
        let expected = match color {
            Color::PatternColored(_) => 0,
            _ => space.ncomponents,
        };
        if components.len() != expected {
            return Err(PdfError::InvalidArgument(format!(
                "{} components for a {} color space",
                components.len(),
                space.kind.family_name()
            )));
        }
        if color.is_pattern() != (space.kind == ColorSpaceKind::Pattern) {
            return Err(PdfError::InvalidArgument(
                "pattern colors need a pattern color space".into(),
            ));
        }
        if space.is_device() {
            return Ok(self.device_color(fill, space.clone(), color));
        }

        let current = if fill {
            &self.state.fill_color_space
        } else {
            &self.state.stroke_color_space
        };
        if current != space {
            let name = match space.inline_name() {
                Some(name) => name.to_string(),
                None => self.add_resource(ResourceType::ColorSpace, space.object.clone())?,
            };
            self.write_name(&name);
            self.write_operator(if fill { "cs" } else { "CS" });
        }

        self.write_numbers(&components);
        if let Some(pattern) = color.pattern() {
            let name = self.add_resource(ResourceType::Pattern, PdfObject::Ref(pattern))?;
            self.write_name(&name);
        }
        self.write_operator(if fill { "scn" } else { "SCN" });
        self.store_color(fill, space.clone(), color);
        Ok(self)
    }
}
