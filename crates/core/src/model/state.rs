//! Canvas graphics state.
//!
//! A snapshot of everything `q` saves and `Q` restores, kept by the canvas so
//! that redundant operators can be skipped and the state can be queried.

use super::color::PdfColorSpace;
use super::objects::ObjRef;
use crate::utils::{MATRIX_IDENTITY, Matrix};
use smallvec::SmallVec;

/// Color value types used in PDF graphics state.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    /// Greyscale color (0.0 = black, 1.0 = white)
    Gray(f64),
    /// RGB color
    Rgb(f64, f64, f64),
    /// CMYK color
    Cmyk(f64, f64, f64, f64),
    /// Components in a non-device color space (Separation, Lab, ICCBased, ...)
    Components(Vec<f64>),
    /// Colored tiling or shading pattern (PaintType=1)
    PatternColored(ObjRef),
    /// Uncolored tiling pattern (PaintType=2) - components in the base space + pattern
    PatternUncolored(Vec<f64>, ObjRef),
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    /// Numeric components of the color.
    ///
    /// Colored patterns have none; uncolored patterns return their tint components.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Color::Gray(g) => vec![*g],
            Color::Rgb(r, g, b) => vec![*r, *g, *b],
            Color::Cmyk(c, m, y, k) => vec![*c, *m, *y, *k],
            Color::Components(values) => values.clone(),
            Color::PatternColored(_) => vec![],
            Color::PatternUncolored(values, _) => values.clone(),
        }
    }

    /// The pattern object if this is a pattern color.
    pub fn pattern(&self) -> Option<ObjRef> {
        match self {
            Color::PatternColored(p) | Color::PatternUncolored(_, p) => Some(*p),
            _ => None,
        }
    }

    /// Check if this color is a pattern color.
    pub fn is_pattern(&self) -> bool {
        self.pattern().is_some()
    }
}

/// Dash array as set by `d`.
pub type DashArray = SmallVec<[f64; 4]>;

/// Graphics state tracked by the canvas and pushed on `q`.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasGraphicsState {
    /// Line width for stroke operations
    pub line_width: f64,
    /// Line cap style (0, 1, or 2)
    pub line_cap: i32,
    /// Line join style (0, 1, or 2)
    pub line_join: i32,
    /// Miter limit for line joins
    pub miter_limit: f64,
    /// Dash pattern: (array, phase)
    pub dash: (DashArray, f64),
    /// Rendering intent name
    pub intent: Option<String>,
    /// Flatness tolerance
    pub flatness: f64,
    /// Last ExtGState applied with `gs`
    pub ext_gstate: Option<ObjRef>,

    /// Non-stroking (fill) color
    pub fill_color: Color,
    /// Non-stroking color space
    pub fill_color_space: PdfColorSpace,
    /// Stroking color
    pub stroke_color: Color,
    /// Stroking color space
    pub stroke_color_space: PdfColorSpace,

    /// Current transformation matrix
    pub ctm: Matrix,

    /// Current font dictionary
    pub font: Option<ObjRef>,
    /// Font size in text space units
    pub font_size: f64,
    /// Character spacing (Tc)
    pub char_spacing: f64,
    /// Word spacing (Tw)
    pub word_spacing: f64,
    /// Horizontal scaling percentage (Tz, 100 = normal)
    pub horizontal_scaling: f64,
    /// Text leading (TL)
    pub leading: f64,
    /// Text rise (Ts)
    pub text_rise: f64,
    /// Text rendering mode (Tr, 0-7)
    pub text_render_mode: i32,
    /// Text matrix (Tm), reset by BT
    pub text_matrix: Matrix,
}

impl CanvasGraphicsState {
    /// Create new graphics state with the initial values of a page.
    pub fn new() -> Self {
        Self {
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash: (SmallVec::new(), 0.0),
            intent: None,
            flatness: 1.0,
            ext_gstate: None,
            fill_color: Color::Gray(0.0),
            fill_color_space: PdfColorSpace::device_gray(),
            stroke_color: Color::Gray(0.0),
            stroke_color_space: PdfColorSpace::device_gray(),
            ctm: MATRIX_IDENTITY,
            font: None,
            font_size: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 100.0,
            leading: 0.0,
            text_rise: 0.0,
            text_render_mode: 0,
            text_matrix: MATRIX_IDENTITY,
        }
    }
}

impl Default for CanvasGraphicsState {
    fn default() -> Self {
        Self::new()
    }
}
