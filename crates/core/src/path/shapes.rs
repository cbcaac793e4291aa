//! Absolute path shapes and how they are drawn.

use super::arc::endpoint_arc;
use crate::canvas::PdfCanvas;
use crate::utils::Point;

/// One segment of parsed path data, in absolute coordinates.
///
/// `relative` records whether the operator was the lowercase form; the
/// coordinates are resolved against the current point either way.
#[derive(Debug, Clone, PartialEq)]
pub enum PathShape {
    MoveTo {
        to: Point,
        relative: bool,
    },
    LineTo {
        to: Point,
        relative: bool,
    },
    HorizontalLineTo {
        to: Point,
        relative: bool,
    },
    VerticalLineTo {
        to: Point,
        relative: bool,
    },
    CubicTo {
        control1: Point,
        control2: Point,
        end: Point,
        relative: bool,
    },
    /// Cubic curve whose first control point mirrors the previous curve's second
    SmoothCubicTo {
        control1: Point,
        control2: Point,
        end: Point,
        relative: bool,
    },
    QuadTo {
        start: Point,
        control: Point,
        end: Point,
        relative: bool,
    },
    /// Quadratic curve whose control point mirrors the previous one
    SmoothQuadTo {
        start: Point,
        control: Point,
        end: Point,
        relative: bool,
    },
    Arc {
        start: Point,
        radii: (f64, f64),
        rotation: f64,
        large_arc: bool,
        sweep: bool,
        end: Point,
        relative: bool,
    },
    /// Closes the subpath, returning to the point of its MoveTo
    ClosePath {
        to: Point,
        relative: bool,
    },
}

impl PathShape {
    /// Current point once the shape is drawn.
    pub fn end_point(&self) -> Point {
        match *self {
            Self::MoveTo { to, .. }
            | Self::LineTo { to, .. }
            | Self::HorizontalLineTo { to, .. }
            | Self::VerticalLineTo { to, .. }
            | Self::ClosePath { to, .. } => to,
            Self::CubicTo { end, .. }
            | Self::SmoothCubicTo { end, .. }
            | Self::QuadTo { end, .. }
            | Self::SmoothQuadTo { end, .. }
            | Self::Arc { end, .. } => end,
        }
    }

    /// Whether the shape came from a lowercase operator.
    pub fn is_relative(&self) -> bool {
        match *self {
            Self::MoveTo { relative, .. }
            | Self::LineTo { relative, .. }
            | Self::HorizontalLineTo { relative, .. }
            | Self::VerticalLineTo { relative, .. }
            | Self::CubicTo { relative, .. }
            | Self::SmoothCubicTo { relative, .. }
            | Self::QuadTo { relative, .. }
            | Self::SmoothQuadTo { relative, .. }
            | Self::Arc { relative, .. }
            | Self::ClosePath { relative, .. } => relative,
        }
    }

    /// Writes the shape as path construction operators.
    pub fn draw(&self, canvas: &mut PdfCanvas<'_>) {
        match *self {
            Self::MoveTo { to: (x, y), .. } => {
                canvas.move_to(x, y);
            }
            Self::LineTo { to: (x, y), .. }
            | Self::HorizontalLineTo { to: (x, y), .. }
            | Self::VerticalLineTo { to: (x, y), .. } => {
                canvas.line_to(x, y);
            }
            Self::CubicTo {
                control1, control2, end, ..
            }
            | Self::SmoothCubicTo {
                control1, control2, end, ..
            } => {
                canvas.curve_to(control1.0, control1.1, control2.0, control2.1, end.0, end.1);
            }
            Self::QuadTo { start, control, end, .. } | Self::SmoothQuadTo { start, control, end, .. } => {
                // degree elevation: cubic controls sit 2/3 of the way to the quadratic one
                let c1 = (
                    start.0 + 2.0 / 3.0 * (control.0 - start.0),
                    start.1 + 2.0 / 3.0 * (control.1 - start.1),
                );
                let c2 = (
                    end.0 + 2.0 / 3.0 * (control.0 - end.0),
                    end.1 + 2.0 / 3.0 * (control.1 - end.1),
                );
                canvas.curve_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
            }
            Self::Arc {
                start,
                radii,
                rotation,
                large_arc,
                sweep,
                end,
                ..
            } => match endpoint_arc(start, radii, rotation, large_arc, sweep, end) {
                Some(segments) => {
                    for [_, c1, c2, p] in segments {
                        canvas.curve_to(c1.0, c1.1, c2.0, c2.1, p.0, p.1);
                    }
                }
                None => {
                    canvas.line_to(end.0, end.1);
                }
            },
            Self::ClosePath { .. } => {
                canvas.close_path();
            }
        }
    }
}

/// Draws every shape in order.
pub fn draw_path(canvas: &mut PdfCanvas<'_>, shapes: &[PathShape]) {
    for shape in shapes {
        shape.draw(canvas);
    }
}
