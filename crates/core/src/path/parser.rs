//! Path data parser.
//!
//! Reads SVG-style path data (`M 10 10 L 20 10 Z`) into absolute
//! [`PathShape`]s. Lowercase operators take coordinates relative to the
//! current point.

use super::shapes::PathShape;
use crate::error::{PdfError, Result};
use crate::utils::Point;
use regex::Regex;
use std::sync::LazyLock;

/// Any letter that is neither an operator nor an exponent marker.
static UNKNOWN_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^mzlhvcsqtaeMZLHVCSQTAE\P{L}]").unwrap_or_else(|_| unreachable!())
});

const OPERATORS: &str = "mzlhvcsqtaMZLHVCSQTA";

/// Number of arguments one application of `op` consumes.
const fn arity(op: char) -> usize {
    match op {
        'h' | 'v' => 1,
        'm' | 'l' | 't' => 2,
        's' | 'q' => 4,
        'c' => 6,
        'a' => 7,
        _ => 0,
    }
}

/// Parses path data into shapes.
///
/// An operator followed by several argument groups repeats; extra pairs
/// after a MoveTo become LineTo shapes. A trailing incomplete group is
/// dropped.
pub fn parse_path(data: &str) -> Result<Vec<PathShape>> {
    if let Some(letter) = UNKNOWN_LETTER.find(data) {
        return Err(PdfError::InvalidPathOperator(letter.as_str().to_string()));
    }
    let mut builder = PathBuilder::default();
    for (op, args) in split_operators(data) {
        let values = parse_numbers(&normalize_separators(args))?;
        builder.apply(op, &values)?;
    }
    Ok(builder.shapes)
}

/// Splits the data at each operator letter.
fn split_operators(data: &str) -> Vec<(char, &str)> {
    let mut segments = Vec::new();
    let mut current: Option<(char, usize)> = None;
    for (i, c) in data.char_indices() {
        if !OPERATORS.contains(c) {
            continue;
        }
        match current {
            Some((op, start)) => segments.push((op, &data[start..i])),
            None if !data[..i].trim().is_empty() => {
                tracing::debug!(text = &data[..i], "path data before the first operator ignored");
            }
            None => {}
        }
        current = Some((c, i + c.len_utf8()));
    }
    if let Some((op, start)) = current {
        segments.push((op, &data[start..]));
    }
    segments
}

/// Makes every number whitespace separated.
///
/// Commas become spaces. A second `.` starts a new number (`1.5.5` is
/// `1.5 .5`), and so does a `-` that is not an exponent sign.
fn normalize_separators(args: &str) -> String {
    let mut out = String::with_capacity(args.len() + 8);
    let mut has_dot = false;
    let mut prev = None;
    for c in args.chars() {
        match c {
            ',' => {
                out.push(' ');
                has_dot = false;
            }
            c if c.is_whitespace() => {
                out.push(' ');
                has_dot = false;
            }
            '.' => {
                if has_dot {
                    out.push(' ');
                }
                has_dot = true;
                out.push('.');
            }
            '-' => {
                if !matches!(prev, Some('e' | 'E')) {
                    out.push(' ');
                    has_dot = false;
                }
                out.push('-');
            }
            _ => out.push(c),
        }
        prev = Some(c);
    }
    out
}

fn parse_numbers(args: &str) -> Result<Vec<f64>> {
    args.split_whitespace()
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| PdfError::InvalidArgument(format!("malformed number {token:?} in path data")))
        })
        .collect()
}

#[derive(Debug, Default)]
struct PathBuilder {
    shapes: Vec<PathShape>,
    current: Point,
    /// Target of ClosePath, set by the latest MoveTo
    subpath_start: Point,
    last_cubic_control: Option<Point>,
    last_quad_control: Option<Point>,
}

impl PathBuilder {
    fn apply(&mut self, op: char, values: &[f64]) -> Result<()> {
        let relative = op.is_ascii_lowercase();
        let kind = op.to_ascii_lowercase();
        let n = arity(kind);
        if n == 0 {
            if !values.is_empty() {
                tracing::debug!(operator = %op, "arguments of closepath ignored");
            }
            return self.close_path(relative);
        }

        let groups = values.chunks_exact(n);
        if !groups.remainder().is_empty() {
            tracing::debug!(
                operator = %op,
                dropped = groups.remainder().len(),
                "incomplete argument group dropped"
            );
        }
        for (i, args) in groups.enumerate() {
            let kind = if kind == 'm' && i > 0 { 'l' } else { kind };
            self.push(kind, relative, args);
        }
        Ok(())
    }

    fn push(&mut self, kind: char, relative: bool, args: &[f64]) {
        let cur = self.current;
        let base = if relative { cur } else { (0.0, 0.0) };
        let pt = |x: f64, y: f64| (base.0 + x, base.1 + y);

        let shape = match (kind, args) {
            ('m', &[x, y]) => {
                let to = pt(x, y);
                self.subpath_start = to;
                PathShape::MoveTo { to, relative }
            }
            ('l', &[x, y]) => PathShape::LineTo { to: pt(x, y), relative },
            ('h', &[x]) => PathShape::HorizontalLineTo {
                to: (base.0 + x, cur.1),
                relative,
            },
            ('v', &[y]) => PathShape::VerticalLineTo {
                to: (cur.0, base.1 + y),
                relative,
            },
            ('c', &[x1, y1, x2, y2, x, y]) => PathShape::CubicTo {
                control1: pt(x1, y1),
                control2: pt(x2, y2),
                end: pt(x, y),
                relative,
            },
            ('s', &[x2, y2, x, y]) => PathShape::SmoothCubicTo {
                control1: self.reflect(self.last_cubic_control),
                control2: pt(x2, y2),
                end: pt(x, y),
                relative,
            },
            ('q', &[x1, y1, x, y]) => PathShape::QuadTo {
                start: cur,
                control: pt(x1, y1),
                end: pt(x, y),
                relative,
            },
            ('t', &[x, y]) => PathShape::SmoothQuadTo {
                start: cur,
                control: self.reflect(self.last_quad_control),
                end: pt(x, y),
                relative,
            },
            ('a', &[rx, ry, rotation, large_arc, sweep, x, y]) => PathShape::Arc {
                start: cur,
                radii: (rx, ry),
                rotation,
                large_arc: large_arc != 0.0,
                sweep: sweep != 0.0,
                end: pt(x, y),
                relative,
            },
            _ => return,
        };

        self.last_cubic_control = match shape {
            PathShape::CubicTo { control2, .. } | PathShape::SmoothCubicTo { control2, .. } => Some(control2),
            _ => None,
        };
        self.last_quad_control = match shape {
            PathShape::QuadTo { control, .. } | PathShape::SmoothQuadTo { control, .. } => Some(control),
            _ => None,
        };
        self.current = shape.end_point();
        self.shapes.push(shape);
    }

    /// Previous control point mirrored through the current point, or the
    /// current point when the previous shape was not a matching curve.
    fn reflect(&self, control: Option<Point>) -> Point {
        let cur = self.current;
        match control {
            Some(c) => (2.0 * cur.0 - c.0, 2.0 * cur.1 - c.1),
            None => cur,
        }
    }

    fn close_path(&mut self, relative: bool) -> Result<()> {
        if self.shapes.is_empty() {
            return Err(PdfError::InvalidClosePath);
        }
        let target = self.subpath_start;
        self.shapes.push(PathShape::ClosePath { to: target, relative });
        self.current = target;
        self.last_cubic_control = None;
        self.last_quad_control = None;
        Ok(())
    }
}
