//! Path construction and painting operators.
//!
//! Handles: m, l, c, v, y, h, re, S, s, f, f*, B, B*, b, b*, n, W, W*
//!
//! Shapes (`circle`, `ellipse`, `arc`, `round_rectangle`) are built from
//! `m`/`l`/`c`/`h`.

use crate::canvas::PdfCanvas;
use crate::path::arc::bezier_arc;

/// Control point distance of a quarter circle drawn as one cubic curve.
const CIRCLE_KAPPA: f64 = 0.552284749831;

/// Control point factor of the corners drawn by `round_rectangle`.
const ROUND_CORNER_CURVE: f64 = 0.4477;

impl PdfCanvas<'_> {
    /// Starts a new subpath.
    ///
    /// PDF operator: `m`
    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.numbers_op(&[x, y], "m");
        self
    }

    /// PDF operator: `l`
    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.numbers_op(&[x, y], "l");
        self
    }

    /// Appends a cubic Bézier curve.
    ///
    /// PDF operator: `c`
    pub fn curve_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.numbers_op(&[x1, y1, x2, y2, x3, y3], "c");
        self
    }

    /// Cubic curve whose first control point is the current point.
    ///
    /// PDF operator: `v`
    pub fn curve_to_v(&mut self, x2: f64, y2: f64, x3: f64, y3: f64) -> &mut Self {
        self.numbers_op(&[x2, y2, x3, y3], "v");
        self
    }

    /// Cubic curve whose second control point is the end point.
    ///
    /// PDF operator: `y`
    pub fn curve_to_y(&mut self, x1: f64, y1: f64, x3: f64, y3: f64) -> &mut Self {
        self.numbers_op(&[x1, y1, x3, y3], "y");
        self
    }

    /// PDF operator: `h`
    pub fn close_path(&mut self) -> &mut Self {
        self.write_operator("h");
        self
    }

    /// PDF operator: `re`
    pub fn rectangle(&mut self, x: f64, y: f64, width: f64, height: f64) -> &mut Self {
        self.numbers_op(&[x, y, width, height], "re");
        self
    }

    /// Rectangle with corners rounded by `radius`.
    pub fn round_rectangle(&mut self, x: f64, y: f64, width: f64, height: f64, radius: f64) -> &mut Self {
        let (x, width) = if width < 0.0 { (x + width, -width) } else { (x, width) };
        let (y, height) = if height < 0.0 { (y + height, -height) } else { (y, height) };
        let r = radius.abs();
        let k = ROUND_CORNER_CURVE;
        self.move_to(x + r, y)
            .line_to(x + width - r, y)
            .curve_to(x + width - r * k, y, x + width, y + r * k, x + width, y + r)
            .line_to(x + width, y + height - r)
            .curve_to(
                x + width,
                y + height - r * k,
                x + width - r * k,
                y + height,
                x + width - r,
                y + height,
            )
            .line_to(x + r, y + height)
            .curve_to(x + r * k, y + height, x, y + height - r * k, x, y + height - r)
            .line_to(x, y + r)
            .curve_to(x, y + r * k, x + r * k, y, x + r, y)
    }

    /// Circle centered on `(x, y)`, drawn counterclockwise from its rightmost point.
    pub fn circle(&mut self, x: f64, y: f64, r: f64) -> &mut Self {
        let k = CIRCLE_KAPPA;
        self.move_to(x + r, y)
            .curve_to(x + r, y + r * k, x + r * k, y + r, x, y + r)
            .curve_to(x - r * k, y + r, x - r, y + r * k, x - r, y)
            .curve_to(x - r, y - r * k, x - r * k, y - r, x, y - r)
            .curve_to(x + r * k, y - r, x + r, y - r * k, x + r, y)
    }

    /// Ellipse inscribed in the box `(x1, y1)`-`(x2, y2)`.
    pub fn ellipse(&mut self, x1: f64, y1: f64, x2: f64, y2: f64) -> &mut Self {
        self.arc(x1, y1, x2, y2, 0.0, 360.0)
    }

    /// Arc of the ellipse inscribed in the box `(x1, y1)`-`(x2, y2)`.
    ///
    /// Starts a new subpath at `start_angle` degrees and sweeps `extent`
    /// degrees, counterclockwise for positive values.
    pub fn arc(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, start_angle: f64, extent: f64) -> &mut Self {
        let segments = bezier_arc(x1, y1, x2, y2, start_angle, extent);
        let Some(first) = segments.first() else {
            return self;
        };
        self.move_to(first[0].0, first[0].1);
        for [_, c1, c2, end] in segments {
            self.curve_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
        }
        self
    }

    /// PDF operator: `S`
    pub fn stroke(&mut self) -> &mut Self {
        self.write_operator("S");
        self
    }

    /// PDF operator: `s`
    pub fn close_path_stroke(&mut self) -> &mut Self {
        self.write_operator("s");
        self
    }

    /// Fills using the nonzero winding rule.
    ///
    /// PDF operator: `f`
    pub fn fill(&mut self) -> &mut Self {
        self.write_operator("f");
        self
    }

    /// Fills using the even-odd rule.
    ///
    /// PDF operator: `f*`
    pub fn eo_fill(&mut self) -> &mut Self {
        self.write_operator("f*");
        self
    }

    /// PDF operator: `B`
    pub fn fill_stroke(&mut self) -> &mut Self {
        self.write_operator("B");
        self
    }

    /// PDF operator: `B*`
    pub fn eo_fill_stroke(&mut self) -> &mut Self {
        self.write_operator("B*");
        self
    }

    /// PDF operator: `b`
    pub fn close_path_fill_stroke(&mut self) -> &mut Self {
        self.write_operator("b");
        self
    }

    /// PDF operator: `b*`
    pub fn close_path_eo_fill_stroke(&mut self) -> &mut Self {
        self.write_operator("b*");
        self
    }

    /// Intersects the clipping path with the current path (nonzero rule).
    /// Takes effect at the next painting operator, usually `n`.
    ///
    /// PDF operator: `W`
    pub fn clip(&mut self) -> &mut Self {
        self.write_operator("W");
        self
    }

    /// PDF operator: `W*`
    pub fn eo_clip(&mut self) -> &mut Self {
        self.write_operator("W*");
        self
    }

    /// Ends the path without painting it. Written even when no path is pending.
    ///
    /// PDF operator: `n`
    pub fn end_path(&mut self) -> &mut Self {
        self.write_operator("n");
        self
    }

    /// Same as [`end_path`](Self::end_path).
    ///
    /// PDF operator: `n`
    pub fn new_path(&mut self) -> &mut Self {
        self.end_path()
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::PdfCanvas;
    use crate::document::PdfDocument;

    #[test]
    fn test_round_rectangle_normalizes_negative_size() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.round_rectangle(10.0, 10.0, -10.0, 20.0, 0.0);
        let text = String::from_utf8(canvas.pending().to_vec()).unwrap();
        assert!(text.starts_with("0 10 m\n10 10 l\n"));
        assert_eq!(text.matches(" c\n").count(), 4);
    }

    #[test]
    fn test_zero_extent_arc_writes_nothing() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.arc(0.0, 0.0, 10.0, 10.0, 30.0, 0.0);
        assert!(canvas.pending().is_empty());
        canvas.ellipse(0.0, 0.0, 10.0, 10.0);
        let text = String::from_utf8(canvas.pending().to_vec()).unwrap();
        assert!(text.starts_with("10 5 m\n"));
        assert_eq!(text.matches(" c\n").count(), 4);
    }
}
