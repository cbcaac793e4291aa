//! Graphics state operators.
//!
//! Handles: q, Q, cm, w, J, j, M, d, ri, i, gs
//!
//! - q/Q: Push/pop the tracked state; an unmatched `Q` is an error
//! - cm: Concatenate to the current transformation matrix
//! - w, J, j, M, d: Line styling (width, cap, join, miter limit, dash)
//! - ri, i: Rendering intent and flatness
//! - gs: Apply a graphics state parameter dictionary through a resource

use crate::canvas::PdfCanvas;
use crate::canvas::resources::ResourceType;
use crate::error::{PdfError, Result};
use crate::model::objects::PdfObject;
use crate::utils::{Matrix, mult_matrix};

impl PdfCanvas<'_> {
    /// Saves the current graphics state.
    ///
    /// PDF operator: `q`
    pub fn save_state(&mut self) -> &mut Self {
        self.stack.push(self.state.clone());
        self.write_operator("q");
        self
    }

    /// Restores the last saved graphics state.
    ///
    /// PDF operator: `Q`
    pub fn restore_state(&mut self) -> Result<&mut Self> {
        let state = self.stack.pop().ok_or(PdfError::UnbalancedSaveRestore)?;
        self.state = state;
        self.write_operator("Q");
        Ok(self)
    }

    /// Concatenates a matrix to the current transformation matrix.
    ///
    /// PDF operator: `cm`
    pub fn concat_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        let matrix = (a, b, c, d, e, f);
        self.state.ctm = mult_matrix(matrix, self.state.ctm);
        self.numbers_op(&[a, b, c, d, e, f], "cm");
        self
    }

    pub fn concat(&mut self, m: Matrix) -> &mut Self {
        self.concat_matrix(m.0, m.1, m.2, m.3, m.4, m.5)
    }

    /// PDF operator: `w`
    pub fn set_line_width(&mut self, width: f64) -> &mut Self {
        self.state.line_width = width;
        self.numbers_op(&[width], "w");
        self
    }

    /// Sets the line cap style (0 butt, 1 round, 2 projecting square).
    ///
    /// PDF operator: `J`
    pub fn set_line_cap(&mut self, cap: i32) -> &mut Self {
        self.state.line_cap = cap;
        self.numbers_op(&[f64::from(cap)], "J");
        self
    }

    /// Sets the line join style (0 miter, 1 round, 2 bevel).
    ///
    /// PDF operator: `j`
    pub fn set_line_join(&mut self, join: i32) -> &mut Self {
        self.state.line_join = join;
        self.numbers_op(&[f64::from(join)], "j");
        self
    }

    /// PDF operator: `M`
    pub fn set_miter_limit(&mut self, limit: f64) -> &mut Self {
        self.state.miter_limit = limit;
        self.numbers_op(&[limit], "M");
        self
    }

    /// Sets the dash pattern. An empty array draws solid lines.
    ///
    /// PDF operator: `d`
    pub fn set_line_dash(&mut self, array: &[f64], phase: f64) -> &mut Self {
        self.state.dash = (array.iter().copied().collect(), phase);
        self.write_object(&PdfObject::numbers(array));
        self.numbers_op(&[phase], "d");
        self
    }

    /// PDF operator: `ri`
    pub fn set_rendering_intent(&mut self, intent: &str) -> &mut Self {
        self.state.intent = Some(intent.to_string());
        self.write_name(intent);
        self.write_operator("ri");
        self
    }

    /// PDF operator: `i`
    pub fn set_flatness(&mut self, flatness: f64) -> &mut Self {
        self.state.flatness = flatness;
        self.numbers_op(&[flatness], "i");
        self
    }

    /// Applies a graphics state parameter dictionary, given directly or by reference.
    ///
    /// PDF operator: `gs`
    pub fn set_ext_gstate(&mut self, gstate: impl Into<PdfObject>) -> Result<&mut Self> {
        let gstate = gstate.into();
        self.state.ext_gstate = gstate.as_ref().ok();
        let name = self.add_resource(ResourceType::ExtGState, gstate)?;
        self.write_name(&name);
        self.write_operator("gs");
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use crate::canvas::PdfCanvas;
    use crate::document::PdfDocument;
    use crate::error::PdfError;

    #[test]
    fn test_restore_without_save_fails() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.save_state().set_line_width(3.0);
        canvas.restore_state().unwrap();
        assert_eq!(canvas.graphics_state().line_width, 1.0);
        assert!(matches!(canvas.restore_state(), Err(PdfError::UnbalancedSaveRestore)));
        assert_eq!(canvas.pending(), b"q\n3 w\nQ\n");
    }

    #[test]
    fn test_concat_tracks_ctm() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas
            .concat_matrix(2.0, 0.0, 0.0, 2.0, 0.0, 0.0)
            .concat_matrix(1.0, 0.0, 0.0, 1.0, 10.0, 5.0);
        assert_eq!(canvas.graphics_state().ctm, (2.0, 0.0, 0.0, 2.0, 20.0, 10.0));
        canvas.set_line_dash(&[3.0, 1.5], 0.0);
        assert!(canvas.pending().ends_with(b"[3 1.5] 0 d\n"));
    }
}
