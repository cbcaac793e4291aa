//! Text operators.
//!
//! Handles: BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, Tm, T*, Tj, TJ
//!
//! Glyph widths are not known here, so the tracked text matrix only follows
//! `Tm`, `Td` and `T*`; showing text does not advance it.

use crate::canvas::PdfCanvas;
use crate::canvas::font::PdfFont;
use crate::canvas::resources::ResourceType;
use crate::error::{PdfError, Result};
use crate::model::objects::PdfObject;
use crate::utils::{MATRIX_IDENTITY, mult_matrix};

/// Element of a `TJ` array.
#[derive(Debug, Clone, PartialEq)]
pub enum TextItem {
    Text(String),
    /// Position adjustment in thousandths of text space; positive moves left
    Adjust(f64),
}

impl PdfCanvas<'_> {
    /// Begins a text object and resets the text matrix.
    ///
    /// PDF operator: `BT`
    pub fn begin_text(&mut self) -> &mut Self {
        if self.in_text {
            tracing::warn!("BT inside a text object");
        }
        self.in_text = true;
        self.state.text_matrix = MATRIX_IDENTITY;
        self.write_operator("BT");
        self
    }

    /// PDF operator: `ET`
    pub fn end_text(&mut self) -> &mut Self {
        self.in_text = false;
        self.state.text_matrix = MATRIX_IDENTITY;
        self.write_operator("ET");
        self
    }

    /// Selects `font` at `size`. Zero and negative sizes are written as given.
    ///
    /// PDF operator: `Tf`
    pub fn set_font_and_size(&mut self, font: &PdfFont, size: f64) -> Result<&mut Self> {
        let name = self.add_resource(ResourceType::Font, PdfObject::Ref(font.objref()))?;
        self.fonts.insert(font.objref(), font.clone());
        self.state.font = Some(font.objref());
        self.state.font_size = size;
        self.write_name(&name);
        self.numbers_op(&[size], "Tf");
        Ok(self)
    }

    fn current_font(&self) -> Result<&PdfFont> {
        self.state
            .font
            .and_then(|font| self.fonts.get(&font))
            .ok_or(PdfError::FontNotSet)
    }

    /// Shows `text` encoded with the current font.
    ///
    /// PDF operator: `Tj`
    pub fn show_text(&mut self, text: &str) -> Result<&mut Self> {
        let encoded = self.current_font()?.encode(text);
        self.write_string(&encoded);
        self.write_operator("Tj");
        Ok(self)
    }

    /// Shows strings with individual position adjustments.
    ///
    /// PDF operator: `TJ`
    pub fn show_text_kerned(&mut self, items: &[TextItem]) -> Result<&mut Self> {
        let font = self.current_font()?;
        let array = items
            .iter()
            .map(|item| match item {
                TextItem::Text(text) => PdfObject::String(font.encode(text)),
                TextItem::Adjust(amount) => PdfObject::Real(*amount),
            })
            .collect();
        self.write_object(&PdfObject::Array(array));
        self.write_operator("TJ");
        Ok(self)
    }

    /// PDF operator: `Tm`
    pub fn set_text_matrix(&mut self, a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> &mut Self {
        self.state.text_matrix = (a, b, c, d, e, f);
        self.numbers_op(&[a, b, c, d, e, f], "Tm");
        self
    }

    /// Moves to the start of the next line, offset by `(tx, ty)`.
    ///
    /// PDF operator: `Td`
    pub fn move_text(&mut self, tx: f64, ty: f64) -> &mut Self {
        self.state.text_matrix = mult_matrix((1.0, 0.0, 0.0, 1.0, tx, ty), self.state.text_matrix);
        self.numbers_op(&[tx, ty], "Td");
        self
    }

    /// Moves down by the leading.
    ///
    /// PDF operator: `T*`
    pub fn new_line(&mut self) -> &mut Self {
        let leading = self.state.leading;
        self.state.text_matrix = mult_matrix((1.0, 0.0, 0.0, 1.0, 0.0, -leading), self.state.text_matrix);
        self.write_operator("T*");
        self
    }

    /// PDF operator: `TL`
    pub fn set_leading(&mut self, leading: f64) -> &mut Self {
        self.state.leading = leading;
        self.numbers_op(&[leading], "TL");
        self
    }

    /// PDF operator: `Tc`
    pub fn set_char_spacing(&mut self, spacing: f64) -> &mut Self {
        self.state.char_spacing = spacing;
        self.numbers_op(&[spacing], "Tc");
        self
    }

    /// PDF operator: `Tw`
    pub fn set_word_spacing(&mut self, spacing: f64) -> &mut Self {
        self.state.word_spacing = spacing;
        self.numbers_op(&[spacing], "Tw");
        self
    }

    /// Sets horizontal scaling in percent (100 is normal width).
    ///
    /// PDF operator: `Tz`
    pub fn set_horizontal_scaling(&mut self, scale: f64) -> &mut Self {
        self.state.horizontal_scaling = scale;
        self.numbers_op(&[scale], "Tz");
        self
    }

    /// PDF operator: `Ts`
    pub fn set_text_rise(&mut self, rise: f64) -> &mut Self {
        self.state.text_rise = rise;
        self.numbers_op(&[rise], "Ts");
        self
    }

    /// Sets the text rendering mode (0 fill ... 7 clip).
    ///
    /// PDF operator: `Tr`
    pub fn set_text_rendering_mode(&mut self, mode: i32) -> &mut Self {
        self.state.text_render_mode = mode;
        self.numbers_op(&[f64::from(mode)], "Tr");
        self
    }

    /// Whether a text object is open.
    pub fn in_text(&self) -> bool {
        self.in_text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::PdfDocument;

    #[test]
    fn test_show_text_needs_a_font() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let font = PdfFont::standard(&mut doc, "Helvetica").unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_text();
        assert!(matches!(canvas.show_text("x"), Err(PdfError::FontNotSet)));
        canvas.set_font_and_size(&font, 0.0).unwrap();
        canvas.show_text("a(b)").unwrap();
        canvas
            .show_text_kerned(&[TextItem::Text("A".into()), TextItem::Adjust(-120.0), TextItem::Text("V".into())])
            .unwrap();
        canvas.end_text();
        assert_eq!(canvas.pending(), b"BT\n/F1 0 Tf\n(a\\(b\\)) Tj\n[(A) -120 (V)] TJ\nET\n");
    }

    #[test]
    fn test_text_matrix_tracking() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_text().set_leading(14.0).move_text(72.0, 700.0).new_line();
        assert_eq!(canvas.graphics_state().text_matrix, (1.0, 0.0, 0.0, 1.0, 72.0, 686.0));
        canvas.end_text();
        assert_eq!(canvas.graphics_state().text_matrix, MATRIX_IDENTITY);
    }
}
