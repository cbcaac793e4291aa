//! Font handles used by the canvas.
//!
//! Font programs and metrics live outside this crate. A `PdfFont` is the font
//! dictionary reference plus the encoder that turns text into the byte codes
//! the dictionary expects.

use crate::document::PdfDocument;
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfObject};
use std::fmt;
use std::sync::Arc;

/// Turns text into character codes of one font.
pub trait FontEncoder: Send + Sync {
    fn encode(&self, text: &str) -> Vec<u8>;
}

/// The standard 14 Type 1 fonts every viewer provides.
pub const STANDARD_FONTS: [&str; 14] = [
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Symbol",
    "ZapfDingbats",
];

/// WinAnsiEncoding codes 0x80-0x9F that differ from Latin-1.
const WIN_ANSI_HIGH: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Single-byte WinAnsi encoder; characters without a code become `?`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WinAnsiEncoder;

impl FontEncoder for WinAnsiEncoder {
    fn encode(&self, text: &str) -> Vec<u8> {
        text.chars()
            .map(|c| match c as u32 {
                0..=0x7F | 0xA0..=0xFF => c as u8,
                _ => WIN_ANSI_HIGH
                    .iter()
                    .find(|(ch, _)| *ch == c)
                    .map_or(b'?', |(_, code)| *code),
            })
            .collect()
    }
}

#[derive(Clone)]
pub struct PdfFont {
    objref: ObjRef,
    encoder: Arc<dyn FontEncoder>,
}

impl fmt::Debug for PdfFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PdfFont").field("objref", &self.objref).finish()
    }
}

impl PdfFont {
    /// Font backed by a dictionary registered by the caller.
    pub fn new(objref: ObjRef, encoder: Arc<dyn FontEncoder>) -> Self {
        Self { objref, encoder }
    }

    /// Registers a standard 14 Type 1 font dictionary in `doc`.
    pub fn standard(doc: &mut PdfDocument, base_font: &str) -> Result<Self> {
        if !STANDARD_FONTS.contains(&base_font) {
            return Err(PdfError::InvalidArgument(format!("not a standard font: {base_font}")));
        }
        let mut dict = crate::pdf_dict! {
            "Type" => PdfObject::name("Font"),
            "Subtype" => PdfObject::name("Type1"),
            "BaseFont" => PdfObject::name(base_font),
        };
        // symbolic fonts keep their built-in encoding
        if !matches!(base_font, "Symbol" | "ZapfDingbats") {
            dict.insert("Encoding".into(), PdfObject::name("WinAnsiEncoding"));
        }
        let objref = doc.add_object(dict)?;
        Ok(Self::new(objref, Arc::new(WinAnsiEncoder)))
    }

    pub fn objref(&self) -> ObjRef {
        self.objref
    }

    pub fn encode(&self, text: &str) -> Vec<u8> {
        self.encoder.encode(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_win_ansi_encoding() {
        let encoded = WinAnsiEncoder.encode("a€é\u{4e2d}");
        assert_eq!(encoded, vec![b'a', 0x80, 0xE9, b'?']);
    }

    #[test]
    fn test_standard_font_rejects_unknown_name() {
        let mut doc = PdfDocument::new(Default::default()).unwrap();
        assert!(PdfFont::standard(&mut doc, "Helvetica").is_ok());
        assert!(matches!(
            PdfFont::standard(&mut doc, "Comic"),
            Err(PdfError::InvalidArgument(_))
        ));
    }
}
