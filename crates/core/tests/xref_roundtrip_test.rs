//! Writing documents and reading them back.
//!
//! Every output must reopen through its declared cross-reference data, with
//! no fallback scan.

use vellum_core::canvas::PdfCanvas;
use vellum_core::document::{PdfDocument, StampingProperties, WriterProperties};

fn draw_box(doc: &mut PdfDocument, index: usize) {
    let page = doc.page(index).unwrap();
    let mut canvas = PdfCanvas::new(doc, page).unwrap();
    canvas.rectangle(10.0, 10.0, 50.0, 50.0).fill();
    canvas.release().unwrap();
}

fn two_page_document(props: WriterProperties) -> Vec<u8> {
    let mut doc = PdfDocument::new(props).unwrap();
    doc.add_new_page().unwrap();
    doc.add_new_page().unwrap();
    draw_box(&mut doc, 0);
    doc.set_info("Title", "Round trip").unwrap();
    doc.close().unwrap()
}

#[test]
fn test_classic_xref_round_trip() {
    let bytes = two_page_document(WriterProperties::default());
    assert!(bytes.starts_with(b"%PDF-"));
    assert!(bytes.ends_with(b"%%EOF\n"));

    let doc = PdfDocument::open(bytes).unwrap();
    assert!(!doc.has_rebuilt_xref());
    assert!(!doc.uses_xref_stream());
    assert_eq!(doc.page_count(), 2);
    assert_eq!(doc.info_text("Title").as_deref(), Some("Round trip"));
}

#[test]
fn test_full_compression_round_trip() {
    let props = WriterProperties::new().set_full_compression_mode(true);
    let bytes = two_page_document(props);
    assert!(!bytes.windows(5).any(|w| w == b"xref\n"));

    let doc = PdfDocument::open(bytes).unwrap();
    assert!(!doc.has_rebuilt_xref());
    assert!(doc.uses_xref_stream());
    assert_eq!(doc.page_count(), 2);
    let page = doc.page(1).unwrap();
    assert_eq!(doc.media_box(page), Some((0.0, 0.0, 595.0, 842.0)));
}

#[test]
fn test_flushed_pages_round_trip() {
    for full_compression in [false, true] {
        let props = WriterProperties::new().set_full_compression_mode(full_compression);
        let mut doc = PdfDocument::new(props).unwrap();
        let first = doc.add_new_page().unwrap();
        draw_box(&mut doc, 0);
        doc.flush_page(first).unwrap();
        assert!(PdfCanvas::new(&mut doc, first).is_err());
        doc.add_new_page().unwrap();
        draw_box(&mut doc, 1);
        let bytes = doc.close().unwrap();

        let doc = PdfDocument::open(bytes).unwrap();
        assert!(!doc.has_rebuilt_xref(), "full_compression={full_compression}");
        assert_eq!(doc.page_count(), 2);
    }
}

#[test]
fn test_append_mode_keeps_original_bytes() {
    let original = two_page_document(WriterProperties::default());
    let mut doc = PdfDocument::open_for_stamping(
        original.clone(),
        WriterProperties::default(),
        StampingProperties::new().use_append_mode(),
    )
    .unwrap();
    doc.set_info("Title", "Stamped").unwrap();
    draw_box(&mut doc, 1);
    let bytes = doc.close().unwrap();

    assert!(bytes.starts_with(&original));
    let update = &bytes[original.len()..];
    assert!(update.windows(5).any(|w| w == b"/Prev"));

    let doc = PdfDocument::open(bytes).unwrap();
    assert!(!doc.has_rebuilt_xref());
    assert_eq!(doc.info_text("Title").as_deref(), Some("Stamped"));
}

#[test]
fn test_append_to_compressed_document_uses_xref_stream() {
    let original = two_page_document(WriterProperties::new().set_full_compression_mode(true));
    let mut doc = PdfDocument::open_for_stamping(
        original.clone(),
        WriterProperties::default(),
        StampingProperties::new().use_append_mode(),
    )
    .unwrap();
    doc.add_new_page().unwrap();
    let bytes = doc.close().unwrap();

    let update = &bytes[original.len()..];
    assert!(update.windows(10).any(|w| w == b"/Type/XRef"));
    let doc = PdfDocument::open(bytes).unwrap();
    assert!(!doc.has_rebuilt_xref());
    assert_eq!(doc.page_count(), 3);
}

#[test]
fn test_damaged_xref_is_rebuilt() {
    let mut bytes = two_page_document(WriterProperties::default());
    let startxref = bytes
        .windows(9)
        .rposition(|w| w == b"startxref")
        .unwrap();
    // point startxref at garbage
    bytes.truncate(startxref);
    bytes.extend_from_slice(b"startxref\n3\n%%EOF\n");

    let doc = PdfDocument::open(bytes).unwrap();
    assert!(doc.has_rebuilt_xref());
    assert_eq!(doc.page_count(), 2);
}
