//! Name trees, outlines and page labels through the catalog.

use vellum_core::document::{
    OutlineId, PageLabelStyle, PdfDestination, PdfDocument, StampingProperties, WriterProperties,
};
use vellum_core::error::PdfError;
use vellum_core::model::PdfObject;

#[test]
fn test_name_tree_rejects_duplicates() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let mut catalog = doc.catalog();
    let mut tree = catalog.get_name_tree("JavaScript");
    tree.add_entry(b"init".to_vec(), PdfObject::Int(1)).unwrap();
    tree.add_entry(b"done".to_vec(), PdfObject::Int(2)).unwrap();
    assert!(matches!(
        tree.add_entry(b"init".to_vec(), PdfObject::Int(3)),
        Err(PdfError::DuplicateKey(_))
    ));
    let names: Vec<&[u8]> = tree.get_names().keys().map(Vec::as_slice).collect();
    assert_eq!(names, vec![&b"done"[..], &b"init"[..]]);
}

#[test]
fn test_many_names_survive_a_round_trip() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let page = doc.add_new_page().unwrap();
    for i in 0..200 {
        let dest = PdfDestination::explicit(page.objref(), "XYZ", &[0.0, f64::from(i), 0.0]);
        doc.catalog()
            .add_named_destination(format!("dest{i:03}"), dest.to_object())
            .unwrap();
    }
    let bytes = doc.close().unwrap();

    let mut doc = PdfDocument::open(bytes).unwrap();
    let mut catalog = doc.catalog();
    let mut dests = catalog.get_name_tree("Dests");
    assert_eq!(dests.get_names().len(), 200);
    assert!(dests.get(&b"dest150".to_vec()).is_some());
}

#[test]
fn test_append_mode_name_tree_entry() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let page = doc.add_new_page().unwrap();
    let dest = PdfDestination::explicit(page.objref(), "Fit", &[]);
    doc.catalog().add_named_destination("start", dest.to_object()).unwrap();
    let original = doc.close().unwrap();

    let mut doc = PdfDocument::open_for_stamping(
        original.clone(),
        WriterProperties::default(),
        StampingProperties::new().use_append_mode(),
    )
    .unwrap();
    let spec = doc
        .add_object(vellum_core::pdf_dict! {
            "Type" => PdfObject::name("Filespec"),
            "F" => PdfObject::text("notes.txt"),
        })
        .unwrap();
    doc.catalog()
        .get_name_tree("EmbeddedFiles")
        .add_entry(b"notes.txt".to_vec(), spec)
        .unwrap();
    let bytes = doc.close().unwrap();
    assert!(bytes[original.len()..].windows(5).any(|w| w == b"/Prev"));

    let mut doc = PdfDocument::open(bytes).unwrap();
    assert!(!doc.has_rebuilt_xref());
    let mut catalog = doc.catalog();
    assert!(catalog.get_name_tree("EmbeddedFiles").get(&b"notes.txt".to_vec()).is_some());
    assert!(catalog.get_name_tree("Dests").get(&b"start".to_vec()).is_some());
}

#[test]
fn test_outlines_absent_on_read_only_document() {
    let doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let bytes = doc.close().unwrap();
    let mut doc = PdfDocument::open(bytes).unwrap();
    assert!(doc.catalog().get_outlines(false).is_none());
}

#[test]
fn test_outlines_round_trip() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let first = doc.add_new_page().unwrap();
    let second = doc.add_new_page().unwrap();
    let mut catalog = doc.catalog();
    let chapter = catalog
        .add_outline(OutlineId::ROOT, "Chapter", Some(PdfDestination::explicit(first.objref(), "Fit", &[])))
        .unwrap();
    catalog
        .add_outline(chapter, "Section", Some(PdfDestination::explicit(second.objref(), "Fit", &[])))
        .unwrap();
    let bytes = doc.close().unwrap();

    let mut doc = PdfDocument::open(bytes).unwrap();
    let second = doc.page(1).unwrap();
    let mut catalog = doc.catalog();
    let tree = catalog.get_outlines(false).unwrap();
    let titles: Vec<&str> = tree.iter().map(|(_, o)| o.title.as_str()).collect();
    assert_eq!(titles, vec!["Chapter", "Section"]);
    assert_eq!(tree.outlines_for_page(second.objref()).len(), 1);
}

#[test]
fn test_page_labels_after_reopen() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    for _ in 0..4 {
        doc.add_new_page().unwrap();
    }
    let mut catalog = doc.catalog();
    catalog
        .add_page_label(0, Some(PageLabelStyle::LowerRoman), None, 1)
        .unwrap();
    catalog
        .add_page_label(2, Some(PageLabelStyle::Decimal), Some("A-"), 1)
        .unwrap();
    let bytes = doc.close().unwrap();

    let mut doc = PdfDocument::open(bytes).unwrap();
    assert_eq!(doc.page_labels().unwrap(), vec!["i", "ii", "A-1", "A-2"]);
}

#[test]
fn test_additional_actions_and_collection() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let mut catalog = doc.catalog();
    assert!(catalog.additional_actions().is_none());
    let script = |js: &str| {
        vellum_core::pdf_dict! {
            "S" => PdfObject::name("JavaScript"),
            "JS" => PdfObject::text(js),
        }
    };
    catalog.set_additional_action("WC", script("closing()")).unwrap();
    catalog.set_additional_action("DP", script("printed()")).unwrap();
    assert!(matches!(
        catalog.set_additional_action("PO", script("open()")),
        Err(PdfError::InvalidArgument(_))
    ));
    catalog
        .set_collection(vellum_core::pdf_dict! {
            "Type" => PdfObject::name("Collection"),
            "View" => PdfObject::name("T"),
        })
        .unwrap();
    let bytes = doc.close().unwrap();

    let mut doc = PdfDocument::open(bytes).unwrap();
    let catalog = doc.catalog();
    let actions = catalog.additional_actions().unwrap();
    let events: Vec<&str> = actions.keys().map(String::as_str).collect();
    assert_eq!(events, vec!["WC", "DP"]);
    assert_eq!(actions["DP"].get("JS"), Some(&PdfObject::text("printed()")));
    let collection = catalog.collection().unwrap();
    assert_eq!(collection.get("View"), Some(&PdfObject::name("T")));
}
