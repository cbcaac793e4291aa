//! Copying pages between documents.

use vellum_core::canvas::{PdfCanvas, PdfFont};
use vellum_core::document::{PdfDestination, PdfDocument, WriterProperties, compare_dictionaries};
use vellum_core::model::PdfObject;
use vellum_core::pdf_dict;

/// Two pages; a link on the first jumps to the named destination `target` on the second.
fn source_document() -> Vec<u8> {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let first = doc.add_new_page().unwrap();
    let second = doc.add_new_page().unwrap();
    let font = PdfFont::standard(&mut doc, "Times-Roman").unwrap();
    let mut canvas = PdfCanvas::new(&mut doc, first).unwrap();
    canvas.begin_text().move_text(72.0, 700.0);
    canvas.set_font_and_size(&font, 11.0).unwrap();
    canvas.show_text("see page two").unwrap();
    canvas.end_text();
    canvas.release().unwrap();

    let link = doc
        .add_object(pdf_dict! {
            "Type" => PdfObject::name("Annot"),
            "Subtype" => PdfObject::name("Link"),
            "Rect" => PdfObject::numbers(&[72.0, 700.0, 140.0, 712.0]),
            "Dest" => PdfObject::string("target"),
        })
        .unwrap();
    doc.registry_mut()
        .get_dict_mut(first.objref())
        .unwrap()
        .insert("Annots".into(), PdfObject::Array(vec![link.into()]));
    let dest = PdfDestination::explicit(second.objref(), "Fit", &[]);
    doc.catalog().add_named_destination("target", dest.to_object()).unwrap();
    doc.close().unwrap()
}

fn link_dest(doc: &PdfDocument, page_index: usize) -> PdfObject {
    let page = doc.page(page_index).unwrap();
    let annots = doc.get_object(page.objref()).unwrap().get("Annots").unwrap();
    let link = doc.resolve(annots).as_array().unwrap()[0].clone();
    doc.resolve(&link).get("Dest").cloned().unwrap()
}

#[test]
fn test_copied_page_matches_source() {
    let source = PdfDocument::open(source_document()).unwrap();
    let mut target = PdfDocument::new(WriterProperties::default()).unwrap();
    let copied = source.copy_pages_to(0..2, &mut target).unwrap();
    assert_eq!(copied.len(), 2);
    let bytes = target.close().unwrap();
    let target = PdfDocument::open(bytes).unwrap();

    for index in 0..2 {
        let a = source.get_object(source.page(index).unwrap().objref()).unwrap();
        let b = target.get_object(target.page(index).unwrap().objref()).unwrap();
        assert!(compare_dictionaries(
            source.registry(),
            a.as_dict().unwrap(),
            target.registry(),
            b.as_dict().unwrap(),
        ));
    }
}

#[test]
fn test_named_destinations_are_deduplicated() {
    let source = PdfDocument::open(source_document()).unwrap();
    let mut target = PdfDocument::new(WriterProperties::default()).unwrap();
    source.copy_pages_to(0..2, &mut target).unwrap();
    source.copy_pages_to(0..2, &mut target).unwrap();
    assert_eq!(target.page_count(), 4);

    assert_eq!(link_dest(&target, 0), PdfObject::string("target"));
    assert_eq!(link_dest(&target, 2), PdfObject::string("target_1"));

    let third = target.page(3).unwrap();
    let mut catalog = target.catalog();
    let mut dests = catalog.get_name_tree("Dests");
    let names: Vec<Vec<u8>> = dests.get_names().keys().cloned().collect();
    assert_eq!(names, vec![b"target".to_vec(), b"target_1".to_vec()]);
    let renamed = dests.get(&b"target_1".to_vec()).cloned().unwrap();
    assert_eq!(renamed.as_array().unwrap()[0], PdfObject::Ref(third.objref()));
}

#[test]
fn test_destination_outside_copied_range_is_dropped() {
    let source = PdfDocument::open(source_document()).unwrap();
    let mut target = PdfDocument::new(WriterProperties::default()).unwrap();
    source.copy_pages_to(0..1, &mut target).unwrap();
    let mut catalog = target.catalog();
    assert!(catalog.get_name_tree("Dests").get_names().is_empty());
}

/// Font object behind `/F1` in the resources of page `index`.
fn page_font(doc: &PdfDocument, index: usize) -> PdfObject {
    let page = doc.get_object(doc.page(index).unwrap().objref()).unwrap();
    let resources = doc.resolve(page.get("Resources").unwrap());
    let fonts = doc.resolve(resources.get("Font").unwrap());
    fonts.get("F1").cloned().unwrap()
}

#[test]
fn test_shared_font_stays_shared() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let font = PdfFont::standard(&mut doc, "Helvetica").unwrap();
    for _ in 0..2 {
        let page = doc.add_new_page().unwrap();
        let mut canvas = PdfCanvas::new(&mut doc, page).unwrap();
        canvas.begin_text();
        canvas.set_font_and_size(&font, 12.0).unwrap();
        canvas.show_text("shared").unwrap();
        canvas.end_text();
        canvas.release().unwrap();
    }
    let source = PdfDocument::open(doc.close().unwrap()).unwrap();
    assert_eq!(page_font(&source, 0), page_font(&source, 1));

    let mut target = PdfDocument::new(WriterProperties::default()).unwrap();
    source.copy_pages_to(0..2, &mut target).unwrap();
    let first = page_font(&target, 0);
    assert!(matches!(first, PdfObject::Ref(_)));
    assert_eq!(first, page_font(&target, 1));
}

#[test]
fn test_page_index_destination_is_copied() {
    let mut doc = PdfDocument::new(WriterProperties::default()).unwrap();
    let first = doc.add_new_page().unwrap();
    doc.add_new_page().unwrap();
    let link = doc
        .add_object(pdf_dict! {
            "Type" => PdfObject::name("Annot"),
            "Subtype" => PdfObject::name("Link"),
            "Rect" => PdfObject::numbers(&[0.0, 0.0, 10.0, 10.0]),
            "Dest" => PdfObject::string("second"),
        })
        .unwrap();
    doc.registry_mut()
        .get_dict_mut(first.objref())
        .unwrap()
        .insert("Annots".into(), PdfObject::Array(vec![link.into()]));
    // remote-style destination: zero-based page number instead of a page reference
    let by_index = PdfObject::Array(vec![PdfObject::Int(1), PdfObject::name("Fit")]);
    doc.catalog().add_named_destination("second", by_index).unwrap();
    let source = PdfDocument::open(doc.close().unwrap()).unwrap();

    let mut target = PdfDocument::new(WriterProperties::default()).unwrap();
    source.copy_pages_to(0..2, &mut target).unwrap();
    let second = target.page(1).unwrap();
    let mut catalog = target.catalog();
    let mut dests = catalog.get_name_tree("Dests");
    let copied = dests.get(&b"second".to_vec()).cloned().unwrap();
    assert_eq!(
        copied.as_array().unwrap(),
        &vec![PdfObject::Ref(second.objref()), PdfObject::name("Fit")]
    );
}
