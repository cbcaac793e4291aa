//! Content stream operations as produced by `ContentParser`.

use vellum_core::model::PdfObject;
use vellum_core::parser::{ContentParser, Operation};

fn ops(data: &[u8]) -> Vec<Operation> {
    ContentParser::parse(data).expect("parse")
}

#[test]
fn test_text_operations() {
    let parsed = ops(b"BT /F1 12 Tf (Hello) Tj ET");
    let names: Vec<&str> = parsed.iter().map(Operation::op).collect();
    assert_eq!(names, vec!["BT", "Tf", "Tj", "ET"]);
    assert_eq!(
        parsed[1].operands,
        vec![PdfObject::name("F1"), PdfObject::Int(12)]
    );
    assert_eq!(parsed[2].operands, vec![PdfObject::string("Hello")]);
}

#[test]
fn test_array_and_dict_operands() {
    let parsed = ops(b"[(A) -120 (V)] TJ /Span <</MCID 3>> BDC EMC");
    assert_eq!(parsed[0].op(), "TJ");
    assert_eq!(
        parsed[0].operands,
        vec![PdfObject::Array(vec![
            PdfObject::string("A"),
            PdfObject::Int(-120),
            PdfObject::string("V"),
        ])]
    );
    assert_eq!(parsed[1].op(), "BDC");
    let props = parsed[1].operands[1].as_dict().unwrap();
    assert_eq!(props.get("MCID"), Some(&PdfObject::Int(3)));
    assert_eq!(parsed[2].op(), "EMC");
}

#[test]
fn test_inline_image_is_one_operation() {
    let parsed = ops(b"q BI /W 2 /H 1 /BPC 8 /CS /G ID \x00\xff EI Q");
    let names: Vec<&str> = parsed.iter().map(Operation::op).collect();
    assert_eq!(names, vec!["q", "BI", "Q"]);
    let params = parsed[1].operands[0].as_dict().unwrap();
    assert_eq!(params.get("W"), Some(&PdfObject::Int(2)));
    assert!(parsed[1].operands[1].as_string().unwrap().starts_with(&[0x00, 0xff]));
}

#[test]
fn test_numbers_helper_skips_names() {
    let parsed = ops(b"1 0 0 1 72.5 -10 cm /Gs1 gs");
    assert_eq!(parsed[0].numbers(), vec![1.0, 0.0, 0.0, 1.0, 72.5, -10.0]);
    assert!(parsed[1].numbers().is_empty());
}
