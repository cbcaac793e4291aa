//! Object serialization.
//!
//! Writes primitive objects in PDF syntax. Streams are only written as the
//! body of an indirect object; the writer makes sure nested streams have been
//! replaced by references before anything reaches this module.

use crate::model::objects::{ObjRef, PdfObject, PdfStream};
use crate::parser::lexer::name_to_bytes;
use crate::utils::write_number;

/// Appends `obj` in PDF syntax.
pub fn write_object(out: &mut Vec<u8>, obj: &PdfObject) {
    match obj {
        PdfObject::Null => out.extend_from_slice(b"null"),
        PdfObject::Bool(true) => out.extend_from_slice(b"true"),
        PdfObject::Bool(false) => out.extend_from_slice(b"false"),
        PdfObject::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
        PdfObject::Real(n) => write_number(out, *n),
        PdfObject::Name(name) => write_name(out, name),
        PdfObject::String(bytes) => write_string(out, bytes),
        PdfObject::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_object(out, item);
            }
            out.push(b']');
        }
        PdfObject::Dict(dict) => write_dict(out, dict.iter()),
        PdfObject::Stream(stream) => write_stream(out, stream),
        PdfObject::Ref(r) => write_ref(out, *r),
    }
}

/// Appends `n g R`.
pub fn write_ref(out: &mut Vec<u8>, r: ObjRef) {
    out.extend_from_slice(format!("{} {} R", r.objid, r.genno).as_bytes());
}

fn write_dict<'a>(out: &mut Vec<u8>, entries: impl Iterator<Item = (&'a String, &'a PdfObject)>) {
    out.extend_from_slice(b"<<");
    for (key, value) in entries {
        write_name(out, key);
        if !matches!(
            value,
            PdfObject::Name(_)
                | PdfObject::String(_)
                | PdfObject::Array(_)
                | PdfObject::Dict(_)
                | PdfObject::Stream(_)
        ) {
            out.push(b' ');
        }
        write_object(out, value);
    }
    out.extend_from_slice(b">>");
}

/// Writes the stream dictionary with a recomputed /Length, then the payload.
fn write_stream(out: &mut Vec<u8>, stream: &PdfStream) {
    let data = stream.rawdata();
    let entries = stream
        .attrs
        .iter()
        .filter(|(k, _)| k.as_str() != "Length");
    let length_key = "Length".to_string();
    let length = PdfObject::Int(data.len() as i64);
    write_dict(out, entries.chain(std::iter::once((&length_key, &length))));
    out.extend_from_slice(b"\nstream\n");
    out.extend_from_slice(data);
    out.extend_from_slice(b"\nendstream");
}

/// Appends `/name`, escaping delimiters, whitespace and non-printable bytes as `#xx`.
pub fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    for byte in name_to_bytes(name) {
        match byte {
            b'!'..=b'~' if !is_delimiter(byte) && byte != b'#' => out.push(byte),
            _ => {
                out.push(b'#');
                write_hex(out, byte);
            }
        }
    }
}

fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

/// Appends a literal string, or a hex string when the bytes are mostly binary.
pub fn write_string(out: &mut Vec<u8>, bytes: &[u8]) {
    let binary = bytes
        .iter()
        .filter(|&&b| b < 0x20 && !matches!(b, b'\n' | b'\r' | b'\t'))
        .count();
    if binary * 4 > bytes.len() && !bytes.is_empty() {
        out.push(b'<');
        for &byte in bytes {
            write_hex(out, byte);
        }
        out.push(b'>');
        return;
    }
    out.push(b'(');
    for &byte in bytes {
        match byte {
            b'\\' | b'(' | b')' => out.extend_from_slice(&[b'\\', byte]),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\n' => out.extend_from_slice(b"\\n"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn write_hex(out: &mut Vec<u8>, byte: u8) {
    const HEX_DIGITS: [u8; 16] = *b"0123456789ABCDEF";
    out.push(HEX_DIGITS[(byte >> 4) as usize]);
    out.push(HEX_DIGITS[(byte & 0x0F) as usize]);
}

/// Appends `n g obj ... endobj`.
pub fn write_indirect(out: &mut Vec<u8>, r: ObjRef, obj: &PdfObject) {
    out.extend_from_slice(format!("{} {} obj\n", r.objid, r.genno).as_bytes());
    write_object(out, obj);
    out.extend_from_slice(b"\nendobj\n");
}

/// Serializes `obj` into a fresh buffer.
pub fn object_to_bytes(obj: &PdfObject) -> Vec<u8> {
    let mut out = Vec::new();
    write_object(&mut out, obj);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::objects::PdfDict;
    use crate::parser::pdf_parser::PdfParser;

    #[test]
    fn test_write_dict() {
        let dict = crate::pdf_dict! {
            "Type" => PdfObject::name("Page"),
            "Parent" => ObjRef::new(2, 0),
            "MediaBox" => PdfObject::numbers(&[0.0, 0.0, 595.0, 842.5]),
        };
        assert_eq!(
            object_to_bytes(&PdfObject::Dict(dict)),
            b"<</Type/Page/Parent 2 0 R/MediaBox[0 0 595 842.5]>>".to_vec()
        );
    }

    #[test]
    fn test_name_escaping() {
        let mut out = Vec::new();
        write_name(&mut out, "A B#(c)");
        assert_eq!(out, b"/A#20B#23#28c#29".to_vec());
    }

    #[test]
    fn test_strings_parse_back() {
        for bytes in [
            b"plain (nested) \\ back".to_vec(),
            b"line\r\nbreak".to_vec(),
            vec![0, 1, 2, 3, 255],
        ] {
            let written = object_to_bytes(&PdfObject::String(bytes.clone()));
            let parsed = PdfParser::new(&written).parse_object().unwrap();
            assert_eq!(parsed, PdfObject::String(bytes));
        }
    }

    #[test]
    fn test_stream_length_is_recomputed() {
        let mut attrs = PdfDict::new();
        attrs.insert("Length".into(), PdfObject::Int(99));
        let stream = PdfStream::new(attrs, b"abc".to_vec());
        let bytes = object_to_bytes(&PdfObject::from(stream));
        assert_eq!(bytes, b"<</Length 3>>\nstream\nabc\nendstream".to_vec());
    }
}
