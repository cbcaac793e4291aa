//! Miscellaneous routines shared by the object model, the canvas and the path parser.
//!
//! - Geometric types (Point, Rect, Matrix) and matrix operations
//! - Number formatting for content streams and object serialization
//! - Text string encoding (PDFDocEncoding / UTF-16BE)
//! - Page label numbering styles

use std::fmt::Write as _;

/// A 2D point (x, y).
pub type Point = (f64, f64);

/// A rectangle defined by (x0, y0, x1, y1).
pub type Rect = (f64, f64, f64, f64);

/// A 6-element affine transformation matrix (a, b, c, d, e, f).
/// Transforms point (x, y) to (ax + cy + e, bx + dy + f).
pub type Matrix = (f64, f64, f64, f64, f64, f64);

/// Identity transformation matrix.
pub const MATRIX_IDENTITY: Matrix = (1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

/// Multiplies two matrices: result = m1 * m0.
/// This applies m1 first, then m0.
pub fn mult_matrix(m1: Matrix, m0: Matrix) -> Matrix {
    let (a1, b1, c1, d1, e1, f1) = m1;
    let (a0, b0, c0, d0, e0, f0) = m0;
    (
        a0 * a1 + c0 * b1,
        b0 * a1 + d0 * b1,
        a0 * c1 + c0 * d1,
        b0 * c1 + d0 * d1,
        a0 * e1 + c0 * f1 + e0,
        b0 * e1 + d0 * f1 + f0,
    )
}

/// Applies a matrix to a point.
pub fn apply_matrix_pt(m: Matrix, v: Point) -> Point {
    let (a, b, c, d, e, f) = m;
    let (x, y) = v;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Determinant of the linear part of a matrix.
///
/// For an image CTM this is the signed area of the unit square after transformation.
pub fn matrix_determinant(m: Matrix) -> f64 {
    m.0 * m.3 - m.1 * m.2
}

/// Converts a slice of six numbers to a matrix.
pub fn matrix_from_slice(values: &[f64]) -> Option<Matrix> {
    match values {
        [a, b, c, d, e, f] => Some((*a, *b, *c, *d, *e, *f)),
        _ => None,
    }
}

/// Unpacks variable-length unsigned integers (big endian).
pub fn nunpack(s: &[u8], default: u64) -> u64 {
    if s.is_empty() {
        return default;
    }
    let mut result: u64 = 0;
    for &byte in s {
        result = (result << 8) | (byte as u64);
    }
    result
}

/// Appends a number the way it is written in content streams and object bodies.
///
/// Integral values are written without a fractional part; other values are
/// written with at most five decimals and no trailing zeros.
pub fn write_number(out: &mut Vec<u8>, value: f64) {
    if !value.is_finite() {
        out.push(b'0');
        return;
    }
    let rounded = (value * 100_000.0).round() / 100_000.0;
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        let mut buf = String::new();
        let _ = write!(buf, "{}", rounded as i64);
        out.extend_from_slice(buf.as_bytes());
        return;
    }
    let mut buf = format!("{:.5}", rounded);
    while buf.ends_with('0') {
        buf.pop();
    }
    if buf.ends_with('.') {
        buf.pop();
    }
    if let Some(stripped) = buf.strip_prefix("0.") {
        buf = format!(".{}", stripped);
    } else if let Some(stripped) = buf.strip_prefix("-0.") {
        buf = format!("-.{}", stripped);
    }
    if buf == "-0" {
        buf = "0".to_string();
    }
    out.extend_from_slice(buf.as_bytes());
}

/// Formats a number with [`write_number`].
pub fn format_number(value: f64) -> String {
    let mut out = Vec::new();
    write_number(&mut out, value);
    String::from_utf8_lossy(&out).into_owned()
}

/// PDFDocEncoding table - maps bytes 0-255 to Unicode code points.
const PDF_DOC_ENCODING: [u32; 256] = [
    0x0000, 0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008, 0x0009, 0x000A, 0x000B,
    0x000C, 0x000D, 0x000E, 0x000F, 0x0010, 0x0011, 0x0012, 0x0013, 0x0014, 0x0015, 0x0017, 0x0017,
    0x02D8, 0x02C7, 0x02C6, 0x02D9, 0x02DD, 0x02DB, 0x02DA, 0x02DC, 0x0020, 0x0021, 0x0022, 0x0023,
    0x0024, 0x0025, 0x0026, 0x0027, 0x0028, 0x0029, 0x002A, 0x002B, 0x002C, 0x002D, 0x002E, 0x002F,
    0x0030, 0x0031, 0x0032, 0x0033, 0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003A, 0x003B,
    0x003C, 0x003D, 0x003E, 0x003F, 0x0040, 0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047,
    0x0048, 0x0049, 0x004A, 0x004B, 0x004C, 0x004D, 0x004E, 0x004F, 0x0050, 0x0051, 0x0052, 0x0053,
    0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005A, 0x005B, 0x005C, 0x005D, 0x005E, 0x005F,
    0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067, 0x0068, 0x0069, 0x006A, 0x006B,
    0x006C, 0x006D, 0x006E, 0x006F, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074, 0x0075, 0x0076, 0x0077,
    0x0078, 0x0079, 0x007A, 0x007B, 0x007C, 0x007D, 0x007E, 0x0000, 0x2022, 0x2020, 0x2021, 0x2026,
    0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203A, 0x2212, 0x2030, 0x201E, 0x201C, 0x201D, 0x2018,
    0x2019, 0x201A, 0x2122, 0xFB01, 0xFB02, 0x0141, 0x0152, 0x0160, 0x0178, 0x017D, 0x0131, 0x0142,
    0x0153, 0x0161, 0x017E, 0x0000, 0x20AC, 0x00A1, 0x00A2, 0x00A3, 0x00A4, 0x00A5, 0x00A6, 0x00A7,
    0x00A8, 0x00A9, 0x00AA, 0x00AB, 0x00AC, 0x0000, 0x00AE, 0x00AF, 0x00B0, 0x00B1, 0x00B2, 0x00B3,
    0x00B4, 0x00B5, 0x00B6, 0x00B7, 0x00B8, 0x00B9, 0x00BA, 0x00BB, 0x00BC, 0x00BD, 0x00BE, 0x00BF,
    0x00C0, 0x00C1, 0x00C2, 0x00C3, 0x00C4, 0x00C5, 0x00C6, 0x00C7, 0x00C8, 0x00C9, 0x00CA, 0x00CB,
    0x00CC, 0x00CD, 0x00CE, 0x00CF, 0x00D0, 0x00D1, 0x00D2, 0x00D3, 0x00D4, 0x00D5, 0x00D6, 0x00D7,
    0x00D8, 0x00D9, 0x00DA, 0x00DB, 0x00DC, 0x00DD, 0x00DE, 0x00DF, 0x00E0, 0x00E1, 0x00E2, 0x00E3,
    0x00E4, 0x00E5, 0x00E6, 0x00E7, 0x00E8, 0x00E9, 0x00EA, 0x00EB, 0x00EC, 0x00ED, 0x00EE, 0x00EF,
    0x00F0, 0x00F1, 0x00F2, 0x00F3, 0x00F4, 0x00F5, 0x00F6, 0x00F7, 0x00F8, 0x00F9, 0x00FA, 0x00FB,
    0x00FC, 0x00FD, 0x00FE, 0x00FF,
];

/// Decodes a text string (PDFDocEncoding, or UTF-16BE when it starts with a BOM).
pub fn decode_text(s: &[u8]) -> String {
    if s.len() >= 2 && s[0] == 0xFE && s[1] == 0xFF {
        let units: Vec<u16> = s[2..]
            .chunks_exact(2)
            .map(|chunk| ((chunk[0] as u16) << 8) | (chunk[1] as u16))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        s.iter()
            .filter_map(|&c| char::from_u32(PDF_DOC_ENCODING[c as usize]))
            .collect()
    }
}

/// Encodes a text string: plain bytes for printable ASCII, UTF-16BE with a BOM otherwise.
pub fn encode_text(s: &str) -> Vec<u8> {
    if s.bytes().all(|b| (0x20..0x7f).contains(&b) || b == b'\n' || b == b'\t') {
        return s.as_bytes().to_vec();
    }
    let mut out = vec![0xFE, 0xFF];
    for unit in s.encode_utf16() {
        out.extend_from_slice(&unit.to_be_bytes());
    }
    out
}

const ROMAN_NUMERALS: [(u32, &str); 13] = [
    (1000, "m"),
    (900, "cm"),
    (500, "d"),
    (400, "cd"),
    (100, "c"),
    (90, "xc"),
    (50, "l"),
    (40, "xl"),
    (10, "x"),
    (9, "ix"),
    (5, "v"),
    (4, "iv"),
    (1, "i"),
];

/// Formats a number as lowercase Roman numerals. Zero yields an empty string.
pub fn format_int_roman(value: u32) -> String {
    let mut n = value;
    let mut result = String::new();
    for (step, numeral) in ROMAN_NUMERALS {
        while n >= step {
            result.push_str(numeral);
            n -= step;
        }
    }
    result
}

/// Formats a number as lowercase letters a-z, aa-zz, etc. Zero yields an empty string.
pub fn format_int_alpha(value: u32) -> String {
    let mut result = Vec::new();
    let mut value = value;

    while value != 0 {
        let remainder = ((value - 1) % 26) as u8;
        value = (value - 1) / 26;
        result.push((b'a' + remainder) as char);
    }

    result.reverse();
    result.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mult_matrix_identity() {
        let identity = MATRIX_IDENTITY;
        assert_eq!(mult_matrix(identity, identity), identity);
    }

    #[test]
    fn test_mult_matrix_translate_then_scale() {
        let translate = (1.0, 0.0, 0.0, 1.0, 10.0, 20.0);
        let scale = (2.0, 0.0, 0.0, 2.0, 0.0, 0.0);
        let m = mult_matrix(translate, scale);
        assert_eq!(apply_matrix_pt(m, (1.0, 1.0)), (22.0, 42.0));
    }

    #[test]
    fn test_write_number() {
        assert_eq!(format_number(100.0), "100");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.5), ".5");
        assert_eq!(format_number(-0.25), "-.25");
        assert_eq!(format_number(1.123456789), "1.12346");
        assert_eq!(format_number(-0.000001), "0");
        assert_eq!(format_number(f64::NAN), "0");
    }

    #[test]
    fn test_text_round_trip() {
        assert_eq!(encode_text("Chapter 1"), b"Chapter 1".to_vec());
        let encoded = encode_text("Kapitel \u{00fc}");
        assert_eq!(&encoded[..2], &[0xFE, 0xFF]);
        assert_eq!(decode_text(&encoded), "Kapitel \u{00fc}");
    }

    #[test]
    fn test_format_roman() {
        assert_eq!(format_int_roman(1), "i");
        assert_eq!(format_int_roman(4), "iv");
        assert_eq!(format_int_roman(1994), "mcmxciv");
        assert_eq!(format_int_roman(0), "");
    }

    #[test]
    fn test_format_alpha() {
        assert_eq!(format_int_alpha(1), "a");
        assert_eq!(format_int_alpha(26), "z");
        assert_eq!(format_int_alpha(27), "aa");
        assert_eq!(format_int_alpha(0), "");
    }

    #[test]
    fn test_determinant() {
        assert_eq!(matrix_determinant((100.0, 0.0, 0.0, 50.0, 10.0, 10.0)), 5000.0);
    }
}
