//! PDF object types.
//!
//! `PdfObject` is the value type of the whole crate. Dictionaries keep their
//! insertion order so that serialized output is deterministic.

use crate::error::{PdfError, Result};
use bytes::Bytes;
use indexmap::IndexMap;
use std::io::{Read, Write};

/// Dictionary type: name -> object, insertion ordered.
pub type PdfDict = IndexMap<String, PdfObject>;

/// PDF Object types - the fundamental value type in PDF.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PdfObject {
    /// Null object
    #[default]
    Null,
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Real (floating point) value
    Real(f64),
    /// Name object (e.g., /Type, /Font)
    Name(String),
    /// String (byte array)
    String(Vec<u8>),
    /// Array of objects
    Array(Vec<Self>),
    /// Dictionary (name -> object mapping)
    Dict(PdfDict),
    /// Stream (dictionary + binary data)
    Stream(Box<PdfStream>),
    /// Indirect object reference
    Ref(ObjRef),
}

impl PdfObject {
    /// Name object from a string slice.
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    /// String object from raw bytes.
    pub fn string(bytes: impl AsRef<[u8]>) -> Self {
        Self::String(bytes.as_ref().to_vec())
    }

    /// Text string object (PDFDocEncoding or UTF-16BE).
    pub fn text(text: &str) -> Self {
        Self::String(crate::utils::encode_text(text))
    }

    /// Array of numbers.
    pub fn numbers(values: &[f64]) -> Self {
        Self::Array(values.iter().map(|&v| Self::from(v)).collect())
    }

    /// Check if this is a null object
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is an indirect reference
    pub const fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }

    /// Get as boolean
    pub const fn as_bool(&self) -> Result<bool> {
        match self {
            Self::Bool(b) => Ok(*b),
            _ => Err(PdfError::TypeError {
                expected: "bool",
                got: self.type_name(),
            }),
        }
    }

    /// Get as integer
    pub const fn as_int(&self) -> Result<i64> {
        match self {
            Self::Int(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "int",
                got: self.type_name(),
            }),
        }
    }

    /// Get numeric value (int or real coerced to f64)
    pub const fn as_num(&self) -> Result<f64> {
        match self {
            Self::Int(n) => Ok(*n as f64),
            Self::Real(n) => Ok(*n),
            _ => Err(PdfError::TypeError {
                expected: "number",
                got: self.type_name(),
            }),
        }
    }

    /// Get as name string
    pub fn as_name(&self) -> Result<&str> {
        match self {
            Self::Name(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "name",
                got: self.type_name(),
            }),
        }
    }

    /// Get as byte string
    pub fn as_string(&self) -> Result<&[u8]> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "string",
                got: self.type_name(),
            }),
        }
    }

    /// Get as array
    pub const fn as_array(&self) -> Result<&Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as mutable array
    pub fn as_array_mut(&mut self) -> Result<&mut Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            _ => Err(PdfError::TypeError {
                expected: "array",
                got: self.type_name(),
            }),
        }
    }

    /// Get as dictionary. Streams expose their attribute dictionary.
    pub fn as_dict(&self) -> Result<&PdfDict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as mutable dictionary. Streams expose their attribute dictionary.
    pub fn as_dict_mut(&mut self) -> Result<&mut PdfDict> {
        match self {
            Self::Dict(d) => Ok(d),
            Self::Stream(s) => Ok(&mut s.attrs),
            _ => Err(PdfError::TypeError {
                expected: "dict",
                got: self.type_name(),
            }),
        }
    }

    /// Get as stream
    pub fn as_stream(&self) -> Result<&PdfStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as mutable stream
    pub fn as_stream_mut(&mut self) -> Result<&mut PdfStream> {
        match self {
            Self::Stream(s) => Ok(s),
            _ => Err(PdfError::TypeError {
                expected: "stream",
                got: self.type_name(),
            }),
        }
    }

    /// Get as object reference
    pub const fn as_ref(&self) -> Result<ObjRef> {
        match self {
            Self::Ref(r) => Ok(*r),
            _ => Err(PdfError::TypeError {
                expected: "ref",
                got: self.type_name(),
            }),
        }
    }

    /// Dictionary (or stream dictionary) lookup; `None` for other types.
    pub fn get(&self, key: &str) -> Option<&Self> {
        self.as_dict().ok().and_then(|d| d.get(key))
    }

    /// Whether this is a dictionary whose /Type is `type_name`.
    pub fn is_type(&self, type_name: &str) -> bool {
        matches!(self.get("Type"), Some(Self::Name(n)) if n == type_name)
    }

    /// Get type name for error messages
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Real(_) => "real",
            Self::Name(_) => "name",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Dict(_) => "dict",
            Self::Stream(_) => "stream",
            Self::Ref(_) => "ref",
        }
    }
}

impl From<bool> for PdfObject {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for PdfObject {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for PdfObject {
    fn from(value: i32) -> Self {
        Self::Int(value as i64)
    }
}

impl From<usize> for PdfObject {
    fn from(value: usize) -> Self {
        Self::Int(value as i64)
    }
}

impl From<f64> for PdfObject {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<ObjRef> for PdfObject {
    fn from(value: ObjRef) -> Self {
        Self::Ref(value)
    }
}

impl From<PdfDict> for PdfObject {
    fn from(value: PdfDict) -> Self {
        Self::Dict(value)
    }
}

impl From<Vec<PdfObject>> for PdfObject {
    fn from(value: Vec<PdfObject>) -> Self {
        Self::Array(value)
    }
}

impl From<PdfStream> for PdfObject {
    fn from(value: PdfStream) -> Self {
        Self::Stream(Box::new(value))
    }
}

/// Builds a [`PdfDict`] from `"Key" => value` pairs; values go through `PdfObject::from`.
#[macro_export]
macro_rules! pdf_dict {
    () => {
        $crate::model::objects::PdfDict::new()
    };
    ($( $key:expr => $value:expr ),+ $(,)?) => {{
        let mut dict = $crate::model::objects::PdfDict::new();
        $(
            dict.insert(::std::string::String::from($key), $crate::model::objects::PdfObject::from($value));
        )+
        dict
    }};
}

/// PDF indirect object reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef {
    /// Object number
    pub objid: u32,
    /// Generation number
    pub genno: u16,
}

impl ObjRef {
    /// Create a new object reference.
    pub const fn new(objid: u32, genno: u16) -> Self {
        Self { objid, genno }
    }
}

impl std::fmt::Display for ObjRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.objid, self.genno)
    }
}

/// PDF Stream - dictionary attributes + binary data.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfStream {
    /// Stream dictionary attributes
    pub attrs: PdfDict,
    /// Raw (possibly encoded) data
    rawdata: Bytes,
}

impl PdfStream {
    /// Create a new stream from already encoded data.
    pub fn new(attrs: PdfDict, rawdata: impl Into<Bytes>) -> Self {
        Self {
            attrs,
            rawdata: rawdata.into(),
        }
    }

    /// Create an unfiltered stream holding `data`.
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self::new(PdfDict::new(), data)
    }

    /// Get raw (undecoded) data.
    pub fn rawdata(&self) -> &[u8] {
        self.rawdata.as_ref()
    }

    /// Get raw data as shared bytes.
    pub fn rawdata_bytes(&self) -> Bytes {
        self.rawdata.clone()
    }

    /// Replace the encoded payload. The caller keeps /Filter in sync.
    pub fn set_rawdata(&mut self, data: impl Into<Bytes>) {
        self.rawdata = data.into();
    }

    /// Replace the payload with unfiltered data, dropping any filter.
    pub fn set_data(&mut self, data: impl Into<Bytes>) {
        self.attrs.shift_remove("Filter");
        self.attrs.shift_remove("DecodeParms");
        self.rawdata = data.into();
    }

    /// Whether the stream carries a /Filter entry.
    pub fn has_filters(&self) -> bool {
        self.attrs.contains_key("Filter")
    }

    /// Check if stream contains a key.
    pub fn contains(&self, name: &str) -> bool {
        self.attrs.contains_key(name)
    }

    /// Get attribute by name.
    pub fn get(&self, name: &str) -> Option<&PdfObject> {
        self.attrs.get(name)
    }

    /// Get decoded data.
    ///
    /// FlateDecode (with PNG predictors) is decoded. Any other filter is a
    /// `DecodeError`; image codecs live outside this crate.
    pub fn decode(&self) -> Result<Vec<u8>> {
        let filters = filter_names(self.attrs.get("Filter"));
        let mut output = self.rawdata.to_vec();
        for (idx, filter) in filters.iter().enumerate() {
            match filter.as_str() {
                "FlateDecode" | "Fl" => {
                    output = inflate(&output)?;
                    if let Some(parms) = decode_parms(self.attrs.get("DecodeParms"), idx) {
                        output = apply_predictor(output, parms)?;
                    }
                }
                other => {
                    return Err(PdfError::DecodeError(format!("unsupported filter {}", other)));
                }
            }
        }
        Ok(output)
    }

    /// Compresses an unfiltered stream with FlateDecode. Filtered streams are left as they are.
    pub fn compress(&mut self, level: u32) -> Result<()> {
        if self.has_filters() {
            return Ok(());
        }
        let compressed = deflate(self.rawdata(), level)?;
        self.rawdata = Bytes::from(compressed);
        self.attrs
            .insert("Filter".to_string(), PdfObject::name("FlateDecode"));
        Ok(())
    }
}

fn filter_names(filter: Option<&PdfObject>) -> Vec<String> {
    match filter {
        Some(PdfObject::Name(name)) => vec![name.clone()],
        Some(PdfObject::Array(arr)) => arr
            .iter()
            .filter_map(|f| f.as_name().ok().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_parms(parms: Option<&PdfObject>, idx: usize) -> Option<&PdfDict> {
    match parms? {
        PdfObject::Dict(d) => Some(d),
        PdfObject::Array(arr) => arr.get(idx).and_then(|p| p.as_dict().ok()),
        _ => None,
    }
}

/// zlib-compresses `data`.
pub fn deflate(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder =
        flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(level.min(9)));
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// zlib-decompresses `data`, keeping whatever decodes before a corrupted tail.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) => Ok(out),
        Err(err) if !out.is_empty() => {
            tracing::warn!(error = %err, decoded = out.len(), "truncated flate stream");
            Ok(out)
        }
        Err(err) => Err(PdfError::DecodeError(format!("flate: {}", err))),
    }
}

fn apply_predictor(data: Vec<u8>, parms: &PdfDict) -> Result<Vec<u8>> {
    let param = |key: &str, default: i64| {
        parms
            .get(key)
            .and_then(|v| v.as_int().ok())
            .unwrap_or(default)
    };
    let predictor = param("Predictor", 1);
    if predictor < 10 {
        return Ok(data);
    }
    let columns = usize::try_from(param("Columns", 1).max(1)).unwrap_or(usize::MAX);
    let colors = usize::try_from(param("Colors", 1).max(1)).unwrap_or(usize::MAX);
    let bits = usize::try_from(param("BitsPerComponent", 8).max(1)).unwrap_or(usize::MAX);
    apply_png_predictor(&data, columns, colors, bits)
}

/// Reverses PNG row prediction (one filter byte per row).
///
/// A row wider than the whole payload is a `DecodeError`.
fn apply_png_predictor(data: &[u8], columns: usize, colors: usize, bits: usize) -> Result<Vec<u8>> {
    let row_bits = colors
        .checked_mul(columns)
        .and_then(|n| n.checked_mul(bits))
        .ok_or_else(|| PdfError::DecodeError("predictor row size overflows".into()))?;
    let row_bytes = row_bits.div_ceil(8);
    if row_bytes >= data.len().max(1) {
        return Err(PdfError::DecodeError(format!(
            "predictor row of {} bytes exceeds {} bytes of data",
            row_bytes,
            data.len()
        )));
    }
    let bpp = std::cmp::max(1, colors.saturating_mul(bits) / 8);
    let row_size = row_bytes + 1;

    let mut result = Vec::with_capacity(data.len());
    let mut prev_row = vec![0u8; row_bytes];

    for row in data.chunks_exact(row_size) {
        let filter_type = row[0];
        let row_data = &row[1..];
        let mut current = vec![0u8; row_bytes];

        for i in 0..row_bytes {
            let left = if i >= bpp { current[i - bpp] } else { 0 };
            let above = prev_row[i];
            let upper_left = if i >= bpp { prev_row[i - bpp] } else { 0 };
            current[i] = match filter_type {
                1 => row_data[i].wrapping_add(left),
                2 => row_data[i].wrapping_add(above),
                3 => row_data[i].wrapping_add(((left as u16 + above as u16) / 2) as u8),
                4 => row_data[i].wrapping_add(paeth_predictor(left, above, upper_left)),
                _ => row_data[i],
            };
        }

        result.extend_from_slice(&current);
        prev_row = current;
    }

    Ok(result)
}

const fn paeth_predictor(left: u8, above: u8, upper_left: u8) -> u8 {
    let a = left as i32;
    let b = above as i32;
    let c = upper_left as i32;
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        above
    } else {
        upper_left
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_then_decode() {
        let mut stream = PdfStream::from_data(b"q 1 0 0 1 0 0 cm Q".to_vec());
        stream.compress(6).unwrap();
        assert_eq!(stream.get("Filter"), Some(&PdfObject::name("FlateDecode")));
        assert_eq!(stream.decode().unwrap(), b"q 1 0 0 1 0 0 cm Q");
    }

    #[test]
    fn test_png_up_predictor() {
        // two rows of 3 bytes, second row predicted "up"
        let data = [0u8, 1, 2, 3, 2, 1, 1, 1];
        assert_eq!(apply_png_predictor(&data, 3, 1, 8).unwrap(), vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_oversized_predictor_row_is_an_error() {
        let mut stream = PdfStream::from_data(vec![0u8, 1, 2, 3]);
        stream.compress(6).unwrap();
        stream.attrs.insert(
            "DecodeParms".into(),
            PdfObject::Dict(pdf_dict! {
                "Predictor" => 12,
                "Columns" => 4_611_686_018_427_387_904i64,
            }),
        );
        assert!(matches!(stream.decode(), Err(PdfError::DecodeError(_))));

        stream.attrs.insert(
            "DecodeParms".into(),
            PdfObject::Dict(pdf_dict! { "Predictor" => 12, "Columns" => 2, "Colors" => i64::MAX }),
        );
        assert!(matches!(stream.decode(), Err(PdfError::DecodeError(_))));
    }

    #[test]
    fn test_unsupported_filter_is_an_error() {
        let stream = PdfStream::new(
            pdf_dict! { "Filter" => PdfObject::name("ASCIIHexDecode") },
            &b"<30206720>"[..],
        );
        assert!(matches!(stream.decode(), Err(PdfError::DecodeError(_))));
    }

    #[test]
    fn test_pdf_dict_macro_preserves_order() {
        let dict = pdf_dict! {
            "Type" => PdfObject::name("Page"),
            "Rotate" => 90,
            "UserUnit" => 1.5,
        };
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, ["Type", "Rotate", "UserUnit"]);
        assert_eq!(dict["Rotate"], PdfObject::Int(90));
    }

    #[test]
    fn test_stream_exposes_dict() {
        let stream = PdfStream::new(pdf_dict! { "Type" => PdfObject::name("XObject") }, Bytes::new());
        let obj = PdfObject::from(stream);
        assert!(obj.is_type("XObject"));
        assert!(obj.as_stream().is_ok());
    }
}
