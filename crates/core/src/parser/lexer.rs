//! PDF tokenizer.
//!
//! Splits PDF file and content-stream bytes into tokens: numbers, literal
//! names, strings, keywords and the `[ ] << >>` delimiters. Object assembly
//! happens in `pdf_parser`.

use crate::error::{PdfError, Result};

/// Keywords with structural meaning; operators and everything else land in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Keyword {
    ArrayStart, // [
    ArrayEnd,   // ]
    DictStart,  // <<
    DictEnd,    // >>
    BraceOpen,  // {
    BraceClose, // }
    Null,
    Obj,
    EndObj,
    R,
    Stream,
    EndStream,
    Xref,
    Trailer,
    StartXref,
    Other(Vec<u8>),
}

impl Keyword {
    pub fn from_bytes(b: &[u8]) -> Self {
        match b {
            b"[" => Self::ArrayStart,
            b"]" => Self::ArrayEnd,
            b"<<" => Self::DictStart,
            b">>" => Self::DictEnd,
            b"{" => Self::BraceOpen,
            b"}" => Self::BraceClose,
            b"null" => Self::Null,
            b"obj" => Self::Obj,
            b"endobj" => Self::EndObj,
            b"R" => Self::R,
            b"stream" => Self::Stream,
            b"endstream" => Self::EndStream,
            b"xref" => Self::Xref,
            b"trailer" => Self::Trailer,
            b"startxref" => Self::StartXref,
            other => Self::Other(other.to_vec()),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::ArrayStart => b"[",
            Self::ArrayEnd => b"]",
            Self::DictStart => b"<<",
            Self::DictEnd => b">>",
            Self::BraceOpen => b"{",
            Self::BraceClose => b"}",
            Self::Null => b"null",
            Self::Obj => b"obj",
            Self::EndObj => b"endobj",
            Self::R => b"R",
            Self::Stream => b"stream",
            Self::EndStream => b"endstream",
            Self::Xref => b"xref",
            Self::Trailer => b"trailer",
            Self::StartXref => b"startxref",
            Self::Other(bytes) => bytes.as_slice(),
        }
    }
}

impl PartialEq<[u8]> for Keyword {
    fn eq(&self, other: &[u8]) -> bool {
        self.as_bytes() == other
    }
}

impl<const N: usize> PartialEq<&[u8; N]> for Keyword {
    fn eq(&self, other: &&[u8; N]) -> bool {
        self.as_bytes() == other.as_slice()
    }
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub enum PSToken {
    /// Integer value
    Int(i64),
    /// Floating point value
    Real(f64),
    /// Boolean value
    Bool(bool),
    /// Literal name (e.g., /Name)
    Literal(String),
    /// Keyword/operator (e.g., obj, BT, re)
    Keyword(Keyword),
    /// String (literal or hex)
    String(Vec<u8>),
}

/// Tokenizer over a byte slice.
pub struct PSBaseParser<'a> {
    data: &'a [u8],
    pos: usize,
    /// Start of the last token returned
    token_pos: usize,
}

impl<'a> PSBaseParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            token_pos: 0,
        }
    }

    /// Current position in stream
    pub fn tell(&self) -> usize {
        self.pos
    }

    /// Set current position in stream.
    pub fn set_pos(&mut self, pos: usize) {
        self.pos = pos.min(self.data.len());
        self.token_pos = self.pos;
    }

    /// Get remaining unparsed data
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn peek(&self) -> Option<u8> {
        self.data.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.data.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// PDF whitespace characters.
    pub fn is_whitespace(b: u8) -> bool {
        matches!(b, b' ' | b'\t' | b'\r' | b'\n' | b'\x00' | b'\x0c')
    }

    /// PDF delimiter characters.
    pub fn is_delimiter(b: u8) -> bool {
        matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
    }

    /// Skip whitespace and comments
    pub fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            if b == b'%' {
                while let Some(c) = self.advance() {
                    if c == b'\r' || c == b'\n' {
                        break;
                    }
                }
                continue;
            }
            if !Self::is_whitespace(b) {
                return;
            }
            self.pos += 1;
        }
    }

    /// Parse a literal name (/Name), decoding `#xx` escapes.
    fn parse_literal(&mut self) -> Result<PSToken> {
        self.advance();
        let mut name = Vec::new();

        while let Some(b) = self.peek() {
            if Self::is_whitespace(b) || Self::is_delimiter(b) {
                break;
            }
            self.pos += 1;
            if b == b'#'
                && let (Some(h1), Some(h2)) = (self.peek().and_then(hex_value), self.peek_at(1).and_then(hex_value))
            {
                self.pos += 2;
                name.push((h1 << 4) | h2);
                continue;
            }
            name.push(b);
        }

        Ok(PSToken::Literal(name_from_bytes(&name)))
    }

    /// Parse a number (integer or real)
    fn parse_number(&mut self) -> Result<PSToken> {
        let start = self.pos;
        let mut has_dot = false;

        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.advance();
        }

        while let Some(b) = self.peek() {
            if b.is_ascii_digit() {
                self.advance();
            } else if b == b'.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        let text = std::str::from_utf8(&self.data[start..self.pos]).map_err(|_| {
            PdfError::TokenError {
                pos: start,
                msg: "invalid number".into(),
            }
        })?;

        if has_dot {
            // "5." and "-.5" are valid PDF reals; Rust's parser needs a digit on both sides
            let normalized = if text.ends_with('.') {
                format!("{}0", text)
            } else {
                text.to_string()
            };
            let val: f64 = normalized.parse().map_err(|_| PdfError::TokenError {
                pos: start,
                msg: format!("invalid real: {}", text),
            })?;
            Ok(PSToken::Real(val))
        } else {
            match text.parse::<i64>() {
                Ok(val) => Ok(PSToken::Int(val)),
                Err(_) => text
                    .parse::<f64>()
                    .map(PSToken::Real)
                    .map_err(|_| PdfError::TokenError {
                        pos: start,
                        msg: format!("invalid int: {}", text),
                    }),
            }
        }
    }

    /// Parse a literal string (...)
    fn parse_string(&mut self) -> Result<PSToken> {
        self.advance();
        let mut result = Vec::new();
        let mut depth = 1;

        while depth > 0 {
            match self.advance() {
                Some(b'(') => {
                    depth += 1;
                    result.push(b'(');
                }
                Some(b')') => {
                    depth -= 1;
                    if depth > 0 {
                        result.push(b')');
                    }
                }
                Some(b'\\') => match self.advance() {
                    Some(b'n') => result.push(b'\n'),
                    Some(b'r') => result.push(b'\r'),
                    Some(b't') => result.push(b'\t'),
                    Some(b'b') => result.push(0x08),
                    Some(b'f') => result.push(0x0c),
                    Some(b'\r') => {
                        if self.peek() == Some(b'\n') {
                            self.advance();
                        }
                    }
                    Some(b'\n') => {}
                    Some(c) if (b'0'..b'8').contains(&c) => {
                        let mut octal = (c - b'0') as u32;
                        for _ in 0..2 {
                            match self.peek() {
                                Some(d) if (b'0'..b'8').contains(&d) => {
                                    self.advance();
                                    octal = octal * 8 + (d - b'0') as u32;
                                }
                                _ => break,
                            }
                        }
                        result.push((octal & 0xFF) as u8);
                    }
                    Some(c) => result.push(c),
                    None => return Err(PdfError::UnexpectedEof),
                },
                Some(c) => result.push(c),
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        Ok(PSToken::String(result))
    }

    /// Parse a hex string <...>
    fn parse_hex_string(&mut self) -> Result<PSToken> {
        self.advance();
        let mut result = Vec::new();
        let mut pending: Option<u8> = None;

        loop {
            match self.advance() {
                Some(b'>') => break,
                Some(c) if Self::is_whitespace(c) => {}
                Some(c) => {
                    let nibble = hex_value(c).ok_or_else(|| PdfError::TokenError {
                        pos: self.pos - 1,
                        msg: format!("invalid hex digit {:?}", c as char),
                    })?;
                    match pending.take() {
                        Some(high) => result.push((high << 4) | nibble),
                        None => pending = Some(nibble),
                    }
                }
                None => return Err(PdfError::UnexpectedEof),
            }
        }

        if let Some(high) = pending {
            result.push(high << 4);
        }

        Ok(PSToken::String(result))
    }

    /// Parse a keyword
    fn parse_keyword(&mut self) -> Result<PSToken> {
        let start = self.pos;

        while let Some(b) = self.peek() {
            if Self::is_whitespace(b) || Self::is_delimiter(b) {
                break;
            }
            self.advance();
        }

        let bytes = &self.data[start..self.pos];
        Ok(match bytes {
            b"true" => PSToken::Bool(true),
            b"false" => PSToken::Bool(false),
            _ => PSToken::Keyword(Keyword::from_bytes(bytes)),
        })
    }

    /// Get next token
    pub fn next_token(&mut self) -> Option<Result<(usize, PSToken)>> {
        self.skip_whitespace();

        if self.at_end() {
            return None;
        }

        self.token_pos = self.pos;
        let b = self.peek()?;

        let result = match b {
            b'/' => self.parse_literal(),
            b'(' => self.parse_string(),
            b'<' if self.peek_at(1) == Some(b'<') => {
                self.pos += 2;
                Ok(PSToken::Keyword(Keyword::DictStart))
            }
            b'<' => self.parse_hex_string(),
            b'>' if self.peek_at(1) == Some(b'>') => {
                self.pos += 2;
                Ok(PSToken::Keyword(Keyword::DictEnd))
            }
            b'>' | b')' => {
                self.advance();
                Err(PdfError::TokenError {
                    pos: self.token_pos,
                    msg: format!("unexpected {:?}", b as char),
                })
            }
            b'[' => {
                self.advance();
                Ok(PSToken::Keyword(Keyword::ArrayStart))
            }
            b']' => {
                self.advance();
                Ok(PSToken::Keyword(Keyword::ArrayEnd))
            }
            b'{' => {
                self.advance();
                Ok(PSToken::Keyword(Keyword::BraceOpen))
            }
            b'}' => {
                self.advance();
                Ok(PSToken::Keyword(Keyword::BraceClose))
            }
            b'+' | b'-' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit() || c == b'.') {
                    self.parse_number()
                } else {
                    self.parse_keyword()
                }
            }
            b'.' => {
                if matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
                    self.parse_number()
                } else {
                    self.parse_keyword()
                }
            }
            c if c.is_ascii_digit() => self.parse_number(),
            _ => self.parse_keyword(),
        };

        Some(result.map(|token| (self.token_pos, token)))
    }

    /// Reads inline image data following an `ID` keyword.
    ///
    /// Skips the single whitespace byte after `ID`, then takes bytes up to an
    /// `EI` that is preceded by whitespace and followed by whitespace or end
    /// of data. The `EI` itself is consumed.
    pub fn read_inline_image_data(&mut self) -> &'a [u8] {
        if matches!(self.peek(), Some(b) if Self::is_whitespace(b)) {
            self.pos += 1;
        }
        let start = self.pos;
        let data = self.data;
        let mut i = start;
        while i + 1 < data.len() {
            if data[i] == b'E'
                && data[i + 1] == b'I'
                && (i == start || Self::is_whitespace(data[i - 1]))
                && data.get(i + 2).is_none_or(|&c| Self::is_whitespace(c))
            {
                let mut end = i;
                if end > start && Self::is_whitespace(data[end - 1]) {
                    end -= 1;
                }
                self.pos = i + 2;
                return &data[start..end];
            }
            i += 1;
        }
        self.pos = data.len();
        &data[start..]
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

/// Names are kept as one char per byte so that arbitrary bytes survive a round trip.
pub(crate) fn name_from_bytes(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Inverse of [`name_from_bytes`]; chars above U+00FF are written as UTF-8.
pub(crate) fn name_to_bytes(name: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for c in name.chars() {
        let code = c as u32;
        if code <= 0xFF {
            out.push(code as u8);
        } else {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(data: &[u8]) -> Vec<PSToken> {
        let mut parser = PSBaseParser::new(data);
        let mut out = Vec::new();
        while let Some(tok) = parser.next_token() {
            out.push(tok.unwrap().1);
        }
        out
    }

    #[test]
    fn test_keyword_from_bytes_known() {
        assert_eq!(Keyword::from_bytes(b"obj"), Keyword::Obj);
        assert_eq!(Keyword::from_bytes(b"R"), Keyword::R);
        assert_eq!(Keyword::from_bytes(b"<<"), Keyword::DictStart);
    }

    #[test]
    fn test_keyword_from_bytes_unknown() {
        assert_eq!(Keyword::from_bytes(b"BDC"), Keyword::Other(b"BDC".to_vec()));
        assert!(Keyword::from_bytes(b"BDC") == b"BDC");
    }

    #[test]
    fn test_literal_name_hex_escape() {
        assert_eq!(
            tokens(b"/A#20B /C#2"),
            vec![
                PSToken::Literal("A B".into()),
                PSToken::Literal("C#2".into())
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokens(b"1 -2 +3.5 .25 -.5 4."),
            vec![
                PSToken::Int(1),
                PSToken::Int(-2),
                PSToken::Real(3.5),
                PSToken::Real(0.25),
                PSToken::Real(-0.5),
                PSToken::Real(4.0),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            tokens(b"(a\\(b\\)c) (nested (x)) <48 65 6C6C6F> <7>"),
            vec![
                PSToken::String(b"a(b)c".to_vec()),
                PSToken::String(b"nested (x)".to_vec()),
                PSToken::String(b"Hello".to_vec()),
                PSToken::String(vec![0x70]),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            tokens(b"% header\nq % save\nQ"),
            vec![
                PSToken::Keyword(Keyword::from_bytes(b"q")),
                PSToken::Keyword(Keyword::from_bytes(b"Q")),
            ]
        );
    }

    #[test]
    fn test_inline_image_data() {
        let data = b"ID \x01\x02EI\x03 EI Q";
        let mut parser = PSBaseParser::new(data);
        parser.next_token();
        let image = parser.read_inline_image_data();
        assert_eq!(image, b"\x01\x02EI\x03");
        let (_, next) = parser.next_token().unwrap().unwrap();
        assert_eq!(next, PSToken::Keyword(Keyword::from_bytes(b"Q")));
    }

    #[test]
    fn test_name_bytes_round_trip() {
        let raw = [b'A', 0xE9, b'B'];
        assert_eq!(name_to_bytes(&name_from_bytes(&raw)), raw.to_vec());
    }
}
