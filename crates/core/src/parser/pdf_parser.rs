//! PDF parser - converts tokens to PDF objects.
//!
//! `PdfParser` assembles objects (with `n g R` reference lookahead) from file
//! bytes; `ContentParser` turns a content stream into operations.

use super::lexer::{Keyword, PSBaseParser, PSToken};
use crate::error::{PdfError, Result};
use crate::model::objects::{ObjRef, PdfDict, PdfObject};

/// Deepest array/dictionary nesting accepted before the input is declared corrupt.
const MAX_NESTING: usize = 512;

/// PDF Parser - parses PDF object syntax
///
/// Uses PSBaseParser for tokenization and builds PDF objects,
/// handling indirect references (num num R) appropriately.
pub struct PdfParser<'a> {
    base: PSBaseParser<'a>,
    /// Lookahead buffer for tokens, with their positions
    lookahead: Vec<(usize, PSToken)>,
    depth: usize,
}

impl<'a> PdfParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            base: PSBaseParser::new(data),
            lookahead: Vec::new(),
            depth: 0,
        }
    }

    /// Position after the last consumed token.
    pub fn tell(&self) -> usize {
        match self.lookahead.last() {
            Some((pos, _)) => *pos,
            None => self.base.tell(),
        }
    }

    /// Get remaining unparsed data.
    pub fn remaining(&self) -> &'a [u8] {
        self.base.remaining()
    }

    fn next_token(&mut self) -> Result<Option<(usize, PSToken)>> {
        if let Some(tok) = self.lookahead.pop() {
            return Ok(Some(tok));
        }
        self.base.next_token().transpose()
    }

    fn push_back(&mut self, tok: (usize, PSToken)) {
        self.lookahead.push(tok);
    }

    /// Parse next PDF object
    pub fn parse_object(&mut self) -> Result<PdfObject> {
        let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
        self.token_to_object(pos, token)
    }

    /// Next raw token, used by callers that expect a keyword such as `obj` or `stream`.
    pub fn next_keyword(&mut self) -> Result<Option<Keyword>> {
        match self.next_token()? {
            Some((_, PSToken::Keyword(kw))) => Ok(Some(kw)),
            Some(other) => {
                self.push_back(other);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn token_to_object(&mut self, pos: usize, token: PSToken) -> Result<PdfObject> {
        match token {
            PSToken::Int(n) => {
                // Could be start of indirect reference: objid genno R
                if let Some(second) = self.next_token()? {
                    if let (_, PSToken::Int(m)) = second {
                        if let Some(third) = self.next_token()? {
                            if matches!(third.1, PSToken::Keyword(Keyword::R)) {
                                return reference(pos, n, m);
                            }
                            self.push_back(third);
                        }
                    }
                    self.push_back(second);
                }
                Ok(PdfObject::Int(n))
            }
            PSToken::Real(n) => Ok(PdfObject::Real(n)),
            PSToken::Bool(b) => Ok(PdfObject::Bool(b)),
            PSToken::Literal(s) => Ok(PdfObject::Name(s)),
            PSToken::String(s) => Ok(PdfObject::String(s)),
            PSToken::Keyword(Keyword::Null) => Ok(PdfObject::Null),
            PSToken::Keyword(Keyword::ArrayStart) => self.nested(Self::parse_array),
            PSToken::Keyword(Keyword::DictStart) => self.nested(Self::parse_dict),
            PSToken::Keyword(kw) => Err(PdfError::TokenError {
                pos,
                msg: format!(
                    "unexpected keyword: {}",
                    String::from_utf8_lossy(kw.as_bytes())
                ),
            }),
        }
    }

    fn nested(&mut self, f: fn(&mut Self) -> Result<PdfObject>) -> Result<PdfObject> {
        if self.depth >= MAX_NESTING {
            return Err(PdfError::SyntaxError("object nesting too deep".into()));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Parse array contents until ]
    fn parse_array(&mut self) -> Result<PdfObject> {
        let mut arr = Vec::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;
            if matches!(token, PSToken::Keyword(Keyword::ArrayEnd)) {
                break;
            }
            arr.push(self.token_to_object(pos, token)?);
        }

        Ok(PdfObject::Array(arr))
    }

    /// Parse dict contents until >>
    fn parse_dict(&mut self) -> Result<PdfObject> {
        let mut dict = PdfDict::new();

        loop {
            let (pos, token) = self.next_token()?.ok_or(PdfError::UnexpectedEof)?;

            let key = match token {
                PSToken::Keyword(Keyword::DictEnd) => break,
                PSToken::Literal(name) => name,
                _ => {
                    return Err(PdfError::TokenError {
                        pos,
                        msg: "expected name as dict key".into(),
                    });
                }
            };

            let value = self.parse_object()?;
            // a null value is equivalent to an absent entry
            if !value.is_null() {
                dict.insert(key, value);
            }
        }

        Ok(PdfObject::Dict(dict))
    }
}

fn reference(pos: usize, objid: i64, genno: i64) -> Result<PdfObject> {
    if !(0..=u32::MAX as i64).contains(&objid) || !(0..=u16::MAX as i64).contains(&genno) {
        return Err(PdfError::TokenError {
            pos,
            msg: format!("invalid reference {} {} R", objid, genno),
        });
    }
    Ok(PdfObject::Ref(ObjRef::new(objid as u32, genno as u16)))
}

/// Content stream operation
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    /// The operator (e.g., "BT", "Tf", "Tj")
    pub operator: Vec<u8>,
    /// Operands for this operation
    pub operands: Vec<PdfObject>,
}

impl Operation {
    /// Operator as text, for matching.
    pub fn op(&self) -> &str {
        std::str::from_utf8(&self.operator).unwrap_or("")
    }

    /// Numeric operands; non-numbers are skipped.
    pub fn numbers(&self) -> Vec<f64> {
        self.operands
            .iter()
            .filter_map(|o| o.as_num().ok())
            .collect()
    }
}

/// PDF Content Stream Parser
///
/// Parses PDF content streams into a sequence of operations.
/// Inline images come out as a single `BI` operation whose operands are the
/// image dictionary and the raw image bytes.
pub struct ContentParser;

impl ContentParser {
    /// Parse a content stream into operations
    pub fn parse(data: &[u8]) -> Result<Vec<Operation>> {
        let mut parser = PSBaseParser::new(data);
        let mut ops = Vec::new();
        let mut operands: Vec<PdfObject> = Vec::new();
        let mut context_stack: Vec<Vec<PdfObject>> = Vec::new();

        while let Some(result) = parser.next_token() {
            let (_, token) = result?;

            match token {
                PSToken::Keyword(Keyword::ArrayStart | Keyword::DictStart) => {
                    context_stack.push(std::mem::take(&mut operands));
                }
                PSToken::Keyword(Keyword::ArrayEnd) => {
                    let array_contents = std::mem::take(&mut operands);
                    operands = context_stack.pop().unwrap_or_default();
                    operands.push(PdfObject::Array(array_contents));
                }
                PSToken::Keyword(Keyword::DictEnd) => {
                    let dict_contents = std::mem::take(&mut operands);
                    operands = context_stack.pop().unwrap_or_default();
                    operands.push(PdfObject::Dict(pairs_to_dict(dict_contents)));
                }
                PSToken::Keyword(Keyword::Null) => operands.push(PdfObject::Null),
                PSToken::Keyword(kw) if kw == b"BI" => {
                    let mut params = Vec::new();
                    while let Some(tok) = parser.next_token() {
                        match tok?.1 {
                            PSToken::Keyword(k) if k == b"ID" => break,
                            other => {
                                if let Some(obj) = token_to_operand(other) {
                                    params.push(obj);
                                }
                            }
                        }
                    }
                    let image = parser.read_inline_image_data();
                    ops.push(Operation {
                        operator: b"BI".to_vec(),
                        operands: vec![
                            PdfObject::Dict(pairs_to_dict(params)),
                            PdfObject::String(image.to_vec()),
                        ],
                    });
                    operands.clear();
                }
                PSToken::Keyword(kw) => {
                    if context_stack.is_empty() {
                        ops.push(Operation {
                            operator: kw.as_bytes().to_vec(),
                            operands: std::mem::take(&mut operands),
                        });
                    }
                }
                other => {
                    if let Some(obj) = token_to_operand(other) {
                        operands.push(obj);
                    }
                }
            }
        }

        Ok(ops)
    }
}

fn token_to_operand(token: PSToken) -> Option<PdfObject> {
    match token {
        PSToken::Int(n) => Some(PdfObject::Int(n)),
        PSToken::Real(n) => Some(PdfObject::Real(n)),
        PSToken::Bool(b) => Some(PdfObject::Bool(b)),
        PSToken::Literal(s) => Some(PdfObject::Name(s)),
        PSToken::String(s) => Some(PdfObject::String(s)),
        PSToken::Keyword(Keyword::Null) => Some(PdfObject::Null),
        PSToken::Keyword(_) => None,
    }
}

fn pairs_to_dict(items: Vec<PdfObject>) -> PdfDict {
    let mut dict = PdfDict::new();
    let mut iter = items.into_iter();
    while let Some(key) = iter.next() {
        if let PdfObject::Name(name) = key
            && let Some(value) = iter.next()
        {
            dict.insert(name, value);
        }
    }
    dict
}
