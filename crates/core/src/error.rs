//! Error types for vellum.

use thiserror::Error;

/// Errors raised while reading, building or writing a PDF document.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("syntax error: {0}")]
    SyntaxError(String),

    #[error("decode error: {0}")]
    DecodeError(String),

    #[error("unexpected end of data")]
    UnexpectedEof,

    #[error("token error at {pos}: {msg}")]
    TokenError { pos: usize, msg: String },

    #[error("type error: expected {expected}, got {got}")]
    TypeError {
        expected: &'static str,
        got: &'static str,
    },

    #[error("no valid cross-reference table found")]
    NoValidXRef,

    #[error("document has no catalog")]
    NoCatalog,

    #[error("document corrupted: {0}")]
    DocumentCorrupted(String),

    #[error("object number {0} exceeds the maximum allowed object number")]
    ObjectNumberOverflow(u64),

    #[error("object {0} not found")]
    ObjectNotFound(u32),

    #[error("object {0} has already been flushed")]
    ObjectFlushed(u32),

    #[error("document is not open for writing")]
    NotWritable,

    #[error("page index {0} is out of range")]
    PageIndexOutOfRange(usize),

    #[error("end of marked content without a matching begin")]
    UnbalancedMarkedContent,

    #[error("restore state without a matching save state")]
    UnbalancedSaveRestore,

    #[error("font and size must be set before writing any text")]
    FontNotSet,

    #[error("close path operator has no preceding shape")]
    InvalidClosePath,

    #[error("invalid path operator in path data: {0}")]
    InvalidPathOperator(String),

    #[error("key {0} already exists in the tree")]
    DuplicateKey(String),

    #[error("destination not found: {0}")]
    DestinationNotFound(String),

    #[error("document has no page labels")]
    NoPageLabels,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PdfError {
    /// Whether this error reports a damaged file rather than API misuse.
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::SyntaxError(_)
                | Self::DecodeError(_)
                | Self::UnexpectedEof
                | Self::TokenError { .. }
                | Self::NoValidXRef
                | Self::NoCatalog
                | Self::DocumentCorrupted(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PdfError>;
