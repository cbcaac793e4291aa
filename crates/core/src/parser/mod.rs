//! PDF parsing modules.
//!
//! - `lexer`: tokenizer for file bodies and content streams
//! - `pdf_parser`: object parser and content-stream operation parser

pub mod lexer;
pub mod pdf_parser;

// Re-export main types for convenience
pub use lexer::{Keyword, PSBaseParser, PSToken};
pub use pdf_parser::{ContentParser, Operation, PdfParser};
