//! vellum - PDF object model, cross-reference reader/writer and content-stream canvas.
//!
//! A [`PdfDocument`] owns the indirect objects of one file. It is created
//! empty, opened read-only, or opened for stamping (full rewrite or
//! incremental append), and written back with classic xref tables or
//! compressed xref and object streams. Pages are drawn with a
//! [`PdfCanvas`]; [`ContentProcessor`] reads the images back out of page
//! content.

pub mod canvas;
pub mod document;
pub mod error;
pub mod model;
pub mod parser;
pub mod path;
pub mod utils;

pub use canvas::{ContentProcessor, ImageRenderInfo, PdfCanvas, PdfFont};
pub use document::{PdfDocument, PdfPage, StampingProperties, WriterProperties};
pub use error::{PdfError, Result};
pub use model::{ObjRef, PdfDict, PdfObject, PdfStream};
