//! PDF model types - objects, state, and color definitions.
//!
//! This module contains the core PDF data model types:
//! - `objects` - PDF object types (PdfObject, PdfStream, ObjRef)
//! - `state` - Canvas graphics state (CanvasGraphicsState, Color)
//! - `color` - Color space definitions (PdfColorSpace)

pub mod color;
pub mod objects;
pub mod state;

// Re-export main types for convenience
pub use color::{ColorSpaceKind, PdfColorSpace};
pub use objects::{ObjRef, PdfDict, PdfObject, PdfStream};
pub use state::{CanvasGraphicsState, Color};
