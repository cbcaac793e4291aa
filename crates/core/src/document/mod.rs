//! PDF document module - object registry, reading, writing and the catalog.
//!
//! This module contains:
//! - `xref` / `registry` - cross-reference table and the indirect objects it numbers
//! - `reader` / `writer` - loading an existing file, writing full or incremental output
//! - `serialize` - byte serialization of objects
//! - `catalog` / `page` - catalog view and page tree
//! - `name_tree`, `outline`, `destination`, `layers` - catalog structures
//! - `copy` - copying pages between documents
//! - `pdf_document` - `PdfDocument`, owner of all of the above

pub mod catalog;
pub mod copy;
pub mod destination;
pub mod layers;
pub mod name_tree;
pub mod outline;
pub mod page;
pub mod pdf_document;
pub(crate) mod reader;
pub mod registry;
pub mod serialize;
pub mod writer;
pub mod xref;

// Re-export main types for convenience
pub use catalog::{PageLabelStyle, PdfCatalog};
pub use copy::{compare_dictionaries, compare_objects};
pub use destination::PdfDestination;
pub use layers::{PdfLayer, PdfOcProperties};
pub use name_tree::{PdfNameTree, PdfNumberTree, TreeView};
pub use outline::{OutlineId, PdfOutline, PdfOutlineTree};
pub use page::PdfPage;
pub use pdf_document::PdfDocument;
pub use registry::ObjectRegistry;
pub use writer::{StampingProperties, WriterProperties};
pub use xref::{CrossReferenceTable, XrefEntry};
