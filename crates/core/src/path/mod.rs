//! Path data.
//!
//! - `parser` - SVG-style path data into absolute shapes
//! - `shapes` - the shapes and how they draw onto a canvas
//! - `arc` - Bézier approximation of elliptical arcs, shared with the canvas

pub mod arc;
pub mod parser;
pub mod shapes;

pub use parser::parse_path;
pub use shapes::{PathShape, draw_path};
