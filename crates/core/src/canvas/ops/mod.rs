//! Content stream operator writers.
//!
//! Operators are grouped by category:
//! - `graphics_state` - State stack and transforms (q, Q, cm, w, J, j, M, d, ri, i, gs)
//! - `color` - Color space and values (G, g, RG, rg, K, k, CS, cs, SCN, scn)
//! - `path` - Path construction and painting (m, l, c, v, y, h, re, S, s, f, f\*, B, B\*, b, b\*, n, W, W\*)
//! - `text` - Text objects, state and showing (BT, ET, Tc, Tw, Tz, TL, Tf, Tr, Ts, Td, Tm, T\*, Tj, TJ)
//! - `marked_content` - Marked content and layers (BMC, BDC, EMC)
//! - `xobject` - Images and forms (Do)

mod color;
mod graphics_state;
mod marked_content;
mod path;
pub(crate) mod text;
mod xobject;
