//! Primitives module: the registry contract, the dispatch table, and the
//! primitive families themselves.
//!
//! Every primitive is a pure `fn(&Grid, &[u8]) -> Option<Grid>`. `None`
//! means "not applicable to this grid" and is never an error.
//!
//! Depends on `grid` and `digest`. Does not import from `pipeline`.

pub mod apply;
pub mod objects;
pub mod registry;

mod color;
mod frame;
mod geometry;
mod gravity;
mod pattern;
mod resize;

/// Largest side length a primitive may produce.
pub const MAX_RESULT_SIDE: usize = 30;
