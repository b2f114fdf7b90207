//! `apply_step()`: apply one primitive to a grid.
//!
//! The single exported entry point for primitive application. Requires a
//! `PrimitiveRegistryV1`; there is no bypass path.
//!
//! Two-phase check:
//! 1. Registry lookup (contract): is the name declared, with this arity?
//! 2. Dispatch lookup (implementation): is there a handler installed?
//!
//! Contract failures are hard errors. A handler returning `None` means the
//! primitive does not apply to this grid, which is an ordinary outcome.

use super::registry::PrimitiveRegistryV1;
use super::{color, frame, geometry, gravity, objects, pattern, resize};
use crate::grid::Grid;

/// Typed failure for primitive application. Only contract violations land
/// here; inapplicability is `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KernelError {
    /// The name is not declared in the registry.
    #[error("unknown primitive: {name}")]
    UnknownPrimitive { name: String },
    /// Argument count differs from the declared arity.
    #[error("{name} expects {expected} args, got {found}")]
    ArgumentMismatch {
        name: String,
        expected: usize,
        found: usize,
    },
    /// Declared in the registry but no handler is installed.
    #[error("primitive {name} is declared but not implemented")]
    NotImplemented { name: String },
}

/// Handler signature. Arguments have already been arity-checked.
pub type PrimitiveFn = fn(&Grid, &[u8]) -> Option<Grid>;

/// Implementation side of the catalogue. Every name here has a registry
/// entry; a registry may declare names not installed here (caught as
/// `NotImplemented`).
fn dispatch(name: &str) -> Option<PrimitiveFn> {
    let handler: PrimitiveFn = match name {
        "identity" => geometry::identity,
        "rotate_90" => geometry::rotate_90,
        "rotate_180" => geometry::rotate_180,
        "rotate_270" => geometry::rotate_270,
        "flip_h" => geometry::flip_h,
        "flip_v" => geometry::flip_v,
        "flip_diag" => geometry::flip_diag,
        "transpose" => geometry::transpose,
        "fill" => color::fill,
        "replace" => color::replace,
        "swap" => color::swap,
        "majority_fill" => color::majority_fill,
        "count_fill" => color::count_fill,
        "upscale" => resize::upscale,
        "downscale" => resize::downscale,
        "tile" => resize::tile,
        "mirror_h" => resize::mirror_h,
        "mirror_v" => resize::mirror_v,
        "gravity_down" => gravity::gravity_down,
        "gravity_up" => gravity::gravity_up,
        "gravity_left" => gravity::gravity_left,
        "gravity_right" => gravity::gravity_right,
        "border_extract" => frame::border_extract,
        "border_fill" => frame::border_fill,
        "border_remove" => frame::border_remove,
        "crop" => frame::crop,
        "pad" => frame::pad,
        "continue_rows" => pattern::continue_rows,
        "continue_cols" => pattern::continue_cols,
        "align_center" => objects::align_center,
        "align_corner" => objects::align_corner,
        "largest_component" => objects::largest_component,
        _ => return None,
    };
    Some(handler)
}

/// Apply the primitive `name` with `args` to `grid`.
///
/// # Errors
///
/// Returns [`KernelError`] on:
/// - `UnknownPrimitive`: name not in registry
/// - `ArgumentMismatch`: argument count differs from the declared arity
/// - `NotImplemented`: in registry but no dispatch handler
pub fn apply_step(
    grid: &Grid,
    name: &str,
    args: &[u8],
    registry: &PrimitiveRegistryV1,
) -> Result<Option<Grid>, KernelError> {
    let entry = registry.get(name).ok_or_else(|| KernelError::UnknownPrimitive {
        name: name.to_string(),
    })?;
    let expected = entry.params.arity();
    if args.len() != expected {
        return Err(KernelError::ArgumentMismatch {
            name: name.to_string(),
            expected,
            found: args.len(),
        });
    }
    let handler = dispatch(name).ok_or_else(|| KernelError::NotImplemented {
        name: name.to_string(),
    })?;
    Ok(handler(grid, args))
}
