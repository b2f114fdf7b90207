//! Rotations, flips and transposes. All are total on any valid grid.

use crate::grid::Grid;

/// Clockwise quarter turn.
pub(crate) fn rotate_90(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, _) = g.dims();
    Grid::from_fn(g.cols(), rows, |r, c| g.get(rows - 1 - c, r))
}

pub(crate) fn rotate_180(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(rows, cols, |r, c| g.get(rows - 1 - r, cols - 1 - c))
}

/// Counter-clockwise quarter turn.
pub(crate) fn rotate_270(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(cols, rows, |r, c| g.get(c, cols - 1 - r))
}

/// Mirror left-right.
pub(crate) fn flip_h(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(rows, cols, |r, c| g.get(r, cols - 1 - c))
}

/// Mirror top-bottom.
pub(crate) fn flip_v(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(rows, cols, |r, c| g.get(rows - 1 - r, c))
}

/// Reflection across the anti-diagonal.
pub(crate) fn flip_diag(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(cols, rows, |r, c| g.get(rows - 1 - c, cols - 1 - r))
}

pub(crate) fn transpose(g: &Grid, _args: &[u8]) -> Option<Grid> {
    Grid::from_fn(g.cols(), g.rows(), |r, c| g.get(c, r))
}

pub(crate) fn identity(g: &Grid, _args: &[u8]) -> Option<Grid> {
    Some(g.clone())
}
