//! Scaling, tiling and mirroring. Results larger than [`MAX_RESULT_SIDE`]
//! on either axis are inapplicable.

use super::geometry::{flip_h, flip_v};
use super::MAX_RESULT_SIDE;
use crate::grid::Grid;

fn factor(args: &[u8], min: u8, max: u8) -> Option<usize> {
    let k = *args.first()?;
    (min..=max).contains(&k).then_some(usize::from(k))
}

fn bounded(rows: usize, cols: usize) -> bool {
    rows <= MAX_RESULT_SIDE && cols <= MAX_RESULT_SIDE
}

/// Each cell becomes a k×k block, k in 2..=5.
pub(crate) fn upscale(g: &Grid, args: &[u8]) -> Option<Grid> {
    let k = factor(args, 2, 5)?;
    let (rows, cols) = (g.rows() * k, g.cols() * k);
    if !bounded(rows, cols) {
        return None;
    }
    Grid::from_fn(rows, cols, |r, c| g.get(r / k, c / k))
}

/// Inverse of [`upscale`]; every k×k block must be uniform.
pub(crate) fn downscale(g: &Grid, args: &[u8]) -> Option<Grid> {
    let k = factor(args, 2, 5)?;
    let (rows, cols) = g.dims();
    if rows % k != 0 || cols % k != 0 {
        return None;
    }
    for r in 0..rows {
        for c in 0..cols {
            if g.get(r, c) != g.get(r - r % k, c - c % k) {
                return None;
            }
        }
    }
    Grid::from_fn(rows / k, cols / k, |r, c| g.get(r * k, c * k))
}

/// Repeat the grid k×k times, k in 2..=4.
pub(crate) fn tile(g: &Grid, args: &[u8]) -> Option<Grid> {
    let k = factor(args, 2, 4)?;
    let (rows, cols) = g.dims();
    if !bounded(rows * k, cols * k) {
        return None;
    }
    Grid::from_fn(rows * k, cols * k, |r, c| g.get(r % rows, c % cols))
}

/// The grid followed by its left-right mirror.
pub(crate) fn mirror_h(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    if !bounded(rows, cols * 2) {
        return None;
    }
    let flipped = flip_h(g, &[])?;
    Grid::from_fn(rows, cols * 2, |r, c| {
        if c < cols {
            g.get(r, c)
        } else {
            flipped.get(r, c - cols)
        }
    })
}

/// The grid above its top-bottom mirror.
pub(crate) fn mirror_v(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    if !bounded(rows * 2, cols) {
        return None;
    }
    let flipped = flip_v(g, &[])?;
    Grid::from_fn(rows * 2, cols, |r, c| {
        if r < rows {
            g.get(r, c)
        } else {
            flipped.get(r - rows, c)
        }
    })
}
