//! Border handling, crop-to-content and symmetric padding.

use super::MAX_RESULT_SIDE;
use crate::grid::Grid;

fn on_ring(rows: usize, cols: usize, r: usize, c: usize) -> bool {
    r == 0 || c == 0 || r + 1 == rows || c + 1 == cols
}

/// Keep the outer ring, zero the interior.
pub(crate) fn border_extract(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    Grid::from_fn(rows, cols, |r, c| if on_ring(rows, cols, r, c) { g.get(r, c) } else { 0 })
}

/// Paint the outer ring with one color.
pub(crate) fn border_fill(g: &Grid, args: &[u8]) -> Option<Grid> {
    let color = *args.first()?;
    let (rows, cols) = g.dims();
    Grid::from_fn(rows, cols, |r, c| if on_ring(rows, cols, r, c) { color } else { g.get(r, c) })
}

/// Strip the outer ring. Needs at least 3×3.
pub(crate) fn border_remove(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    if rows < 3 || cols < 3 {
        return None;
    }
    Grid::from_fn(rows - 2, cols - 2, |r, c| g.get(r + 1, c + 1))
}

/// Inclusive bounding box `(top, left, bottom, right)` of non-zero cells.
pub(crate) fn content_bounds(g: &Grid) -> Option<(usize, usize, usize, usize)> {
    let mut bounds: Option<(usize, usize, usize, usize)> = None;
    for r in 0..g.rows() {
        for c in 0..g.cols() {
            if g.get(r, c) == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (r, c, r, c),
                Some((t, l, b, rt)) => (t.min(r), l.min(c), b.max(r), rt.max(c)),
            });
        }
    }
    bounds
}

/// Crop to the bounding box of non-zero cells.
pub(crate) fn crop(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (top, left, bottom, right) = content_bounds(g)?;
    Grid::from_fn(bottom - top + 1, right - left + 1, |r, c| g.get(top + r, left + c))
}

/// Surround with a zero ring of width k, k in 1..=3.
pub(crate) fn pad(g: &Grid, args: &[u8]) -> Option<Grid> {
    let k = usize::from(*args.first()?);
    if !(1..=3).contains(&k) {
        return None;
    }
    let (rows, cols) = (g.rows() + 2 * k, g.cols() + 2 * k);
    if rows > MAX_RESULT_SIDE || cols > MAX_RESULT_SIDE {
        return None;
    }
    Grid::from_fn(rows, cols, |r, c| {
        let inside = (k..k + g.rows()).contains(&r) && (k..k + g.cols()).contains(&c);
        if inside {
            g.get(r - k, c - k)
        } else {
            0
        }
    })
}
