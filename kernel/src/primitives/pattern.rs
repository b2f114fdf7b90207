//! Row / column pattern continuation. A grid already [`MAX_RESULT_SIDE`]
//! long in the growing direction cannot be continued.

use super::MAX_RESULT_SIDE;
use crate::grid::Grid;

/// Smallest `p < lines.len()` such that every line equals the one `p` before it.
fn period<T: PartialEq>(lines: &[T]) -> Option<usize> {
    (1..lines.len()).find(|&p| (p..lines.len()).all(|i| lines[i] == lines[i - p]))
}

/// Append the next row of a periodic row sequence.
pub(crate) fn continue_rows(g: &Grid, _args: &[u8]) -> Option<Grid> {
    if g.rows() >= MAX_RESULT_SIDE {
        return None;
    }
    let rows: Vec<&[u8]> = (0..g.rows()).map(|r| g.row(r)).collect();
    let p = period(&rows)?;
    let next = g.rows() - p;
    Grid::from_fn(g.rows() + 1, g.cols(), |r, c| {
        if r < g.rows() {
            g.get(r, c)
        } else {
            g.get(next, c)
        }
    })
}

/// Append the next column of a periodic column sequence.
pub(crate) fn continue_cols(g: &Grid, _args: &[u8]) -> Option<Grid> {
    if g.cols() >= MAX_RESULT_SIDE {
        return None;
    }
    let cols: Vec<Vec<u8>> = (0..g.cols()).map(|c| g.column(c)).collect();
    let p = period(&cols)?;
    let next = g.cols() - p;
    Grid::from_fn(g.rows(), g.cols() + 1, |r, c| {
        if c < g.cols() {
            g.get(r, c)
        } else {
            g.get(r, next)
        }
    })
}
