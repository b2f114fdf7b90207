//! Color rewrites: fill, replace, swap, majority and count fills.
//!
//! Colors arrive as raw argument bytes; anything above 9 makes the primitive
//! inapplicable rather than failing.

use crate::grid::{Grid, MAX_COLOR};

pub(crate) fn fill(g: &Grid, args: &[u8]) -> Option<Grid> {
    let color = *args.first()?;
    Grid::filled(g.rows(), g.cols(), color)
}

/// `from → to`. Inapplicable when `from` is absent or equals `to`.
pub(crate) fn replace(g: &Grid, args: &[u8]) -> Option<Grid> {
    let (&from, &to) = (args.first()?, args.get(1)?);
    if from == to || from > MAX_COLOR || !g.contains_color(from) {
        return None;
    }
    g.map_cells(|v| if v == from { to } else { v })
}

/// Exchange two colors. Inapplicable when they are equal or neither occurs.
pub(crate) fn swap(g: &Grid, args: &[u8]) -> Option<Grid> {
    let (&a, &b) = (args.first()?, args.get(1)?);
    if a == b || a > MAX_COLOR || b > MAX_COLOR {
        return None;
    }
    if !g.contains_color(a) && !g.contains_color(b) {
        return None;
    }
    g.map_cells(|v| {
        if v == a {
            b
        } else if v == b {
            a
        } else {
            v
        }
    })
}

/// Most frequent non-zero color; ties go to the lower color.
pub(crate) fn majority_color(g: &Grid) -> Option<u8> {
    let hist = g.histogram();
    let mut best: Option<(usize, u8)> = None;
    for color in 1..=MAX_COLOR {
        let n = hist[color as usize];
        if n > 0 && best.is_none_or(|(m, _)| n > m) {
            best = Some((n, color));
        }
    }
    best.map(|(_, c)| c)
}

/// Every non-zero cell takes the majority color.
pub(crate) fn majority_fill(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let color = majority_color(g)?;
    g.map_cells(|v| if v == 0 { 0 } else { color })
}

/// Lay the non-zero count out row-major in the majority color.
pub(crate) fn count_fill(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let color = majority_color(g)?;
    let n = g.nonzero_count();
    let cols = g.cols();
    Grid::from_fn(g.rows(), cols, |r, c| if r * cols + c < n { color } else { 0 })
}
