//! Four-directional gravity: non-zero cells slide to one edge, keeping their
//! relative order, and vacated cells become zero.

use crate::grid::Grid;

/// Compact `line` toward its end (`toward_end`) or its start.
fn compact(line: &[u8], toward_end: bool) -> Vec<u8> {
    let solid: Vec<u8> = line.iter().copied().filter(|&v| v != 0).collect();
    let gap = vec![0; line.len() - solid.len()];
    if toward_end {
        [gap, solid].concat()
    } else {
        [solid, gap].concat()
    }
}

fn by_columns(g: &Grid, toward_end: bool) -> Option<Grid> {
    let columns: Vec<Vec<u8>> = (0..g.cols()).map(|c| compact(&g.column(c), toward_end)).collect();
    Grid::from_fn(g.rows(), g.cols(), |r, c| columns[c][r])
}

fn by_rows(g: &Grid, toward_end: bool) -> Option<Grid> {
    let rows: Vec<Vec<u8>> = (0..g.rows()).map(|r| compact(g.row(r), toward_end)).collect();
    Grid::from_fn(g.rows(), g.cols(), |r, c| rows[r][c])
}

pub(crate) fn gravity_down(g: &Grid, _args: &[u8]) -> Option<Grid> {
    by_columns(g, true)
}

pub(crate) fn gravity_up(g: &Grid, _args: &[u8]) -> Option<Grid> {
    by_columns(g, false)
}

pub(crate) fn gravity_left(g: &Grid, _args: &[u8]) -> Option<Grid> {
    by_rows(g, false)
}

pub(crate) fn gravity_right(g: &Grid, _args: &[u8]) -> Option<Grid> {
    by_rows(g, true)
}
