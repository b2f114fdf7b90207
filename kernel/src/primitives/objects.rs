//! Connected components (4-connected, same color, non-zero) and the
//! primitives built on them.

use super::frame::content_bounds;
use crate::grid::Grid;

/// One connected region of a single non-zero color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub color: u8,
    /// Member cells in discovery order.
    pub cells: Vec<(usize, usize)>,
}

impl Component {
    /// Inclusive `(top, left, bottom, right)`.
    #[must_use]
    pub fn bounds(&self) -> (usize, usize, usize, usize) {
        self.cells.iter().fold(
            (usize::MAX, usize::MAX, 0, 0),
            |(t, l, b, r), &(y, x)| (t.min(y), l.min(x), b.max(y), r.max(x)),
        )
    }
}

/// All components in row-major scan order of their first cell.
#[must_use]
pub fn components(g: &Grid) -> Vec<Component> {
    let (rows, cols) = g.dims();
    let mut seen = vec![false; rows * cols];
    let mut out = Vec::new();
    for r in 0..rows {
        for c in 0..cols {
            let color = g.get(r, c);
            if color == 0 || seen[r * cols + c] {
                continue;
            }
            let mut cells = Vec::new();
            let mut stack = vec![(r, c)];
            seen[r * cols + c] = true;
            while let Some((y, x)) = stack.pop() {
                cells.push((y, x));
                let neighbours = [
                    (y.wrapping_sub(1), x),
                    (y + 1, x),
                    (y, x.wrapping_sub(1)),
                    (y, x + 1),
                ];
                for (ny, nx) in neighbours {
                    if ny < rows && nx < cols && !seen[ny * cols + nx] && g.get(ny, nx) == color {
                        seen[ny * cols + nx] = true;
                        stack.push((ny, nx));
                    }
                }
            }
            out.push(Component { color, cells });
        }
    }
    out
}

/// Largest component cropped to its bounding box; ties go to the first found.
pub(crate) fn largest_component(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let mut best: Option<Component> = None;
    for comp in components(g) {
        if best.as_ref().is_none_or(|b| comp.cells.len() > b.cells.len()) {
            best = Some(comp);
        }
    }
    let comp = best?;
    let (top, left, bottom, right) = comp.bounds();
    let mut cells = vec![0u8; (bottom - top + 1) * (right - left + 1)];
    let width = right - left + 1;
    for &(y, x) in &comp.cells {
        cells[(y - top) * width + (x - left)] = comp.color;
    }
    Grid::new(bottom - top + 1, width, cells).ok()
}

/// Move all content so its bounding box starts at `(top, left)`.
fn shift_content(g: &Grid, to: impl Fn(usize, usize) -> (usize, usize)) -> Option<Grid> {
    let (top, left, bottom, right) = content_bounds(g)?;
    let (h, w) = (bottom - top + 1, right - left + 1);
    let (dest_top, dest_left) = to(h, w);
    Grid::from_fn(g.rows(), g.cols(), |r, c| {
        let inside = (dest_top..dest_top + h).contains(&r) && (dest_left..dest_left + w).contains(&c);
        if inside {
            g.get(top + r - dest_top, left + c - dest_left)
        } else {
            0
        }
    })
}

/// Center the content's bounding box (floor on odd slack).
pub(crate) fn align_center(g: &Grid, _args: &[u8]) -> Option<Grid> {
    let (rows, cols) = g.dims();
    shift_content(g, |h, w| ((rows - h) / 2, (cols - w) / 2))
}

/// Move the content's bounding box to the top-left corner.
pub(crate) fn align_corner(g: &Grid, _args: &[u8]) -> Option<Grid> {
    shift_content(g, |_, _| (0, 0))
}
