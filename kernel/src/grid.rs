//! `Grid`: an immutable rectangular matrix of colors 0..=9.
//!
//! Every constructor validates shape and palette, so a `Grid` value is never
//! ragged or empty. Transformations build new grids; nothing mutates in place.

use serde::{Deserialize, Serialize};

use crate::digest::hash::{canonical_hash, ContentHash};
use crate::digest::hash_domain::HashDomain;

/// Highest legal color value.
pub const MAX_COLOR: u8 = 9;

/// Number of distinct colors (`0..=MAX_COLOR`).
pub const PALETTE_SIZE: usize = MAX_COLOR as usize + 1;

/// Typed failure for grid construction.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    /// Zero rows or zero columns.
    #[error("grid must have at least one row and one column")]
    Empty,
    /// A row's length differs from the first row's.
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A cell value exceeds [`MAX_COLOR`].
    #[error("cell ({row}, {col}) has color {value}, max is 9")]
    ColorOutOfRange { row: usize, col: usize, value: u8 },
    /// Flat cell buffer does not match `rows * cols`.
    #[error("{rows}x{cols} grid needs {} cells, got {len}", .rows * .cols)]
    CellCount { rows: usize, cols: usize, len: usize },
}

/// Rectangular color matrix, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<u8>>", into = "Vec<Vec<u8>>")]
pub struct Grid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl Grid {
    /// Build from a flat row-major buffer.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] on empty dimensions, a buffer of the wrong
    /// length, or an out-of-range color.
    pub fn new(rows: usize, cols: usize, cells: Vec<u8>) -> Result<Self, GridError> {
        if rows == 0 || cols == 0 {
            return Err(GridError::Empty);
        }
        if cells.len() != rows * cols {
            return Err(GridError::CellCount {
                rows,
                cols,
                len: cells.len(),
            });
        }
        if let Some(idx) = cells.iter().position(|&c| c > MAX_COLOR) {
            return Err(GridError::ColorOutOfRange {
                row: idx / cols,
                col: idx % cols,
                value: cells[idx],
            });
        }
        Ok(Self { rows, cols, cells })
    }

    /// Build from nested rows.
    ///
    /// # Errors
    ///
    /// Returns [`GridError`] if the rows are empty, ragged, or hold a color
    /// above [`MAX_COLOR`].
    pub fn from_rows<R: AsRef<[u8]>>(rows: &[R]) -> Result<Self, GridError> {
        let first = rows.first().ok_or(GridError::Empty)?.as_ref().len();
        let mut cells = Vec::with_capacity(rows.len() * first);
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != first {
                return Err(GridError::Ragged {
                    row,
                    expected: first,
                    found: values.len(),
                });
            }
            cells.extend_from_slice(values);
        }
        Self::new(rows.len(), first, cells)
    }

    /// Build by evaluating `f(row, col)` for every cell.
    ///
    /// Returns `None` when either dimension is zero or `f` produces a color
    /// above [`MAX_COLOR`]. Primitives use this so that an empty or invalid
    /// result is reported as "not applicable".
    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> u8) -> Option<Self> {
        if rows == 0 || cols == 0 {
            return None;
        }
        let mut cells = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                let v = f(r, c);
                if v > MAX_COLOR {
                    return None;
                }
                cells.push(v);
            }
        }
        Some(Self { rows, cols, cells })
    }

    /// A grid with every cell set to `color`.
    #[must_use]
    pub fn filled(rows: usize, cols: usize, color: u8) -> Option<Self> {
        Self::from_fn(rows, cols, |_, _| color)
    }

    #[must_use]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// `(rows, cols)`.
    #[must_use]
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Number of cells.
    #[must_use]
    pub fn area(&self) -> usize {
        self.cells.len()
    }

    /// Cell value at `(row, col)`.
    ///
    /// # Panics
    ///
    /// Panics if the coordinate is out of bounds.
    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> u8 {
        assert!(row < self.rows && col < self.cols, "cell ({row}, {col}) out of bounds");
        self.cells[row * self.cols + col]
    }

    /// Row-major cell slice.
    #[must_use]
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    /// One row as a slice.
    #[must_use]
    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// One column, copied.
    #[must_use]
    pub fn column(&self, col: usize) -> Vec<u8> {
        (0..self.rows).map(|r| self.get(r, col)).collect()
    }

    /// Nested-row copy.
    #[must_use]
    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.cols).map(<[u8]>::to_vec).collect()
    }

    /// Per-color cell counts.
    #[must_use]
    pub fn histogram(&self) -> [usize; PALETTE_SIZE] {
        let mut counts = [0usize; PALETTE_SIZE];
        for &c in &self.cells {
            counts[c as usize] += 1;
        }
        counts
    }

    /// Distinct colors present, ascending.
    #[must_use]
    pub fn colors(&self) -> Vec<u8> {
        self.histogram()
            .iter()
            .enumerate()
            .filter(|(_, &n)| n > 0)
            .filter_map(|(c, _)| u8::try_from(c).ok())
            .collect()
    }

    /// Whether `color` occurs anywhere.
    #[must_use]
    pub fn contains_color(&self, color: u8) -> bool {
        self.cells.contains(&color)
    }

    /// Count of non-zero cells.
    #[must_use]
    pub fn nonzero_count(&self) -> usize {
        self.cells.iter().filter(|&&c| c != 0).count()
    }

    /// Same shape, each cell mapped through `f`.
    #[must_use]
    pub fn map_cells(&self, f: impl Fn(u8) -> u8) -> Option<Self> {
        Self::from_fn(self.rows, self.cols, |r, c| f(self.get(r, c)))
    }

    /// Dedup identity bytes: `rows u32 LE || cols u32 LE || cells`.
    #[must_use]
    pub fn identity_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.cells.len());
        out.extend_from_slice(&u32::try_from(self.rows).unwrap_or(u32::MAX).to_le_bytes());
        out.extend_from_slice(&u32::try_from(self.cols).unwrap_or(u32::MAX).to_le_bytes());
        out.extend_from_slice(&self.cells);
        out
    }

    /// Content hash under [`HashDomain::Grid`].
    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        canonical_hash(HashDomain::Grid, &self.identity_bytes())
    }
}

impl TryFrom<Vec<Vec<u8>>> for Grid {
    type Error = GridError;

    fn try_from(rows: Vec<Vec<u8>>) -> Result<Self, Self::Error> {
        Self::from_rows(&rows)
    }
}

impl From<Grid> for Vec<Vec<u8>> {
    fn from(grid: Grid) -> Self {
        grid.to_rows()
    }
}

impl std::fmt::Display for Grid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, row) in self.cells.chunks(self.cols).enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            for (j, v) in row.iter().enumerate() {
                if j > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{v}")?;
            }
        }
        Ok(())
    }
}

/// Build a grid from a nested array literal. Test and fixture helper.
///
/// # Panics
///
/// Panics if the rows are not a valid grid.
#[must_use]
pub fn grid<const C: usize>(rows: &[[u8; C]]) -> Grid {
    match Grid::from_rows(rows) {
        Ok(g) => g,
        Err(e) => panic!("invalid grid literal: {e}"),
    }
}
