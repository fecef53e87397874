//! Spreadsheet grid import and table detection
//!
//! This module turns a raw 2-D grid of cell values into the tables an operator can pick from:
//! - Cell: a single spreadsheet value
//! - Grid: ragged rows of cells, missing positions read as empty
//! - Table: a rectangular block with a header row, produced by [`segment`]
//! - CellAddress: A1-style addressing used for description cells

pub mod address;
pub mod cell;
pub mod segment;

pub use address::{CellAddress, DescriptionCandidate, description_candidates};
pub use cell::Cell;
pub use segment::segment;

use cell::EMPTY_CELL;
use serde::{Deserialize, Serialize};

/// Raw rows of cells, possibly of unequal length
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    /// Build a grid from string rows; empty strings become empty cells
    pub fn from_strings<R, S>(rows: R) -> Self
    where
        R: IntoIterator,
        R::Item: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let rows = rows
            .into_iter()
            .map(|row| row.into_iter().map(|s| Cell::from(s.as_ref())).collect())
            .collect();
        Self { rows }
    }

    /// Cell at (row, column); out-of-range positions are empty
    pub fn cell(&self, row: usize, column: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(column)).unwrap_or(&EMPTY_CELL)
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Vec<Cell>] {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Length of the longest row
    pub fn max_width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }
}

/// A block of the grid with a header row and at least one value row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    /// Stable identifier, `strip{strip}_row{first row}`
    pub id: String,

    /// Display name built from the header cells
    pub name: String,

    /// `data[0]` is the header row, the rest are value rows
    pub data: Grid,

    /// 1-based row of the header in the source grid
    pub origin_source_row: usize,

    /// Source grid columns this table was projected from
    pub source_columns: Vec<usize>,
}

impl Table {
    pub fn headers(&self) -> &[Cell] {
        self.data.rows().first().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Value rows (everything below the header)
    pub fn rows(&self) -> &[Vec<Cell>] {
        self.data.rows().get(1..).unwrap_or(&[])
    }

    pub fn width(&self) -> usize {
        self.data.max_width()
    }

    /// Header text for a column, or `None` if the column is out of range
    pub fn header(&self, column: usize) -> Option<String> {
        (column < self.width()).then(|| self.data.cell(0, column).trimmed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_cells_read_as_empty() {
        let grid = Grid::from_strings([vec!["a", "b"], vec!["c"]]);
        assert_eq!(grid.max_width(), 2);
        assert!(grid.cell(1, 1).is_empty());
        assert!(grid.cell(9, 9).is_empty());
        assert_eq!(grid.cell(0, 1), &Cell::text("b"));
    }

    #[test]
    fn test_grid_json_is_plain_array() {
        let grid: Grid = serde_json::from_str(r#"[["Size","Price"],["S",10]]"#).unwrap();
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.cell(1, 1), &Cell::Number(10.0));
    }
}
