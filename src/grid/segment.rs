use crate::grid::{Cell, Grid, Table};
use log::debug;

/// Split a raw grid into independent tables.
///
/// Columns that hold at least one value are grouped into strips of adjacent columns; an
/// unoccupied column always starts a new strip. Each strip is then cut at fully blank rows.
/// Blocks shorter than two rows (no header plus data) are dropped.
pub fn segment(grid: &Grid) -> Vec<Table> {
    let max_width = grid.max_width();

    let occupied: Vec<usize> = (0..max_width)
        .filter(|&c| (0..grid.len()).any(|r| !grid.cell(r, c).is_empty()))
        .collect();

    let strips = column_strips(&occupied);
    let mut tables = Vec::new();

    for (strip_index, strip) in strips.iter().enumerate() {
        let mut block: Vec<Vec<Cell>> = Vec::new();
        let mut start_row = 0;

        for row in 0..grid.len() {
            let projected: Vec<Cell> = strip.iter().map(|&c| grid.cell(row, c).clone()).collect();

            if projected.iter().all(Cell::is_empty) {
                if !block.is_empty() {
                    push_block(&mut tables, std::mem::take(&mut block), strip_index, start_row, strip);
                }
            } else {
                if block.is_empty() {
                    start_row = row;
                }
                block.push(projected);
            }
        }

        if !block.is_empty() {
            push_block(&mut tables, block, strip_index, start_row, strip);
        }
    }

    debug!("Detected {} table(s) in {} strip(s)", tables.len(), strips.len());
    tables
}

fn column_strips(occupied: &[usize]) -> Vec<Vec<usize>> {
    let mut strips: Vec<Vec<usize>> = Vec::new();

    for &column in occupied {
        match strips.last_mut() {
            Some(strip) if strip.last().is_some_and(|&last| last + 1 == column) => strip.push(column),
            _ => strips.push(vec![column]),
        }
    }

    strips
}

fn push_block(tables: &mut Vec<Table>, block: Vec<Vec<Cell>>, strip_index: usize, start_row: usize, strip: &[usize]) {
    if block.len() < 2 {
        return;
    }

    let keys: Vec<String> = block[0].iter().filter(|c| !c.is_empty()).take(3).map(Cell::trimmed).collect();
    let name = if keys.is_empty() { format!("Table (Row {})", start_row + 1) } else { keys.join(", ") };

    tables.push(Table {
        id: format!("strip{}_row{}", strip_index, start_row),
        name,
        data: Grid::new(block),
        origin_source_row: start_row + 1,
        source_columns: strip.to_vec(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::from_strings(rows.iter().map(|r| r.to_vec()))
    }

    #[test]
    fn test_side_by_side_tables() {
        let g = grid(&[
            &["Size", "Price", "", "Color", "Stock"],
            &["S", "10", "", "Red", "4"],
            &["M", "12", "", "Blue", "7"],
        ]);

        let tables = segment(&g);
        assert_eq!(tables.len(), 2);

        assert_eq!(tables[0].name, "Size, Price");
        assert_eq!(tables[0].source_columns, vec![0, 1]);
        assert_eq!(tables[0].width(), 2);

        assert_eq!(tables[1].name, "Color, Stock");
        assert_eq!(tables[1].source_columns, vec![3, 4]);
        assert_eq!(tables[1].data.cell(2, 0), &Cell::text("Blue"));
    }

    #[test]
    fn test_blank_row_splits_table() {
        let g = grid(&[
            &["Size", "Price"],
            &["S", "10"],
            &["", ""],
            &["Color", "Price"],
            &["Red", "3"],
        ]);

        let tables = segment(&g);
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].id, "strip0_row0");
        assert_eq!(tables[1].id, "strip0_row3");
        assert_eq!(tables[1].origin_source_row, 4);
    }

    #[test]
    fn test_single_row_is_not_a_table() {
        let g = grid(&[&["", ""], &["lonely", "row"], &["", ""]]);
        assert!(segment(&g).is_empty());
    }

    #[test]
    fn test_empty_grid() {
        assert!(segment(&Grid::default()).is_empty());
        assert!(segment(&grid(&[&["", " "], &[]])).is_empty());
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let g = grid(&[&["Size", "Price", "Note"], &["S"], &["M", "12"]]);
        let tables = segment(&g);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].data.len(), 3);
        assert!(tables[0].data.cell(1, 2).is_empty());
    }

    #[test]
    fn test_name_uses_first_three_headers() {
        let g = grid(&[&["", "A", "B", "C", "D"], &["x", "1", "2", "3", "4"]]);
        let tables = segment(&g);
        assert_eq!(tables[0].name, "A, B, C");
    }

    #[test]
    fn test_numeric_header_names_table() {
        let g = Grid::new(vec![
            vec![Cell::Empty, Cell::Empty],
            vec![Cell::Number(2024.0), Cell::Empty],
            vec![Cell::text("S"), Cell::Empty],
        ]);
        let tables = segment(&g);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "2024");
        assert_eq!(tables[0].origin_source_row, 2);
        assert_eq!(tables[0].source_columns, vec![0]);
    }
}
