use crate::grid::{Cell, Table};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

const SIZE_CODES: &[&str] = &["xxs", "xs", "s", "m", "l", "xl", "xxl", "2xl", "3xl", "4xl", "5xl"];

/// One variant dimension to create on the host page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariationSpec {
    pub header: String,

    /// Distinct non-empty option labels in first-seen order
    pub options: IndexSet<String>,
}

impl VariationSpec {
    /// Project a table column into a variation.
    ///
    /// `dimension` is zero-based and only used for the fallback header.
    pub fn from_column(table: &Table, column: usize, dimension: usize) -> Self {
        let header = table.data.cell(0, column).trimmed();
        let is_size = header.to_lowercase().contains("size");

        let options = table
            .rows()
            .iter()
            .map(|row| row.get(column).map(Cell::trimmed).unwrap_or_default())
            .filter(|value| !value.is_empty())
            .map(|value| if is_size { format_size(&value) } else { value })
            .collect();

        let header = if header.is_empty() { format!("Variation {}", dimension + 1) } else { header };
        Self { header, options }
    }
}

/// Fill empty cells of `column` from the row above (merged spreadsheet cells).
///
/// Only value rows after the first are filled; the header is never touched.
pub fn fill_down(table: &mut Table, column: usize) {
    let rows = table.data.rows_mut();
    for i in 2..rows.len() {
        let current_empty = rows[i].get(column).is_none_or(Cell::is_empty);
        if !current_empty {
            continue;
        }

        let above = rows[i - 1].get(column).cloned().unwrap_or_default();
        if rows[i].len() <= column {
            rows[i].resize(column + 1, Cell::Empty);
        }
        rows[i][column] = above;
    }
}

/// Normalise a size label: known size codes are upper-cased, anything else is capitalised
pub fn format_size(value: &str) -> String {
    let trimmed = value.trim();
    if SIZE_CODES.contains(&trimmed.to_lowercase().as_str()) {
        return trimmed.to_uppercase();
    }

    let mut chars = trimmed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, segment};

    fn table(rows: &[&[&str]]) -> Table {
        segment(&Grid::from_strings(rows.iter().map(|r| r.to_vec()))).remove(0)
    }

    #[test]
    fn test_options_are_distinct_in_order() {
        let t = table(&[&["Color", "Price"], &["Red", "1"], &["Blue", "2"], &["Red", "3"], &["", "4"], &["Green", "5"]]);
        let spec = VariationSpec::from_column(&t, 0, 0);
        assert_eq!(spec.header, "Color");
        assert_eq!(spec.options.iter().collect::<Vec<_>>(), vec!["Red", "Blue", "Green"]);
    }

    #[test]
    fn test_size_header_formats_options() {
        let t = table(&[&["Shirt Size", "Price"], &["xl", "1"], &["m", "2"], &["kids", "3"]]);
        let spec = VariationSpec::from_column(&t, 0, 0);
        assert_eq!(spec.options.iter().collect::<Vec<_>>(), vec!["XL", "M", "Kids"]);
    }

    #[test]
    fn test_blank_header_falls_back() {
        let t = table(&[&["", "Price"], &["A", "1"]]);
        let spec = VariationSpec::from_column(&t, 0, 1);
        assert_eq!(spec.header, "Variation 2");
    }

    #[test]
    fn test_fill_down_merged_cells() {
        let mut t = table(&[&["Size", "Color", "Price"], &["S", "Red", "1"], &["", "Blue", "2"], &["M", "Red", "3"], &["", "Blue", "4"]]);
        fill_down(&mut t, 0);
        let sizes: Vec<String> = t.rows().iter().map(|r| r[0].trimmed()).collect();
        assert_eq!(sizes, vec!["S", "S", "M", "M"]);
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(" 2xl "), "2XL");
        assert_eq!(format_size("small"), "Small");
        assert_eq!(format_size(""), "");
    }
}
