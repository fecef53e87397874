use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minimum trimmed length for a cell to be offered as a listing description
pub const DESCRIPTION_MIN_CHARS: usize = 100;

const PREVIEW_CHARS: usize = 50;

/// Zero-based cell position, displayed in A1 notation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellAddress {
    pub row: usize,
    pub column: usize,
}

impl CellAddress {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// Spreadsheet letters for a zero-based column index (0 -> A, 25 -> Z, 26 -> AA)
    pub fn column_letters(column: usize) -> String {
        let mut letters = Vec::new();
        let mut index = column as i64;
        while index >= 0 {
            letters.push((b'A' + (index % 26) as u8) as char);
            index = index / 26 - 1;
        }
        letters.iter().rev().collect()
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::column_letters(self.column), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_uppercase();
        let split = s.find(|c: char| c.is_ascii_digit()).ok_or_else(|| format!("'{}' has no row number", s))?;
        let (letters, digits) = s.split_at(split);

        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(format!("'{}' has no column letters", s));
        }

        let row: usize = digits.parse().map_err(|_| format!("'{}' has an invalid row number", s))?;
        if row == 0 {
            return Err(format!("'{}' rows start at 1", s));
        }

        let column = letters
            .bytes()
            .try_fold(0usize, |acc, b| acc.checked_mul(26)?.checked_add((b - b'A' + 1) as usize))
            .ok_or_else(|| format!("'{}' has too many column letters", s))?;
        Ok(Self { row: row - 1, column: column - 1 })
    }
}

/// A long text cell that may be used as the listing description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionCandidate {
    pub address: CellAddress,
    pub text: String,
    pub preview: String,
}

/// Scan the whole raw grid for cells long enough to be descriptions
pub fn description_candidates(grid: &Grid) -> Vec<DescriptionCandidate> {
    let mut candidates = Vec::new();

    for (r, row) in grid.rows().iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let text = cell.trimmed();
            if text.chars().count() < DESCRIPTION_MIN_CHARS {
                continue;
            }

            let preview = if text.chars().count() > PREVIEW_CHARS {
                format!("{}...", text.chars().take(PREVIEW_CHARS).collect::<String>())
            } else {
                text.clone()
            };

            candidates.push(DescriptionCandidate { address: CellAddress::new(r, c), text, preview });
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_letters(0), "A");
        assert_eq!(CellAddress::column_letters(25), "Z");
        assert_eq!(CellAddress::column_letters(26), "AA");
        assert_eq!(CellAddress::column_letters(27), "AB");
        assert_eq!(CellAddress::column_letters(701), "ZZ");
        assert_eq!(CellAddress::column_letters(702), "AAA");
    }

    #[test]
    fn test_display_and_parse() {
        let address = CellAddress::new(10, 7);
        assert_eq!(address.to_string(), "H11");
        assert_eq!("h11".parse::<CellAddress>().unwrap(), address);
        assert_eq!("AA1".parse::<CellAddress>().unwrap(), CellAddress::new(0, 26));
        assert!("11".parse::<CellAddress>().is_err());
        assert!("A0".parse::<CellAddress>().is_err());
        assert!("A".parse::<CellAddress>().is_err());
    }

    #[test]
    fn test_overlong_column_is_rejected() {
        let err = "AAAAAAAAAAAAAAAAAAAAAAAA1".parse::<CellAddress>().unwrap_err();
        assert!(err.contains("too many column letters"));
        assert_eq!("XFD1048576".parse::<CellAddress>().unwrap(), CellAddress::new(1_048_575, 16_383));
    }

    #[test]
    fn test_description_candidates() {
        let long = "x".repeat(120);
        let grid = Grid::from_strings([vec!["Size", "Price"], vec!["S", "10"], vec!["", long.as_str()]]);

        let found = description_candidates(&grid);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address.to_string(), "B3");
        assert_eq!(found[0].text.len(), 120);
        assert_eq!(found[0].preview, format!("{}...", "x".repeat(50)));
    }
}
