use crate::grid::{Cell, Table};

/// Lower-case and drop all whitespace
pub fn normalize_key(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).flat_map(char::to_lowercase).collect()
}

/// Resolves the spreadsheet price for a rendered variant row.
///
/// Matching is exact on normalised keys. When the second dimension is mapped both keys must
/// match on the same row. The first matching row wins; duplicate keys are not detected.
#[derive(Debug, Clone, Copy)]
pub struct VariantKeyMatcher<'a> {
    table: &'a Table,
    variant1: usize,
    variant2: Option<usize>,
    price: usize,
}

impl<'a> VariantKeyMatcher<'a> {
    pub fn new(table: &'a Table, variant1: usize, variant2: Option<usize>, price: usize) -> Self {
        Self { table, variant1, variant2, price }
    }

    /// Raw price cell of the first row whose keys match
    pub fn find_price(&self, variant1: &str, variant2: Option<&str>) -> Option<&'a Cell> {
        let target1 = normalize_key(variant1);
        let target2 = variant2.map(normalize_key);

        self.table.rows().iter().find_map(|row| {
            let key = |column: usize| row.get(column).map(|c| normalize_key(&c.to_string())).unwrap_or_default();

            let matched = match self.variant2 {
                Some(column) => key(self.variant1) == target1 && Some(key(column)) == target2,
                None => key(self.variant1) == target1,
            };

            matched.then(|| row.get(self.price).unwrap_or(&crate::grid::cell::EMPTY_CELL))
        })
    }
}
