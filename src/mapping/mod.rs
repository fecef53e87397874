//! Column-to-role mapping, variation building and spreadsheet price lookup

pub mod matcher;
pub mod variation;

pub use matcher::{VariantKeyMatcher, normalize_key};
pub use variation::{VariationSpec, fill_down, format_size};

use crate::error::{AutofillError, Result};
use crate::grid::{CellAddress, Grid, Table};
use serde::{Deserialize, Serialize};

/// Operator's choice of which table columns play which role.
///
/// Every field may be unset; the mapping is only checked when a run needs it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub variant1: Option<usize>,
    pub variant2: Option<usize>,
    pub price: Option<usize>,

    /// Cell of the raw grid holding the listing description
    pub description: Option<CellAddress>,
}

/// What a run will do with a validated mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingMode {
    /// Create variations from one or two columns and price every variant row
    Variants { variant1: usize, variant2: Option<usize>, price: usize },

    /// No variants: fill the single listing price from the first value row
    SinglePrice { price: usize },
}

impl ColumnMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the first variant column
    pub fn variant1(mut self, column: usize) -> Self {
        self.variant1 = Some(column);
        self
    }

    /// Builder method: set the second variant column
    pub fn variant2(mut self, column: usize) -> Self {
        self.variant2 = Some(column);
        self
    }

    /// Builder method: set the price column
    pub fn price(mut self, column: usize) -> Self {
        self.price = Some(column);
        self
    }

    /// Builder method: set the description cell
    pub fn description(mut self, address: CellAddress) -> Self {
        self.description = Some(address);
        self
    }

    /// Trimmed text of the selected description cell, if it holds any
    pub fn description_text(&self, grid: &Grid) -> Option<String> {
        let address = self.description?;
        let text = grid.cell(address.row, address.column).trimmed();
        (!text.is_empty()).then_some(text)
    }

    /// Validate the mapping against the table it will be applied to
    pub fn resolve(&self, table: &Table) -> Result<MappingMode> {
        let width = table.width();
        let check = |role: &str, column: Option<usize>| -> Result<Option<usize>> {
            match column {
                Some(c) if c >= width => Err(AutofillError::InvalidMapping(format!(
                    "{} column {} is outside the table ({} columns)",
                    role, c, width
                ))),
                other => Ok(other),
            }
        };

        let variant1 = check("variant 1", self.variant1)?;
        let variant2 = check("variant 2", self.variant2)?;
        let price = check("price", self.price)?;

        match (variant1, price) {
            (Some(variant1), Some(price)) => {
                if variant2 == Some(variant1) {
                    return Err(AutofillError::InvalidMapping("both variants use the same column".to_string()));
                }
                Ok(MappingMode::Variants { variant1, variant2, price })
            }
            (Some(_), None) => Err(AutofillError::InvalidMapping("Select a Price column".to_string())),
            (None, Some(price)) => Ok(MappingMode::SinglePrice { price }),
            (None, None) => Err(AutofillError::InvalidMapping("Select Variant 1 or Price Column".to_string())),
        }
    }
}
