//! Drives the listing editor's variation workflow
//!
//! The host page renders asynchronously and never signals completion, so every step is a
//! host call followed by a fixed pause or a bounded poll. Steps whose control cannot be
//! found are logged and skipped; the run carries on and records what happened in an
//! [`AutomationReport`].

mod prices;
pub mod sequencer;

pub use sequencer::AutomationSequencer;

use crate::error::AutofillError;
use crate::host::{PollPolicy, ToggleOutcome};
use std::time::Duration;

/// Where the sequencer currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequencerState {
    #[default]
    Idle,
    ModalOpening,
    ModalReady,
    NamingField,
    /// Adding the option at this zero-based position
    AddingOptions(usize),
    Confirming,
    /// Current dimension finished
    Done,
    EnablingPricesVary,
    Applying,
    FillingPrices,
    Finished,
}

/// Pauses and poll budgets between host-page steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerTimings {
    pub after_open_modal: Duration,
    pub after_custom_option: Duration,
    pub after_name: Duration,
    pub after_option_input: Duration,
    pub after_option_add: Duration,
    pub before_confirm: Duration,
    pub after_confirm: Duration,
    pub before_prices_vary: Duration,
    pub after_prices_vary: Duration,
    /// Retry budget for locating and clicking Apply
    pub apply: PollPolicy,
    /// Pause for the variant table to render after Apply
    pub settle: Duration,
    /// Poll for rendered variant rows once the settle pause is over
    pub rows: PollPolicy,
    /// Attempts per row to get the price field to display the written value
    pub price_fill_attempts: u32,
    pub after_price: Duration,
}

impl Default for SequencerTimings {
    fn default() -> Self {
        Self {
            after_open_modal: Duration::from_millis(500),
            after_custom_option: Duration::from_millis(500),
            after_name: Duration::from_millis(200),
            after_option_input: Duration::from_millis(100),
            after_option_add: Duration::from_millis(100),
            before_confirm: Duration::from_millis(200),
            after_confirm: Duration::from_millis(1000),
            before_prices_vary: Duration::from_millis(500),
            after_prices_vary: Duration::from_millis(1000),
            apply: PollPolicy::new(5, Duration::from_millis(1000)),
            settle: Duration::from_millis(4000),
            rows: PollPolicy::new(5, Duration::from_millis(1000)),
            price_fill_attempts: 3,
            after_price: Duration::from_millis(50),
        }
    }
}

impl SequencerTimings {
    /// Same attempt budgets, no pauses
    pub fn immediate() -> Self {
        let defaults = Self::default();
        Self {
            after_open_modal: Duration::ZERO,
            after_custom_option: Duration::ZERO,
            after_name: Duration::ZERO,
            after_option_input: Duration::ZERO,
            after_option_add: Duration::ZERO,
            before_confirm: Duration::ZERO,
            after_confirm: Duration::ZERO,
            before_prices_vary: Duration::ZERO,
            after_prices_vary: Duration::ZERO,
            apply: defaults.apply.without_delay(),
            settle: Duration::ZERO,
            rows: defaults.rows.without_delay(),
            price_fill_attempts: defaults.price_fill_attempts,
            after_price: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Create variations, apply, then price every row
    Full,
    /// Only the price-fill pass over rows that already exist
    PricesOnly,
    /// No variants: one listing price
    SinglePrice,
}

/// What happened while creating one variation dimension
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DimensionReport {
    pub header: String,
    pub opened: bool,
    pub custom_chosen: bool,
    pub named: bool,
    pub options_requested: usize,
    pub options_added: usize,
    pub confirmed: bool,
}

/// Outcome of the price-fill pass for one rendered variant row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOutcome {
    /// The field shows the computed price and the row is visible
    Priced { row: usize, label: String, price: String, attempts: u32 },
    /// The price was written but the field never displayed it
    PriceNotAccepted { row: usize, label: String, price: String },
    /// No spreadsheet price: the row was switched off
    Disabled { row: usize, label: String },
    /// The row has no price input
    NoPriceInput { row: usize, label: String },
}

impl RowOutcome {
    pub fn row(&self) -> usize {
        match self {
            RowOutcome::Priced { row, .. }
            | RowOutcome::PriceNotAccepted { row, .. }
            | RowOutcome::Disabled { row, .. }
            | RowOutcome::NoPriceInput { row, .. } => *row,
        }
    }
}

/// Summary of one sequencer run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutomationReport {
    pub mode: RunMode,
    pub dimensions: Vec<DimensionReport>,
    pub prices_vary: Option<ToggleOutcome>,
    pub apply_attempts: u32,
    pub applied: bool,
    pub rows: Vec<RowOutcome>,
    /// Price written in single-price mode
    pub listing_price: Option<String>,
    pub description_filled: bool,
}

impl AutomationReport {
    pub(crate) fn new(mode: RunMode) -> Self {
        Self {
            mode,
            dimensions: Vec::new(),
            prices_vary: None,
            apply_attempts: 0,
            applied: false,
            rows: Vec::new(),
            listing_price: None,
            description_filled: false,
        }
    }

    /// Rows that ended up without a price, as operator-facing errors
    pub fn unmatched_rows(&self) -> Vec<AutofillError> {
        let mut unmatched: Vec<AutofillError> = self
            .rows
            .iter()
            .filter_map(|outcome| match outcome {
                RowOutcome::Disabled { row, label } => {
                    Some(AutofillError::NoMatchingPrice { row: *row, label: label.clone() })
                }
                _ => None,
            })
            .collect();

        if self.mode == RunMode::SinglePrice && self.listing_price.is_none() {
            unmatched.push(AutofillError::NoMatchingPrice { row: 1, label: "listing price".to_string() });
        }
        unmatched
    }

    pub fn priced_rows(&self) -> usize {
        self.rows.iter().filter(|r| matches!(r, RowOutcome::Priced { .. })).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_keeps_attempt_budgets() {
        let timings = SequencerTimings::immediate();
        assert_eq!(timings.apply.max_attempts, 5);
        assert!(timings.apply.interval.is_zero());
        assert!(timings.settle.is_zero());
        assert_eq!(timings.price_fill_attempts, 3);
    }

    #[test]
    fn test_unmatched_rows() {
        let mut report = AutomationReport::new(RunMode::Full);
        report.rows = vec![
            RowOutcome::Priced { row: 0, label: "Red".into(), price: "10.99".into(), attempts: 1 },
            RowOutcome::Disabled { row: 1, label: "Blue".into() },
        ];

        let unmatched = report.unmatched_rows();
        assert_eq!(unmatched.len(), 1);
        assert_eq!(unmatched[0].to_string(), "No matching price for row 1 (Blue)");
        assert_eq!(report.priced_rows(), 1);
    }

    #[test]
    fn test_single_price_without_value_is_unmatched() {
        let report = AutomationReport::new(RunMode::SinglePrice);
        assert_eq!(report.unmatched_rows().len(), 1);
    }
}
