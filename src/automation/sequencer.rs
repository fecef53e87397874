use super::prices::fill_prices;
use super::{AutomationReport, DimensionReport, RunMode, SequencerState, SequencerTimings};
use crate::error::{AutofillError, Result};
use crate::grid::Table;
use crate::host::{ToggleOutcome, VariationHost, WaitOutcome, wait_until};
use crate::mapping::{ColumnMapping, MappingMode, VariantKeyMatcher, VariationSpec, fill_down};
use crate::pricing::{PricingConfig, compute_price};
use log::{debug, error, info, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Runs the variation workflow against one host page.
///
/// Takes `&mut self` for every run, so a sequencer never drives two runs at once.
pub struct AutomationSequencer<'h, H: VariationHost + ?Sized> {
    host: &'h H,
    timings: SequencerTimings,
    state: SequencerState,
    description: Option<String>,
}

impl<'h, H: VariationHost + ?Sized> AutomationSequencer<'h, H> {
    pub fn new(host: &'h H) -> Self {
        Self { host, timings: SequencerTimings::default(), state: SequencerState::Idle, description: None }
    }

    pub fn with_timings(mut self, timings: SequencerTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Text written into the listing description after the run
    pub fn with_description(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.description = (!text.trim().is_empty()).then_some(text);
        self
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    fn enter(&mut self, state: SequencerState) {
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Create the mapped variations, apply them and price every rendered row.
    ///
    /// Without a variant column the single listing price is filled instead.
    pub async fn run(&mut self, table: &Table, mapping: &ColumnMapping, pricing: &PricingConfig) -> Result<AutomationReport> {
        pricing.validate()?;
        let (variant1, variant2, price) = match mapping.resolve(table)? {
            MappingMode::SinglePrice { price } => return self.single_price(table, price, pricing).await,
            MappingMode::Variants { variant1, variant2, price } => (variant1, variant2, price),
        };

        info!(
            "Starting automation: rate={} discount={} extra={} rounding={:?}",
            pricing.exchange_rate, pricing.discount_fraction, pricing.extra_addend, pricing.rounding
        );

        let mut table = table.clone();
        fill_down(&mut table, variant1);

        let mut specs = vec![VariationSpec::from_column(&table, variant1, 0)];
        if let Some(column) = variant2 {
            specs.push(VariationSpec::from_column(&table, column, 1));
        }
        if specs[0].options.is_empty() {
            return Err(AutofillError::InvalidMapping(format!("'{}' has no values", specs[0].header)));
        }

        let mut report = AutomationReport::new(RunMode::Full);
        for (dimension, spec) in specs.iter().enumerate() {
            info!("Processing variant {}: {} ({} options)", dimension + 1, spec.header, spec.options.len());
            let dimension_report = self.create_dimension(dimension, spec).await;
            report.dimensions.push(dimension_report);
        }

        report.prices_vary = Some(self.enable_prices_vary().await);

        let (applied, attempts) = self.apply().await;
        report.applied = applied;
        report.apply_attempts = attempts;
        if !applied {
            error!("Failed to click Apply after {} attempts", attempts);
            self.enter(SequencerState::Finished);
            return Ok(report);
        }

        sleep(self.timings.settle).await;

        self.enter(SequencerState::FillingPrices);
        let matcher = VariantKeyMatcher::new(&table, variant1, variant2, price);
        report.rows = fill_prices(self.host, &self.timings, &matcher, pricing).await;

        report.description_filled = self.fill_description().await;
        self.enter(SequencerState::Finished);
        Ok(report)
    }

    /// Re-price rows the page already shows, without touching the variations
    pub async fn update_prices_only(
        &mut self,
        table: &Table,
        mapping: &ColumnMapping,
        pricing: &PricingConfig,
    ) -> Result<AutomationReport> {
        pricing.validate()?;
        let (variant1, variant2, price) = match mapping.resolve(table)? {
            MappingMode::SinglePrice { price } => return self.single_price(table, price, pricing).await,
            MappingMode::Variants { variant1, variant2, price } => (variant1, variant2, price),
        };

        info!("Updating prices only");
        let mut table = table.clone();
        fill_down(&mut table, variant1);

        let mut report = AutomationReport::new(RunMode::PricesOnly);
        self.enter(SequencerState::FillingPrices);
        let matcher = VariantKeyMatcher::new(&table, variant1, variant2, price);
        report.rows = fill_prices(self.host, &self.timings, &matcher, pricing).await;
        self.enter(SequencerState::Finished);
        Ok(report)
    }

    async fn single_price(&mut self, table: &Table, column: usize, pricing: &PricingConfig) -> Result<AutomationReport> {
        info!("Simple price mode");
        let mut report = AutomationReport::new(RunMode::SinglePrice);

        let raw = table.data.cell(1, column).to_string();
        match compute_price(&raw, pricing) {
            Some(price) => {
                if log_step("listing price", self.host.fill_listing_price(&price).await) {
                    info!("Simple price filled: {}", price);
                    report.listing_price = Some(price);
                } else {
                    warn!("Price input not found on page");
                }
            }
            None => warn!("Invalid price in sheet: {:?}", raw),
        }

        report.description_filled = self.fill_description().await;
        self.enter(SequencerState::Finished);
        Ok(report)
    }

    async fn create_dimension(&mut self, dimension: usize, spec: &VariationSpec) -> DimensionReport {
        let mut report = DimensionReport {
            header: spec.header.clone(),
            options_requested: spec.options.len(),
            ..DimensionReport::default()
        };

        self.enter(SequencerState::ModalOpening);
        report.opened = log_step("add variation", self.host.open_variation_modal(dimension).await);
        if report.opened {
            pause(self.timings.after_open_modal).await;
        } else {
            warn!("Add variation control not found, assuming the modal is open");
        }

        self.enter(SequencerState::ModalReady);
        report.custom_chosen = log_step("create your own", self.host.choose_custom_option().await);
        if report.custom_chosen {
            pause(self.timings.after_custom_option).await;
        }

        self.enter(SequencerState::NamingField);
        report.named = log_step("variation name", self.host.set_variation_name(&spec.header).await);
        if report.named {
            pause(self.timings.after_name).await;
        }

        for (position, option) in spec.options.iter().enumerate() {
            self.enter(SequencerState::AddingOptions(position));
            if !log_step("option input", self.host.set_option_input(option).await) {
                warn!("Option input not found, {} options left unadded", spec.options.len() - position);
                break;
            }
            pause(self.timings.after_option_input).await;

            let added = log_step("add option", self.host.click_add_option().await)
                || log_step("enter on option", self.host.submit_option_with_enter().await);
            if added {
                report.options_added += 1;
            } else {
                warn!("Option '{}' could not be submitted", option);
            }
            pause(self.timings.after_option_add).await;
        }

        self.enter(SequencerState::Confirming);
        pause(self.timings.before_confirm).await;
        report.confirmed = log_step("done", self.host.confirm_variation_modal().await);
        if report.confirmed {
            pause(self.timings.after_confirm).await;
        } else {
            warn!("Done button not found in the active modal");
        }

        self.enter(SequencerState::Done);
        report
    }

    async fn enable_prices_vary(&mut self) -> ToggleOutcome {
        self.enter(SequencerState::EnablingPricesVary);
        pause(self.timings.before_prices_vary).await;

        let outcome = match self.host.enable_prices_vary().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("prices vary failed: {}", e);
                ToggleOutcome::NotFound
            }
        };
        match outcome {
            ToggleOutcome::Enabled => {
                info!("Toggled 'Prices vary' on");
                pause(self.timings.after_prices_vary).await;
            }
            ToggleOutcome::AlreadyOn => debug!("'Prices vary' already on"),
            ToggleOutcome::NotFound => warn!("'Prices vary' toggle not found"),
        }
        outcome
    }

    /// Returns whether Apply was clicked and how many attempts it took
    async fn apply(&mut self) -> (bool, u32) {
        self.enter(SequencerState::Applying);
        let host = self.host;
        let outcome = wait_until(
            |attempt| async move {
                debug!("Apply attempt {}", attempt);
                log_step("apply", host.click_apply().await).then_some(())
            },
            self.timings.apply,
        )
        .await;

        match outcome {
            WaitOutcome::Ready { attempts, .. } => {
                info!("Apply clicked");
                (true, attempts)
            }
            WaitOutcome::TimedOut { attempts } => (false, attempts),
        }
    }

    async fn fill_description(&mut self) -> bool {
        let Some(text) = self.description.as_deref() else {
            debug!("No description selected");
            return false;
        };

        let filled = log_step("description", self.host.fill_description(text).await);
        if filled {
            info!("Description filled");
        } else {
            warn!("Description field not found");
        }
        filled
    }
}

/// Host errors on a step are logged and count as a miss
fn log_step(step: &str, result: Result<bool>) -> bool {
    match result {
        Ok(found) => found,
        Err(e) => {
            warn!("{} failed: {}", step, e);
            false
        }
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{Grid, segment};
    use crate::host::VariantRow;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MissingPage {
        listing_price: Mutex<Option<String>>,
    }

    #[async_trait]
    impl VariationHost for MissingPage {
        async fn open_variation_modal(&self, _: usize) -> Result<bool> {
            Ok(false)
        }
        async fn choose_custom_option(&self) -> Result<bool> {
            Ok(false)
        }
        async fn set_variation_name(&self, _: &str) -> Result<bool> {
            Err(AutofillError::EvaluationFailed("page closed".into()))
        }
        async fn set_option_input(&self, _: &str) -> Result<bool> {
            Ok(false)
        }
        async fn click_add_option(&self) -> Result<bool> {
            Ok(false)
        }
        async fn submit_option_with_enter(&self) -> Result<bool> {
            Ok(false)
        }
        async fn confirm_variation_modal(&self) -> Result<bool> {
            Ok(false)
        }
        async fn enable_prices_vary(&self) -> Result<ToggleOutcome> {
            Ok(ToggleOutcome::NotFound)
        }
        async fn click_apply(&self) -> Result<bool> {
            Ok(false)
        }
        async fn variant_rows(&self) -> Result<Vec<VariantRow>> {
            Ok(Vec::new())
        }
        async fn fill_row_price(&self, _: usize, _: &str) -> Result<Option<String>> {
            Ok(None)
        }
        async fn set_row_visibility(&self, _: usize, _: bool) -> Result<bool> {
            Ok(false)
        }
        async fn fill_listing_price(&self, price: &str) -> Result<bool> {
            *self.listing_price.lock().unwrap() = Some(price.to_string());
            Ok(true)
        }
        async fn fill_description(&self, _: &str) -> Result<bool> {
            Ok(false)
        }
    }

    fn table() -> Table {
        let grid = Grid::from_strings(vec![vec!["Color", "Price"], vec!["Red", "$10"], vec!["Blue", "12"]]);
        segment(&grid).remove(0)
    }

    #[tokio::test]
    async fn test_missing_controls_do_not_abort() {
        let page = MissingPage::default();
        let mut sequencer = AutomationSequencer::new(&page).with_timings(SequencerTimings::immediate());

        let mapping = ColumnMapping::new().variant1(0).price(1);
        let report = sequencer.run(&table(), &mapping, &PricingConfig::default()).await.unwrap();

        assert_eq!(report.dimensions.len(), 1);
        let dimension = &report.dimensions[0];
        assert!(!dimension.opened && !dimension.named && !dimension.confirmed);
        assert_eq!(dimension.options_requested, 2);
        assert_eq!(dimension.options_added, 0);
        assert_eq!(report.prices_vary, Some(ToggleOutcome::NotFound));
        assert!(!report.applied);
        assert_eq!(report.apply_attempts, 5);
        assert!(report.rows.is_empty());
        assert_eq!(sequencer.state(), SequencerState::Finished);
    }

    #[tokio::test]
    async fn test_single_price_mode() {
        let page = MissingPage::default();
        let mut sequencer = AutomationSequencer::new(&page).with_timings(SequencerTimings::immediate());

        let mapping = ColumnMapping::new().price(1);
        let pricing = PricingConfig::default().rounding(crate::pricing::RoundingMode::EndingIn99);
        let report = sequencer.run(&table(), &mapping, &pricing).await.unwrap();

        assert_eq!(report.mode, RunMode::SinglePrice);
        assert_eq!(report.listing_price.as_deref(), Some("10.99"));
        assert_eq!(page.listing_price.lock().unwrap().as_deref(), Some("10.99"));
        assert!(report.unmatched_rows().is_empty());
    }

    #[tokio::test]
    async fn test_unset_mapping_fails_before_touching_page() {
        let page = MissingPage::default();
        let mut sequencer = AutomationSequencer::new(&page);

        let err = sequencer.run(&table(), &ColumnMapping::new(), &PricingConfig::default()).await.unwrap_err();
        assert!(matches!(err, AutofillError::InvalidMapping(_)));
        assert_eq!(sequencer.state(), SequencerState::Idle);
    }
}
