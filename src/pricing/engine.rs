use crate::error::{AutofillError, Result};
use serde::{Deserialize, Serialize};

/// How the converted price is rounded before formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMode {
    #[default]
    None,
    #[serde(alias = "00")]
    NearestInteger,
    #[serde(rename = "ending_in_99", alias = "99")]
    EndingIn99,
    #[serde(rename = "ending_in_95", alias = "95")]
    EndingIn95,
}

impl RoundingMode {
    fn apply(self, value: f64) -> f64 {
        match self {
            RoundingMode::None => value,
            RoundingMode::NearestInteger => value.round(),
            RoundingMode::EndingIn99 => value.floor() + 0.99,
            RoundingMode::EndingIn95 => value.floor() + 0.95,
        }
    }
}

/// Conversion and markup applied to every spreadsheet price
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Fraction in `[0, 1)`; prices are marked up so that this discount lands on the raw price
    pub discount_fraction: f64,

    /// Multiplier from the sheet currency into the listing currency
    pub exchange_rate: f64,

    /// Flat amount added after conversion (may be negative)
    pub extra_addend: f64,

    pub rounding: RoundingMode,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { discount_fraction: 0.0, exchange_rate: 1.0, extra_addend: 0.0, rounding: RoundingMode::None }
    }
}

impl PricingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the exchange rate
    pub fn exchange_rate(mut self, rate: f64) -> Self {
        self.exchange_rate = rate;
        self
    }

    /// Builder method: set the discount fraction
    pub fn discount(mut self, fraction: f64) -> Self {
        self.discount_fraction = fraction;
        self
    }

    /// Builder method: set the flat addend
    pub fn extra(mut self, amount: f64) -> Self {
        self.extra_addend = amount;
        self
    }

    /// Builder method: set the rounding mode
    pub fn rounding(mut self, mode: RoundingMode) -> Self {
        self.rounding = mode;
        self
    }

    /// Reject configurations that cannot produce meaningful prices
    pub fn validate(&self) -> Result<()> {
        if !self.exchange_rate.is_finite() || self.exchange_rate <= 0.0 {
            return Err(AutofillError::InvalidPricing(format!("exchange rate must be > 0, got {}", self.exchange_rate)));
        }
        if !self.extra_addend.is_finite() {
            return Err(AutofillError::InvalidPricing("extra amount must be a finite number".to_string()));
        }
        if !(0.0..1.0).contains(&self.discount_fraction) {
            return Err(AutofillError::InvalidPricing(format!(
                "discount must be in [0, 1), got {}",
                self.discount_fraction
            )));
        }
        Ok(())
    }
}

/// Convert a raw spreadsheet price into the final listing price string.
///
/// Returns `None` when the raw value holds no parsable number.
pub fn compute_price(raw: &str, config: &PricingConfig) -> Option<String> {
    let value = parse_price(raw)?;

    let mut converted = value * config.exchange_rate;
    converted += config.extra_addend;

    if config.discount_fraction > 0.0 && config.discount_fraction < 1.0 {
        converted /= 1.0 - config.discount_fraction;
    }

    let rounded = config.rounding.apply(converted);
    rounded.is_finite().then(|| format!("{:.2}", rounded))
}

/// Keep digits and dots, then read the longest numeric prefix (`"1.2.3"` reads as `1.2`)
fn parse_price(raw: &str) -> Option<f64> {
    let kept: String = raw.chars().filter(|c| c.is_ascii_digit() || *c == '.').collect();

    let prefix = match kept.match_indices('.').nth(1) {
        Some((second_dot, _)) => &kept[..second_dot],
        None => kept.as_str(),
    };

    if !prefix.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    prefix.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ending_in_99() {
        let config = PricingConfig::new().rounding(RoundingMode::EndingIn99);
        assert_eq!(compute_price("$10.00", &config).as_deref(), Some("10.99"));
    }

    #[test]
    fn test_markup_from_discount() {
        let config = PricingConfig::new().rounding(RoundingMode::EndingIn99).discount(0.5);
        assert_eq!(compute_price("$10.00", &config).as_deref(), Some("20.99"));
    }

    #[test]
    fn test_rounding_modes_table() {
        let base = PricingConfig::new();
        assert_eq!(compute_price("7.004", &base.rounding(RoundingMode::NearestInteger)).as_deref(), Some("7.00"));
        assert_eq!(compute_price("7.004", &base.rounding(RoundingMode::EndingIn95)).as_deref(), Some("7.95"));
        assert_eq!(compute_price("7.004", &base.rounding(RoundingMode::None)).as_deref(), Some("7.00"));
        assert_eq!(compute_price("7.6", &base.rounding(RoundingMode::NearestInteger)).as_deref(), Some("8.00"));
    }

    #[test]
    fn test_conversion_then_addend() {
        let config = PricingConfig::new().exchange_rate(1.5).extra(-2.0);
        assert_eq!(compute_price("10", &config).as_deref(), Some("13.00"));
    }

    #[test]
    fn test_unparsable_is_none() {
        let config = PricingConfig::new();
        assert_eq!(compute_price("", &config), None);
        assert_eq!(compute_price("N/A", &config), None);
        assert_eq!(compute_price("...", &config), None);
    }

    #[test]
    fn test_parse_like_spreadsheet() {
        assert_eq!(parse_price("1,299.50 USD"), Some(1299.5));
        assert_eq!(parse_price("1.2.3"), Some(1.2));
        assert_eq!(parse_price(".5"), Some(0.5));
        assert_eq!(parse_price("-4"), Some(4.0));
    }

    #[test]
    fn test_discount_out_of_range_is_ignored_by_math() {
        let config = PricingConfig { discount_fraction: 1.0, ..PricingConfig::default() };
        assert_eq!(compute_price("10", &config).as_deref(), Some("10.00"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(PricingConfig::new().validate().is_ok());
        assert!(PricingConfig::new().exchange_rate(0.0).validate().is_err());
        assert!(PricingConfig::new().discount(-0.1).validate().is_err());
    }

    #[test]
    fn test_rounding_serde_names() {
        let mode: RoundingMode = serde_json::from_str("\"ending_in_99\"").unwrap();
        assert_eq!(mode, RoundingMode::EndingIn99);
        let mode: RoundingMode = serde_json::from_str("\"95\"").unwrap();
        assert_eq!(mode, RoundingMode::EndingIn95);
        let mode: RoundingMode = serde_json::from_str("\"nearest_integer\"").unwrap();
        assert_eq!(mode, RoundingMode::NearestInteger);
    }
}
