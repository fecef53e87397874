//! Operator settings, loaded from a JSON file with environment overrides

use crate::automation::SequencerTimings;
use crate::content::{DEFAULT_MODEL, DEFAULT_PROMPT};
use crate::error::{AutofillError, Result};
use crate::host::PollPolicy;
use crate::pricing::{PricingConfig, RoundingMode};
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Comma- or newline-separated list of API keys
pub const ENV_API_KEYS: &str = "GEMINI_API_KEYS";
/// Single API key, used when the list variable is unset
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gemini: GeminiSettings,
    pub pricing: PricingSettings,
    pub sequencer: SequencerSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiSettings {
    pub api_keys: Vec<String>,
    pub model: String,
    pub prompt: String,
    /// Generate title and tags for the first upload on a page without being asked
    pub auto_generate: bool,
}

impl Default for GeminiSettings {
    fn default() -> Self {
        Self {
            api_keys: Vec::new(),
            model: DEFAULT_MODEL.to_string(),
            prompt: DEFAULT_PROMPT.to_string(),
            auto_generate: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingSettings {
    /// Discount the listing will run, in percent (`30` = 30% off)
    pub discount_percent: f64,
    /// Listing currency; sheet prices are in USD
    pub target_currency: String,
    /// Overrides any fetched exchange rate when positive
    pub manual_rate: Option<f64>,
    pub extra_amount: f64,
    pub rounding: RoundingMode,
}

impl Default for PricingSettings {
    fn default() -> Self {
        Self {
            discount_percent: 0.0,
            target_currency: "USD".to_string(),
            manual_rate: None,
            extra_amount: 0.0,
            rounding: RoundingMode::None,
        }
    }
}

impl PricingSettings {
    /// Pricing with an already-resolved exchange rate
    pub fn pricing_config(&self, exchange_rate: f64) -> Result<PricingConfig> {
        let config = PricingConfig::new()
            .exchange_rate(exchange_rate)
            .discount(self.discount_percent / 100.0)
            .extra(self.extra_amount)
            .rounding(self.rounding);
        config.validate()?;
        Ok(config)
    }
}

/// Sequencer budgets that depend on how fast the operator's connection renders the editor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SequencerSettings {
    pub settle_ms: u64,
    pub apply_attempts: u32,
    pub apply_interval_ms: u64,
    pub price_fill_attempts: u32,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        let timings = SequencerTimings::default();
        Self {
            settle_ms: timings.settle.as_millis() as u64,
            apply_attempts: timings.apply.max_attempts,
            apply_interval_ms: timings.apply.interval.as_millis() as u64,
            price_fill_attempts: timings.price_fill_attempts,
        }
    }
}

impl SequencerSettings {
    pub fn timings(&self) -> SequencerTimings {
        SequencerTimings {
            settle: Duration::from_millis(self.settle_ms),
            apply: PollPolicy::new(self.apply_attempts.max(1), Duration::from_millis(self.apply_interval_ms)),
            price_fill_attempts: self.price_fill_attempts.max(1),
            ..SequencerTimings::default()
        }
    }
}

impl Settings {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| AutofillError::Settings(e.to_string()))
    }

    /// Read a settings file; a missing file yields the defaults
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(json) => Self::from_json(&json),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No settings file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(e) => Err(AutofillError::Settings(format!("{}: {}", path.display(), e))),
        }
    }

    /// Replace the configured keys with those from the environment, if any are set
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    fn apply_env_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        let keys = var(ENV_API_KEYS).map(|v| parse_keys(&v)).filter(|k| !k.is_empty()).or_else(|| {
            var(ENV_API_KEY).map(|v| parse_keys(&v)).filter(|k| !k.is_empty())
        });

        if let Some(keys) = keys {
            debug!("Using {} API keys from the environment", keys.len());
            self.gemini.api_keys = keys;
        }
    }
}

/// Split pasted key text on commas and newlines, dropping blanks
pub fn parse_keys(text: &str) -> Vec<String> {
    text.split([',', '\n', '\r']).map(str::trim).filter(|k| !k.is_empty()).map(String::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_partial_file_uses_defaults() {
        let settings = Settings::from_json(r#"{"pricing": {"discount_percent": 30, "rounding": "99"}}"#).unwrap();
        assert_eq!(settings.pricing.discount_percent, 30.0);
        assert_eq!(settings.pricing.rounding, RoundingMode::EndingIn99);
        assert_eq!(settings.pricing.target_currency, "USD");
        assert_eq!(settings.gemini.model, DEFAULT_MODEL);
        assert!(settings.gemini.auto_generate);
    }

    #[test]
    fn test_invalid_json() {
        let err = Settings::from_json("{ pricing: ").unwrap_err();
        assert!(matches!(err, AutofillError::Settings(_)));
    }

    #[test]
    fn test_pricing_config() {
        let pricing = PricingSettings { discount_percent: 50.0, extra_amount: 1.0, ..Default::default() };
        let config = pricing.pricing_config(2.0).unwrap();
        assert_eq!(config.discount_fraction, 0.5);
        assert_eq!(config.exchange_rate, 2.0);

        let too_much = PricingSettings { discount_percent: 100.0, ..Default::default() };
        assert!(too_much.pricing_config(1.0).is_err());
    }

    #[test]
    fn test_env_keys_override_file() {
        let mut settings = Settings::default();
        settings.gemini.api_keys = vec!["file-key".into()];

        let env: HashMap<&str, &str> = HashMap::from([(ENV_API_KEYS, "k1, k2\nk3,,"), (ENV_API_KEY, "single")]);
        settings.apply_env_from(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.gemini.api_keys, vec!["k1", "k2", "k3"]);

        let env: HashMap<&str, &str> = HashMap::from([(ENV_API_KEY, "single")]);
        settings.apply_env_from(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.gemini.api_keys, vec!["single"]);
    }

    #[test]
    fn test_no_env_keeps_file_keys() {
        let mut settings = Settings::default();
        settings.gemini.api_keys = vec!["file-key".into()];
        settings.apply_env_from(|_| None);
        assert_eq!(settings.gemini.api_keys, vec!["file-key"]);
    }

    #[test]
    fn test_sequencer_timings() {
        let settings = SequencerSettings { settle_ms: 6000, apply_attempts: 0, ..Default::default() };
        let timings = settings.timings();
        assert_eq!(timings.settle, Duration::from_secs(6));
        assert_eq!(timings.apply.max_attempts, 1);
        assert_eq!(timings.after_confirm, SequencerTimings::default().after_confirm);
    }

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let settings = Settings::load("/nonexistent/listing-autofill.json").await.unwrap();
        assert_eq!(settings, Settings::default());
    }
}
