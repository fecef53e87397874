use crate::error::{AutofillError, Result};
use async_trait::async_trait;
use log::{info, warn};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

const WISE_BASE_URL: &str = "https://api.wise.com";
const OPEN_ER_BASE_URL: &str = "https://open.er-api.com";

/// Source of USD-to-target exchange rates
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Short name used in logs and status messages
    fn name(&self) -> &str;

    /// Rate that converts one USD into `target`
    async fn usd_rate(&self, target: &str) -> Result<f64>;
}

/// A rate that never changes
#[derive(Debug, Clone, Copy)]
pub struct FixedRate(pub f64);

#[async_trait]
impl RateSource for FixedRate {
    fn name(&self) -> &str {
        "Fixed"
    }

    async fn usd_rate(&self, _target: &str) -> Result<f64> {
        Ok(self.0)
    }
}

#[derive(Debug, Deserialize)]
struct WiseRate {
    rate: f64,
}

/// Public Wise rates endpoint
pub struct WiseRates {
    client: Client,
    base_url: String,
}

impl WiseRates {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, WISE_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl RateSource for WiseRates {
    fn name(&self) -> &str {
        "Wise"
    }

    async fn usd_rate(&self, target: &str) -> Result<f64> {
        let url = format!("{}/v1/rates?source=USD&target={}", self.base_url, target);
        let response = self.client.get(&url).header("Content-Type", "application/json").send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutofillError::RateUnavailable(format!("Wise API Error: {}", status.as_u16())));
        }

        let rates: Vec<WiseRate> = response.json().await?;
        rates
            .first()
            .map(|r| r.rate)
            .ok_or_else(|| AutofillError::RateUnavailable("Wise Empty Data".to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct OpenErLatest {
    #[serde(default)]
    rates: HashMap<String, f64>,
}

/// open.er-api.com latest USD table
pub struct OpenExchangeRates {
    client: Client,
    base_url: String,
}

impl OpenExchangeRates {
    pub fn new(client: Client) -> Self {
        Self::with_base_url(client, OPEN_ER_BASE_URL)
    }

    pub fn with_base_url(client: Client, base_url: impl Into<String>) -> Self {
        Self { client, base_url: base_url.into() }
    }
}

#[async_trait]
impl RateSource for OpenExchangeRates {
    fn name(&self) -> &str {
        "OpenAPI (Fallback)"
    }

    async fn usd_rate(&self, target: &str) -> Result<f64> {
        let url = format!("{}/v6/latest/USD", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AutofillError::RateUnavailable(format!("open.er-api error: {}", status.as_u16())));
        }

        let latest: OpenErLatest = response.json().await?;
        latest
            .rates
            .get(target)
            .copied()
            .ok_or_else(|| AutofillError::RateUnavailable(format!("No rate for {}", target)))
    }
}

/// Ask the preferred source first and fall back to the second one on any failure
pub struct FallbackRates<P, F> {
    preferred: P,
    fallback: F,
}

impl<P: RateSource, F: RateSource> FallbackRates<P, F> {
    pub fn new(preferred: P, fallback: F) -> Self {
        Self { preferred, fallback }
    }
}

impl FallbackRates<WiseRates, OpenExchangeRates> {
    /// Wise with open.er-api as the fallback, sharing one HTTP client
    pub fn public(client: Client) -> Self {
        Self::new(WiseRates::new(client.clone()), OpenExchangeRates::new(client))
    }
}

#[async_trait]
impl<P: RateSource, F: RateSource> RateSource for FallbackRates<P, F> {
    fn name(&self) -> &str {
        self.preferred.name()
    }

    async fn usd_rate(&self, target: &str) -> Result<f64> {
        match self.preferred.usd_rate(target).await {
            Ok(rate) => Ok(rate),
            Err(e) => {
                warn!("{} failed ({}), falling back to {}", self.preferred.name(), e, self.fallback.name());
                self.fallback.usd_rate(target).await
            }
        }
    }
}

/// Pick the exchange rate for a run.
///
/// A positive manual rate always wins; USD needs no lookup; otherwise the source is asked.
pub async fn resolve_rate(source: &dyn RateSource, target_currency: &str, manual_rate: Option<f64>) -> Result<f64> {
    if let Some(rate) = manual_rate.filter(|r| r.is_finite() && *r > 0.0) {
        info!("Using manual rate: {}", rate);
        return Ok(rate);
    }

    if target_currency.eq_ignore_ascii_case("USD") {
        return Ok(1.0);
    }

    let rate = source.usd_rate(target_currency).await?;
    if !rate.is_finite() || rate <= 0.0 {
        return Err(AutofillError::RateUnavailable(format!("{} returned rate {}", source.name(), rate)));
    }

    info!("Rate USD -> {}: {} ({})", target_currency, rate, source.name());
    Ok(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    #[async_trait]
    impl RateSource for Failing {
        fn name(&self) -> &str {
            "Failing"
        }

        async fn usd_rate(&self, _target: &str) -> Result<f64> {
            Err(AutofillError::RateUnavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_fallback_used_on_failure() {
        let rates = FallbackRates::new(Failing, FixedRate(1.63));
        assert_eq!(rates.usd_rate("NZD").await.unwrap(), 1.63);
    }

    #[tokio::test]
    async fn test_manual_rate_wins() {
        let rate = resolve_rate(&Failing, "EUR", Some(0.9)).await.unwrap();
        assert_eq!(rate, 0.9);
    }

    #[tokio::test]
    async fn test_usd_needs_no_lookup() {
        let rate = resolve_rate(&Failing, "usd", None).await.unwrap();
        assert_eq!(rate, 1.0);
    }

    #[tokio::test]
    async fn test_non_positive_manual_rate_is_ignored() {
        let rate = resolve_rate(&FixedRate(1.2), "EUR", Some(0.0)).await.unwrap();
        assert_eq!(rate, 1.2);
        assert!(resolve_rate(&FixedRate(-1.0), "EUR", None).await.is_err());
    }
}
