//! Price conversion and exchange-rate lookup

pub mod engine;
pub mod rates;

pub use engine::{PricingConfig, RoundingMode, compute_price};
pub use rates::{FallbackRates, FixedRate, OpenExchangeRates, RateSource, WiseRates, resolve_rate};
