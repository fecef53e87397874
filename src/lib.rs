//! # listing-autofill
//!
//! Spreadsheet-driven variation builder and AI listing autofill for the Etsy listing editor,
//! driven over the Chrome DevTools Protocol (CDP).
//!
//! ## Features
//!
//! - **Table detection**: split a raw spreadsheet grid into independent tables
//! - **Variation automation**: create variations through the editor's own modal, then price
//!   every generated row from the sheet
//! - **Pricing**: currency conversion, margin markup, flat extras and charm rounding
//! - **Generated content**: title and tags from a listing photo, with API-key rotation
//!
//! ## CLI
//!
//! ```bash
//! # Detect tables in an exported grid (JSON array of rows)
//! listing-autofill tables sheet.json
//!
//! # Create variations and fill prices in a running Chrome
//! listing-autofill --ws-endpoint ws://127.0.0.1:9222/devtools/browser/<id> \
//!     apply sheet.json --variant1 0 --variant2 1 --price 2
//!
//! # Watch the editor and generate title/tags for new uploads
//! GEMINI_API_KEYS=key1,key2 listing-autofill watch
//! ```
//!
//! ## Library Usage
//!
//! ```rust,no_run
//! use listing_autofill::{AutomationSequencer, BrowserSession, ColumnMapping, ConnectionOptions, Grid, PricingConfig};
//!
//! # async fn run() -> listing_autofill::Result<()> {
//! let grid: Grid = serde_json::from_str(r#"[["Size", "Price"], ["S", "10"], ["M", "12"]]"#).unwrap();
//! let table = listing_autofill::segment(&grid).into_iter().next().ok_or(listing_autofill::AutofillError::NoSourceTable)?;
//!
//! let session = BrowserSession::connect(ConnectionOptions::new("ws://127.0.0.1:9222/devtools/browser/id"))?;
//! let page = session.listing_tab()?;
//!
//! let mapping = ColumnMapping::new().variant1(0).price(1);
//! let report = AutomationSequencer::new(&page).run(&table, &mapping, &PricingConfig::default()).await?;
//! println!("{} rows priced", report.priced_rows());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! - [`grid`]: cells, grids, table segmentation, A1 addresses
//! - [`mapping`]: column roles, variation specs, variant-key price lookup
//! - [`pricing`]: price computation and exchange-rate sources
//! - [`host`]: host-page adapter traits, the Etsy adapter and the poll primitive
//! - [`automation`]: the variation sequencer
//! - [`content`]: key rotation, the generative API client and form filling
//! - [`page`]: per-page session state and the auto-generation controller
//! - [`browser`]: Chrome launch/connect
//! - [`config`]: operator settings
//! - [`error`]: error types and result aliases

pub mod automation;
pub mod browser;
pub mod config;
pub mod content;
pub mod error;
pub mod grid;
pub mod host;
pub mod mapping;
pub mod page;
pub mod pricing;

pub use automation::{AutomationReport, AutomationSequencer, RowOutcome, SequencerState, SequencerTimings};
pub use browser::{BrowserSession, ConnectionOptions, LaunchOptions};
pub use config::Settings;
pub use content::{
    ContentFillEngine, ContentGenerator, FillTarget, GeminiClient, GeneratedContent, ImageData, KeyRotationClient,
};
pub use error::{AutofillError, FailureKind, Result};
pub use grid::{Cell, CellAddress, Grid, Table, description_candidates, segment};
pub use host::{ContentHost, EtsyListingPage, PollPolicy, VariationHost, WaitOutcome, wait_until};
pub use mapping::{ColumnMapping, VariantKeyMatcher, VariationSpec};
pub use page::{PageController, PageMode, PageSession};
pub use pricing::{PricingConfig, RateSource, RoundingMode, compute_price, resolve_rate};
