//! Host page adapter interface
//!
//! The listing editor is a third-party page with no automation API. Everything the
//! sequencer and the content filler need from it is expressed as capability methods on
//! two traits, so the state machines stay testable against in-memory fakes:
//! - [`VariationHost`]: variation modal, "prices vary", Apply, variant table rows
//! - [`ContentHost`]: title, tag chips, listing images
//!
//! Lookup misses are reported as `Ok(false)` / `Ok(None)` / `NotFound`; only transport
//! failures (the browser went away, a script threw) are `Err`.

pub mod etsy;
pub mod wait;

pub use etsy::EtsyListingPage;
pub use wait::{PollPolicy, WaitOutcome, wait_until};

use crate::content::ImageData;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A row of the variant table rendered by the host page after Apply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantRow {
    /// Position of the row in the rendered table
    pub index: usize,
    pub variant1: Option<String>,
    pub variant2: Option<String>,
    #[serde(default)]
    pub has_price_input: bool,
    /// State of the row's visibility switch, `None` if the row has none
    #[serde(default)]
    pub visible: Option<bool>,
}

impl VariantRow {
    /// "v1 / v2" label used in logs and reports
    pub fn label(&self) -> String {
        match (&self.variant1, &self.variant2) {
            (Some(a), Some(b)) => format!("{} / {}", a, b),
            (Some(a), None) => a.clone(),
            (None, Some(b)) => b.clone(),
            (None, None) => String::new(),
        }
    }
}

/// Result of flipping a toggle that may already be on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToggleOutcome {
    Enabled,
    AlreadyOn,
    NotFound,
}

/// An image element inside the listing photo upload area
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingImage {
    pub src: String,
    /// Whether the host rendered it as a finished listing photo (not an upload placeholder)
    #[serde(default)]
    pub fitted: bool,
}

/// Capabilities used by the variation sequencer
#[async_trait]
pub trait VariationHost: Send + Sync {
    /// Click "Add variations" (first dimension) or "Add a variation" (later ones)
    async fn open_variation_modal(&self, dimension: usize) -> Result<bool>;

    /// Click "Create your own" inside the open modal
    async fn choose_custom_option(&self) -> Result<bool>;

    /// Set the variation name and fire the events the host framework listens for
    async fn set_variation_name(&self, name: &str) -> Result<bool>;

    async fn set_option_input(&self, value: &str) -> Result<bool>;

    /// Click the "Add" control next to the option input
    async fn click_add_option(&self) -> Result<bool>;

    /// Synthesise Enter on the option input
    async fn submit_option_with_enter(&self) -> Result<bool>;

    /// Click "Done" in the modal that owns the variation name input
    async fn confirm_variation_modal(&self) -> Result<bool>;

    async fn enable_prices_vary(&self) -> Result<ToggleOutcome>;

    /// Click "Apply" in the "Manage variations" modal, clearing any disabled state first
    async fn click_apply(&self) -> Result<bool>;

    async fn variant_rows(&self) -> Result<Vec<VariantRow>>;

    /// Write a price into a row and return the value the field now displays
    async fn fill_row_price(&self, row: usize, price: &str) -> Result<Option<String>>;

    async fn set_row_visibility(&self, row: usize, visible: bool) -> Result<bool>;

    /// Price field of a listing without variations
    async fn fill_listing_price(&self, price: &str) -> Result<bool>;

    async fn fill_description(&self, text: &str) -> Result<bool>;
}

/// Capabilities used by the content filler and the page controller
#[async_trait]
pub trait ContentHost: Send + Sync {
    async fn current_url(&self) -> Result<String>;

    async fn set_title(&self, title: &str) -> Result<bool>;

    /// Whether both the tag input and its add control are on the page
    async fn has_tag_controls(&self) -> Result<bool>;

    /// Click every visible "Delete tag" control once; returns how many were found
    async fn delete_tag_chips(&self) -> Result<usize>;

    /// Put the joined tag string into the tag input; `false` if the input or its add control is missing
    async fn set_tag_input(&self, joined: &str) -> Result<bool>;

    async fn click_add_tags(&self) -> Result<bool>;

    async fn listing_images(&self) -> Result<Vec<ListingImage>>;

    /// Encoded bytes of a rendered listing image
    async fn read_image(&self, src: &str) -> Result<Option<ImageData>>;

    /// Delete inherited listing photos (copied listings); returns how many were deleted
    async fn delete_listing_images(&self) -> Result<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_label() {
        let row = VariantRow {
            index: 0,
            variant1: Some("Red".into()),
            variant2: Some("L".into()),
            has_price_input: true,
            visible: Some(true),
        };
        assert_eq!(row.label(), "Red / L");
    }

    #[test]
    fn test_row_deserialize_defaults() {
        let row: VariantRow = serde_json::from_str(r#"{"index":2,"variant1":"S","variant2":null}"#).unwrap();
        assert_eq!(row.index, 2);
        assert!(!row.has_price_input);
        assert_eq!(row.visible, None);
    }
}
