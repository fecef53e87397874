use crate::content::ImageData;
use crate::error::{AutofillError, Result};
use crate::host::{ContentHost, ListingImage, ToggleOutcome, VariantRow, VariationHost};
use async_trait::async_trait;
use headless_chrome::Tab;
use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const HELPERS: &str = include_str!("etsy_helpers.js");

const OPEN_VARIATION_MODAL: &str = r#"
const label = args.dimension === 0 ? 'Add variations' : 'Add a variation';
const btn = buttonsWithText(document, label, false)[0];
if (!btn) return false;
btn.click();
return true;
"#;

const CHOOSE_CUSTOM_OPTION: &str = r#"
const btn = buttonsWithText(document, 'Create your own', false)[0];
if (!btn) return false;
btn.click();
return true;
"#;

const SET_BY_ID: &str = r#"
const el = document.getElementById(args.id);
if (!el) return false;
setFieldValue(el, args.value);
return true;
"#;

const CLICK_ADD_OPTION: &str = r#"
const input = document.getElementById('le-unstructured-variation-option-input');
if (!input) return false;
let btn = input.parentElement ? input.parentElement.querySelector('button') : null;
if (!btn) {
  btn = Array.from(document.querySelectorAll('button.wt-btn--transparent'))
    .find(b => b.textContent.trim() === 'Add' && !b.disabled) || null;
}
if (!btn) return false;
btn.click();
return true;
"#;

const SUBMIT_OPTION_WITH_ENTER: &str = r#"
const input = document.getElementById('le-unstructured-variation-option-input');
if (!input) return false;
input.dispatchEvent(new KeyboardEvent('keydown', { key: 'Enter', code: 'Enter', keyCode: 13, bubbles: true }));
return true;
"#;

const CONFIRM_VARIATION_MODAL: &str = r#"
let btn = null;
const modal = activeVariationModal();
if (modal) {
  btn = Array.from(modal.querySelectorAll('button.wt-btn--filled')).find(b => b.textContent.trim() === 'Done') || null;
}
if (!btn) {
  for (const footer of document.querySelectorAll('.wt-overlay__footer__action')) {
    const candidate = footer.querySelector('button.wt-btn--filled');
    if (candidate && candidate.textContent.trim() === 'Done') { btn = candidate; break; }
  }
}
if (!btn) return false;
btn.click();
return true;
"#;

const ENABLE_PRICES_VARY: &str = r#"
const label = Array.from(document.querySelectorAll('label')).find(l => l.textContent.includes('Prices vary'));
if (!label) return 'not_found';
const checkbox = document.getElementById(label.getAttribute('for'));
if (!checkbox) return 'not_found';
if (checkbox.checked) return 'already_on';
checkbox.click();
return 'enabled';
"#;

const CLICK_APPLY: &str = r#"
let target = null;
const header = Array.from(document.querySelectorAll('.wt-text-title-larger'))
  .find(h => h.textContent.trim() === args.title);
if (header) {
  const modal = header.closest('.wt-overlay__modal');
  const footer = modal ? modal.querySelector('.wt-overlay__footer__action') : null;
  const btn = footer ? footer.querySelector('button.wt-btn--filled') : null;
  if (btn && btn.textContent.trim() === 'Apply') target = btn;
}
if (!target) {
  for (const footer of document.querySelectorAll('.wt-overlay__footer__action')) {
    const btn = footer.querySelector('button.wt-btn--filled');
    if (btn && btn.textContent.trim() === 'Apply' && btn.offsetParent !== null) { target = btn; break; }
  }
}
if (!target) return false;
target.disabled = false;
target.removeAttribute('aria-disabled');
target.scrollIntoView({ block: 'center' });
target.click();
return true;
"#;

const VARIANT_ROWS: &str = r#"
return variantTableRows().map((row, index) => {
  const cells = Array.from(row.querySelectorAll('th, td')).filter(c =>
    c.textContent.trim() &&
    !c.querySelector('input') &&
    !c.querySelector('.wt-checkbox') &&
    !c.querySelector('button') &&
    c.className.includes('wt-no-wrap'));
  const toggle = row.querySelector('input[type="checkbox"].wt-switch');
  return {
    index,
    variant1: cells.length >= 1 ? cells[0].textContent.trim() : null,
    variant2: cells.length >= 2 ? cells[1].textContent.trim() : null,
    has_price_input: row.querySelector('input[data-testid="price-input"]') !== null,
    visible: toggle ? toggle.checked : null,
  };
});
"#;

const FILL_ROW_PRICE: &str = r#"
const row = variantTableRows()[args.row];
const input = row ? row.querySelector('input[data-testid="price-input"]') : null;
if (!input) return null;
setFieldValue(input, args.price);
return input.value;
"#;

const SET_ROW_VISIBILITY: &str = r#"
const row = variantTableRows()[args.row];
const toggle = row ? row.querySelector('input[type="checkbox"].wt-switch') : null;
if (!toggle) return false;
if (toggle.checked !== args.visible) toggle.click();
return true;
"#;

const FILL_LISTING_PRICE: &str = r#"
const input = document.getElementById('listing-price-input') ||
  document.querySelector('input[name="variations.configuration.price"]');
if (!input) return false;
setFieldValue(input, args.price);
return true;
"#;

const CURRENT_URL: &str = r#"
return window.location.href;
"#;

const DELETE_TAG_CHIPS: &str = r#"
const root = tagSearchRoot();
if (!root) return 0;
const buttons = Array.from(root.querySelectorAll('button[aria-label^="Delete tag"]'));
buttons.forEach(b => b.click());
return buttons.length;
"#;

const HAS_TAG_CONTROLS: &str = r#"
return document.getElementById('listing-tags-input') !== null &&
  document.getElementById('listing-tags-button') !== null;
"#;

const SET_TAG_INPUT: &str = r#"
const input = document.getElementById('listing-tags-input');
const add = document.getElementById('listing-tags-button');
if (!input || !add) return false;
setFieldValue(input, args.value);
input.focus();
return true;
"#;

const CLICK_ADD_TAGS: &str = r#"
const add = document.getElementById('listing-tags-button');
if (!add) return false;
add.click();
return true;
"#;

const LISTING_IMAGES: &str = r#"
return Array.from(document.querySelectorAll('[data-clg-id="WtUploadArea"] img')).map(img => ({
  src: img.src || '',
  fitted: img.classList.contains('wt-object-fit-contain'),
}));
"#;

const READ_IMAGE: &str = r#"
const ready = img => img.complete && img.naturalWidth > 0;
const all = Array.from(document.querySelectorAll('img'));
const idMatch = args.src.match(/\/(\d+)\//) || args.src.match(/il_[a-z0-9]+\.(\d+)_/);
const imageId = idMatch ? idMatch[1] : null;
const base = args.src.split('?')[0];
const img = all.find(i => i.src === args.src && ready(i)) ||
  (imageId ? all.find(i => i.src.includes(imageId) && ready(i)) : null) ||
  all.find(i => i.src.split('?')[0] === base && ready(i));
if (!img) return null;
try {
  const canvas = document.createElement('canvas');
  canvas.width = img.naturalWidth || img.width;
  canvas.height = img.naturalHeight || img.height;
  if (canvas.width === 0 || canvas.height === 0) return null;
  canvas.getContext('2d').drawImage(img, 0, 0);
  const url = canvas.toDataURL('image/jpeg', 0.9);
  return { mime_type: 'image/jpeg', data: url.split(',')[1] };
} catch (e) {
  return null;
}
"#;

const DELETE_LISTING_IMAGES: &str = r#"
const items = Array.from(document.querySelectorAll(
  '[data-clg-id="WtUploadArea"] .le-media-grid__item, [data-clg-id="WtUploadArea"] > div > div > div[role="button"]'));
let deleted = 0;
for (const item of items) {
  if (item.querySelector('video') || !item.querySelector('img')) continue;
  const btn = Array.from(item.querySelectorAll('button')).find(b => {
    if (b.getAttribute('data-testid') === 'image-delete-button') return true;
    if (b.querySelector('path[d^="M15 4H9V2h6"]')) return true;
    const aria = b.getAttribute('aria-label');
    if (aria && aria.toLowerCase().includes('delete')) return true;
    return b.classList.contains('wt-text-brick') && b.querySelector('svg') !== null;
  });
  if (btn) { btn.click(); deleted++; }
}
return deleted;
"#;

/// Host adapter for the Etsy listing editor, driven through a Chrome tab
pub struct EtsyListingPage {
    tab: Arc<Tab>,
}

impl EtsyListingPage {
    /// Heading of the modal that owns the Apply button
    pub const MANAGE_VARIATIONS_TITLE: &'static str = "Manage variations";

    pub fn new(tab: Arc<Tab>) -> Self {
        Self { tab }
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// Run a page script with `args` in scope and decode its JSON result
    fn run<T: DeserializeOwned>(&self, name: &str, body: &str, args: Value) -> Result<T> {
        let script = format!(
            "(function() {{\nconst args = {};\n{}\nconst result = (function() {{\n{}\n}})();\nreturn JSON.stringify(result === undefined ? null : result);\n}})()",
            args, HELPERS, body
        );

        let result = self
            .tab
            .evaluate(&script, false)
            .map_err(|e| AutofillError::EvaluationFailed(format!("{}: {}", name, e)))?;

        let value = result
            .value
            .ok_or_else(|| AutofillError::ScriptResult(format!("{}: no value returned", name)))?;

        // The script returns a JSON string, so decode it as a string first
        let json_str: String = serde_json::from_value(value)
            .map_err(|e| AutofillError::ScriptResult(format!("{}: expected a JSON string: {}", name, e)))?;

        debug!("{} -> {}", name, json_str);

        serde_json::from_str(&json_str).map_err(|e| AutofillError::ScriptResult(format!("{}: {}", name, e)))
    }

    fn set_by_id(&self, id: &str, value: &str) -> Result<bool> {
        self.run("set_by_id", SET_BY_ID, json!({ "id": id, "value": value }))
    }
}

#[async_trait]
impl VariationHost for EtsyListingPage {
    async fn open_variation_modal(&self, dimension: usize) -> Result<bool> {
        self.run("open_variation_modal", OPEN_VARIATION_MODAL, json!({ "dimension": dimension }))
    }

    async fn choose_custom_option(&self) -> Result<bool> {
        self.run("choose_custom_option", CHOOSE_CUSTOM_OPTION, json!({}))
    }

    async fn set_variation_name(&self, name: &str) -> Result<bool> {
        self.set_by_id("le-unstructured-variation-name-input", name)
    }

    async fn set_option_input(&self, value: &str) -> Result<bool> {
        self.set_by_id("le-unstructured-variation-option-input", value)
    }

    async fn click_add_option(&self) -> Result<bool> {
        self.run("click_add_option", CLICK_ADD_OPTION, json!({}))
    }

    async fn submit_option_with_enter(&self) -> Result<bool> {
        self.run("submit_option_with_enter", SUBMIT_OPTION_WITH_ENTER, json!({}))
    }

    async fn confirm_variation_modal(&self) -> Result<bool> {
        self.run("confirm_variation_modal", CONFIRM_VARIATION_MODAL, json!({}))
    }

    async fn enable_prices_vary(&self) -> Result<ToggleOutcome> {
        self.run("enable_prices_vary", ENABLE_PRICES_VARY, json!({}))
    }

    async fn click_apply(&self) -> Result<bool> {
        self.run("click_apply", CLICK_APPLY, json!({ "title": Self::MANAGE_VARIATIONS_TITLE }))
    }

    async fn variant_rows(&self) -> Result<Vec<VariantRow>> {
        self.run("variant_rows", VARIANT_ROWS, json!({}))
    }

    async fn fill_row_price(&self, row: usize, price: &str) -> Result<Option<String>> {
        self.run("fill_row_price", FILL_ROW_PRICE, json!({ "row": row, "price": price }))
    }

    async fn set_row_visibility(&self, row: usize, visible: bool) -> Result<bool> {
        self.run("set_row_visibility", SET_ROW_VISIBILITY, json!({ "row": row, "visible": visible }))
    }

    async fn fill_listing_price(&self, price: &str) -> Result<bool> {
        self.run("fill_listing_price", FILL_LISTING_PRICE, json!({ "price": price }))
    }

    async fn fill_description(&self, text: &str) -> Result<bool> {
        self.set_by_id("listing-description-textarea", text)
    }
}

#[async_trait]
impl ContentHost for EtsyListingPage {
    async fn current_url(&self) -> Result<String> {
        self.run("current_url", CURRENT_URL, json!({}))
    }

    async fn set_title(&self, title: &str) -> Result<bool> {
        self.set_by_id("listing-title-input", title)
    }

    async fn has_tag_controls(&self) -> Result<bool> {
        self.run("has_tag_controls", HAS_TAG_CONTROLS, json!({}))
    }

    async fn delete_tag_chips(&self) -> Result<usize> {
        self.run("delete_tag_chips", DELETE_TAG_CHIPS, json!({}))
    }

    async fn set_tag_input(&self, joined: &str) -> Result<bool> {
        self.run("set_tag_input", SET_TAG_INPUT, json!({ "value": joined }))
    }

    async fn click_add_tags(&self) -> Result<bool> {
        self.run("click_add_tags", CLICK_ADD_TAGS, json!({}))
    }

    async fn listing_images(&self) -> Result<Vec<ListingImage>> {
        self.run("listing_images", LISTING_IMAGES, json!({}))
    }

    async fn read_image(&self, src: &str) -> Result<Option<ImageData>> {
        self.run("read_image", READ_IMAGE, json!({ "src": src }))
    }

    async fn delete_listing_images(&self) -> Result<usize> {
        self.run("delete_listing_images", DELETE_LISTING_IMAGES, json!({}))
    }
}
