use crate::browser::config::{ConnectionOptions, IDLE_TIMEOUT, LaunchOptions};
use crate::error::{AutofillError, Result};
use crate::host::EtsyListingPage;
use headless_chrome::{Browser, Tab};
use log::debug;
use std::{ffi::OsStr, sync::Arc};

/// Whether a URL points at an Etsy listing page or the listing editor
pub fn is_listing_url(url: &str) -> bool {
    url.contains("etsy.com") && (url.contains("/listing/") || url.contains("listings") || url.contains("listing-editor"))
}

/// A Chrome/Chromium instance hosting the Etsy shop manager
pub struct BrowserSession {
    browser: Browser,
}

impl BrowserSession {
    /// Launch a new browser instance with the given options
    pub fn launch(options: LaunchOptions) -> Result<Self> {
        let mut launch_opts = headless_chrome::LaunchOptions::default();

        // Etsy's bot checks look at the automation flag
        launch_opts.ignore_default_args.push(OsStr::new("--enable-automation"));
        launch_opts.args.push(OsStr::new("--disable-blink-features=AutomationControlled"));

        launch_opts.idle_browser_timeout = IDLE_TIMEOUT;

        launch_opts.headless = options.headless;
        launch_opts.window_size = Some((options.window_width, options.window_height));
        launch_opts.path = options.chrome_path;
        launch_opts.user_data_dir = options.user_data_dir;
        launch_opts.sandbox = options.sandbox;

        let browser = Browser::new(launch_opts).map_err(|e| AutofillError::LaunchFailed(e.to_string()))?;

        browser.new_tab().map_err(|e| AutofillError::LaunchFailed(format!("Failed to create tab: {}", e)))?;

        Ok(Self { browser })
    }

    /// Attach to a browser the operator already has open (started with `--remote-debugging-port`)
    pub fn connect(options: ConnectionOptions) -> Result<Self> {
        let browser = Browser::connect_with_timeout(options.ws_url, options.idle_timeout)
            .map_err(|e| AutofillError::ConnectionFailed(e.to_string()))?;

        Ok(Self { browser })
    }

    pub fn get_tabs(&self) -> Result<Vec<Arc<Tab>>> {
        let tabs = self
            .browser
            .get_tabs()
            .lock()
            .map_err(|e| AutofillError::TabOperationFailed(format!("Failed to get tabs: {}", e)))?
            .clone();

        Ok(tabs)
    }

    /// First tab showing an Etsy listing page
    pub fn listing_tab(&self) -> Result<EtsyListingPage> {
        for tab in self.get_tabs()? {
            let url = tab.get_url();
            debug!("Tab: {}", url);
            if is_listing_url(&url) {
                return Ok(EtsyListingPage::new(tab));
            }
        }

        Err(AutofillError::TabOperationFailed("No Etsy listing tab found".to_string()))
    }

    /// Open `url` in the first tab and wrap it as a listing page
    pub fn open_listing(&self, url: &str) -> Result<EtsyListingPage> {
        let tab = self
            .get_tabs()?
            .into_iter()
            .next()
            .ok_or_else(|| AutofillError::TabOperationFailed("Browser has no tabs".to_string()))?;

        tab.navigate_to(url)
            .map_err(|e| AutofillError::TabOperationFailed(format!("Failed to navigate to {}: {}", url, e)))?
            .wait_until_navigated()
            .map_err(|e| AutofillError::TabOperationFailed(format!("Navigation timeout: {}", e)))?;

        Ok(EtsyListingPage::new(tab))
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }
}
