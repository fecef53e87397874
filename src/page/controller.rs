use super::{ImageDecision, PageMode, PageSession};
use crate::content::{ContentFillEngine, ContentGenerator, FillReport, FillTarget, FillTimings};
use crate::error::{AutofillError, Result};
use crate::host::ContentHost;
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTimings {
    /// Wait for a copied listing to render before deleting its photos
    pub before_cleanup: Duration,
    /// Mutations caused by the cleanup are ignored for this long afterwards
    pub after_cleanup: Duration,
    /// Wait for a new upload to finish rendering before reading it
    pub image_settle: Duration,
    pub fill: FillTimings,
}

impl Default for PageTimings {
    fn default() -> Self {
        Self {
            before_cleanup: Duration::from_millis(1500),
            after_cleanup: Duration::from_millis(1000),
            image_settle: Duration::from_millis(1300),
            fill: FillTimings::default(),
        }
    }
}

impl PageTimings {
    pub fn immediate() -> Self {
        Self {
            before_cleanup: Duration::ZERO,
            after_cleanup: Duration::ZERO,
            image_settle: Duration::ZERO,
            fill: FillTimings::immediate(),
        }
    }
}

/// What one [`PageController::poll`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    /// Navigation into another editor flow reset the session
    pub reset: bool,
    /// Inherited photos deleted by the copy-listing cleanup
    pub images_deleted: Option<usize>,
    pub generated: Option<FillReport>,
}

/// Watches one listing-editor tab and generates title and tags for the first upload.
///
/// Owns the [`PageSession`] for the page load; `&mut self` keeps polls and manual
/// regenerations from interleaving.
pub struct PageController<'h, H: ContentHost + ?Sized> {
    host: &'h H,
    generator: ContentGenerator,
    auto_generate: bool,
    timings: PageTimings,
    session: PageSession,
}

impl<'h, H: ContentHost + ?Sized> PageController<'h, H> {
    pub fn new(host: &'h H, generator: ContentGenerator) -> Self {
        Self { host, generator, auto_generate: true, timings: PageTimings::default(), session: PageSession::new() }
    }

    pub fn auto_generate(mut self, enabled: bool) -> Self {
        self.auto_generate = enabled;
        self
    }

    pub fn with_timings(mut self, timings: PageTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn session(&self) -> &PageSession {
        &self.session
    }

    /// One observation pass: navigation check, one-time setup, then new images
    pub async fn poll(&mut self) -> Result<PollOutcome> {
        let mut outcome = PollOutcome::default();

        let url = self.host.current_url().await?;
        outcome.reset = self.session.observe_url(&url);

        if self.session.take_setup() {
            outcome.images_deleted = self.setup().await?;
            self.baseline_images().await?;
        }

        if !self.session.mode().auto_generates() {
            return Ok(outcome);
        }

        for image in self.host.listing_images().await? {
            match self.session.consider_image(&image) {
                ImageDecision::Generate => {}
                ImageDecision::Skip(reason) => {
                    debug!("Image skipped ({:?}): {}", reason, short(&image.src));
                    continue;
                }
            }

            if !self.auto_generate || !self.generator.has_credentials() {
                debug!("Auto-generate disabled or no API key");
                continue;
            }

            info!("New image detected in {:?} mode", self.session.mode());
            self.session.mark_auto_run();
            sleep(self.timings.image_settle).await;
            outcome.generated = Some(self.generate_and_fill(&image.src, FillTarget::All).await?);
            break;
        }

        Ok(outcome)
    }

    /// Regenerate from the most recent listing image, whatever the page mode
    pub async fn regenerate(&mut self, target: FillTarget) -> Result<FillReport> {
        let src = match self.session.last_image_src() {
            Some(src) => src.to_string(),
            None => {
                let images = self.host.listing_images().await?;
                let first = images.into_iter().find(|i| !i.src.is_empty()).ok_or(AutofillError::NoImageData)?;
                self.session.remember_image(&first.src);
                first.src
            }
        };

        info!("Regenerating {:?}", target);
        self.generate_and_fill(&src, target).await
    }

    async fn setup(&mut self) -> Result<Option<usize>> {
        match self.session.mode() {
            PageMode::Copy => {
                info!("Copy mode: deleting inherited images");
                self.session.set_cleaning_up(true);
                sleep(self.timings.before_cleanup).await;

                let deleted = self.host.delete_listing_images().await;
                sleep(self.timings.after_cleanup).await;
                self.session.set_cleaning_up(false);

                let deleted = deleted?;
                if deleted == 0 {
                    warn!("No images deleted");
                } else {
                    info!("Cleared {} old images", deleted);
                }
                Ok(Some(deleted))
            }
            PageMode::Edit => {
                if let Some(first) = self.host.listing_images().await?.first() {
                    debug!("Edit mode: existing image {}", short(&first.src));
                    self.session.remember_image(&first.src);
                }
                Ok(None)
            }
            PageMode::Create | PageMode::Other => Ok(None),
        }
    }

    /// Images still on the page after setup were not uploaded during this page load
    async fn baseline_images(&mut self) -> Result<()> {
        let images = self.host.listing_images().await?;
        for image in &images {
            self.session.mark_present(&image.src);
        }
        if !images.is_empty() {
            debug!("{} images already on the page", images.len());
        }
        Ok(())
    }

    async fn generate_and_fill(&mut self, src: &str, target: FillTarget) -> Result<FillReport> {
        let image = self.host.read_image(src).await?.ok_or(AutofillError::NoImageData)?;
        let rotation = self.generator.generate(&image).await?;

        ContentFillEngine::new(self.host).with_timings(self.timings.fill).apply(&rotation.value, target).await
    }
}

fn short(src: &str) -> &str {
    match src.char_indices().nth(50) {
        Some((i, _)) => &src[..i],
        None => src,
    }
}
