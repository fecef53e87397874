//! Per-page-load state and the auto-generation controller

pub mod controller;

pub use controller::{PageController, PageTimings, PollOutcome};

use crate::host::ListingImage;
use log::{debug, info};
use std::collections::HashSet;

/// Which listing-editor flow the tab is in, derived from its URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageMode {
    Create,
    /// Copy of an existing listing; inherits the source listing's photos
    Copy,
    Edit,
    Other,
}

impl PageMode {
    pub fn from_url(url: &str) -> Self {
        if url.contains("/listing-editor/copy/") {
            PageMode::Copy
        } else if url.contains("/listing-editor/edit/") {
            PageMode::Edit
        } else if url.contains("/listing-editor/create") {
            PageMode::Create
        } else {
            PageMode::Other
        }
    }

    /// Copied listings start with the source listing's photos, which get deleted
    pub fn needs_cleanup(self) -> bool {
        self == PageMode::Copy
    }

    /// Edit pages only generate on request
    pub fn auto_generates(self) -> bool {
        self != PageMode::Edit
    }
}

/// Why an image did not trigger generation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    CleaningUp,
    EditMode,
    EmptySource,
    Placeholder,
    AnimatedGif,
    /// Still rendering as an upload preview
    NotFitted,
    AlreadyProcessed,
    /// Generation already ran once on this page load
    AlreadyRan,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageDecision {
    Generate,
    Skip(SkipReason),
}

/// Mutable state for one page load. Reset whenever navigation switches editor flows.
#[derive(Debug, Clone)]
pub struct PageSession {
    url: Option<String>,
    mode: PageMode,
    needs_setup: bool,
    is_cleaning_up: bool,
    has_auto_run: bool,
    processed_images: HashSet<String>,
    last_image_src: Option<String>,
}

impl Default for PageSession {
    fn default() -> Self {
        Self {
            url: None,
            mode: PageMode::Other,
            needs_setup: true,
            is_cleaning_up: false,
            has_auto_run: false,
            processed_images: HashSet::new(),
            last_image_src: None,
        }
    }
}

impl PageSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> PageMode {
        self.mode
    }

    pub fn is_cleaning_up(&self) -> bool {
        self.is_cleaning_up
    }

    pub fn has_auto_run(&self) -> bool {
        self.has_auto_run
    }

    pub fn last_image_src(&self) -> Option<&str> {
        self.last_image_src.as_deref()
    }

    /// Record the tab's current URL. Returns `true` when the session was reset.
    ///
    /// The first URL seen sets the mode. After that, only a change into a different
    /// listing-editor flow resets; moving to an unrelated URL keeps the state.
    pub fn observe_url(&mut self, url: &str) -> bool {
        let Some(previous) = self.url.as_deref() else {
            self.url = Some(url.to_string());
            self.mode = PageMode::from_url(url);
            info!("Page mode: {:?}", self.mode);
            return false;
        };
        if previous == url {
            return false;
        }

        let old_mode = PageMode::from_url(previous);
        let new_mode = PageMode::from_url(url);
        debug!("URL changed from {} to {}", previous, url);
        self.url = Some(url.to_string());

        if old_mode != new_mode && new_mode != PageMode::Other {
            info!("Mode changed: {:?} -> {:?}, resetting", old_mode, new_mode);
            self.reset(new_mode);
            return true;
        }
        false
    }

    fn reset(&mut self, mode: PageMode) {
        self.mode = mode;
        self.needs_setup = true;
        self.is_cleaning_up = false;
        self.has_auto_run = false;
        self.processed_images.clear();
        self.last_image_src = None;
    }

    /// Whether one-time setup (cleanup, fallback image) is still pending; clears the flag
    pub fn take_setup(&mut self) -> bool {
        std::mem::take(&mut self.needs_setup)
    }

    pub fn set_cleaning_up(&mut self, cleaning: bool) {
        self.is_cleaning_up = cleaning;
    }

    pub fn mark_auto_run(&mut self) {
        self.has_auto_run = true;
    }

    /// Remember an image for manual regeneration without treating it as processed
    pub fn remember_image(&mut self, src: &str) {
        if !src.is_empty() {
            self.last_image_src = Some(src.to_string());
        }
    }

    /// Record an image that was already on the page, so it never triggers generation
    pub fn mark_present(&mut self, src: &str) {
        if !src.is_empty() {
            self.processed_images.insert(src.to_string());
        }
    }

    /// Decide whether a newly seen listing image should trigger auto-generation
    pub fn consider_image(&mut self, image: &ListingImage) -> ImageDecision {
        use ImageDecision::Skip;

        if self.is_cleaning_up {
            return Skip(SkipReason::CleaningUp);
        }
        if !self.mode.auto_generates() {
            return Skip(SkipReason::EditMode);
        }

        let src = image.src.as_str();
        if src.is_empty() {
            return Skip(SkipReason::EmptySource);
        }
        if src.contains("placeholder") {
            return Skip(SkipReason::Placeholder);
        }
        if src.contains("data:image/gif") {
            return Skip(SkipReason::AnimatedGif);
        }
        if !image.fitted {
            return Skip(SkipReason::NotFitted);
        }
        if !self.processed_images.insert(src.to_string()) {
            return Skip(SkipReason::AlreadyProcessed);
        }

        self.last_image_src = Some(src.to_string());
        if self.has_auto_run {
            return Skip(SkipReason::AlreadyRan);
        }
        ImageDecision::Generate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(src: &str) -> ListingImage {
        ListingImage { src: src.to_string(), fitted: true }
    }

    fn session(url: &str) -> PageSession {
        let mut session = PageSession::new();
        session.observe_url(url);
        session
    }

    #[test]
    fn test_mode_from_url() {
        assert_eq!(PageMode::from_url("https://www.etsy.com/your/shops/me/listing-editor/copy/123"), PageMode::Copy);
        assert_eq!(PageMode::from_url("https://www.etsy.com/your/shops/me/listing-editor/edit/123"), PageMode::Edit);
        assert_eq!(PageMode::from_url("https://www.etsy.com/your/shops/me/listing-editor/create"), PageMode::Create);
        assert_eq!(PageMode::from_url("https://www.etsy.com/your/shops/me/tools/listings"), PageMode::Other);
    }

    #[test]
    fn test_first_image_generates_once() {
        let mut session = session("https://www.etsy.com/listing-editor/create");
        assert_eq!(session.consider_image(&image("https://i.etsystatic.com/1/il_1.jpg")), ImageDecision::Generate);
        session.mark_auto_run();

        assert_eq!(
            session.consider_image(&image("https://i.etsystatic.com/1/il_1.jpg")),
            ImageDecision::Skip(SkipReason::AlreadyProcessed)
        );
        assert_eq!(
            session.consider_image(&image("https://i.etsystatic.com/2/il_2.jpg")),
            ImageDecision::Skip(SkipReason::AlreadyRan)
        );
        assert_eq!(session.last_image_src(), Some("https://i.etsystatic.com/2/il_2.jpg"));
    }

    #[test]
    fn test_filters() {
        let mut session = session("https://www.etsy.com/listing-editor/create");
        assert_eq!(session.consider_image(&image("")), ImageDecision::Skip(SkipReason::EmptySource));
        assert_eq!(session.consider_image(&image("/img/placeholder.svg")), ImageDecision::Skip(SkipReason::Placeholder));
        assert_eq!(
            session.consider_image(&image("data:image/gif;base64,R0lG")),
            ImageDecision::Skip(SkipReason::AnimatedGif)
        );

        let preview = ListingImage { src: "blob:https://www.etsy.com/abc".into(), fitted: false };
        assert_eq!(session.consider_image(&preview), ImageDecision::Skip(SkipReason::NotFitted));

        session.set_cleaning_up(true);
        assert_eq!(session.consider_image(&image("https://x/1.jpg")), ImageDecision::Skip(SkipReason::CleaningUp));
    }

    #[test]
    fn test_edit_mode_never_auto_generates() {
        let mut session = session("https://www.etsy.com/listing-editor/edit/99");
        assert_eq!(session.consider_image(&image("https://x/1.jpg")), ImageDecision::Skip(SkipReason::EditMode));
    }

    #[test]
    fn test_navigation_resets_on_mode_change() {
        let mut session = session("https://www.etsy.com/listing-editor/copy/1");
        assert!(session.take_setup());
        session.consider_image(&image("https://x/1.jpg"));
        session.mark_auto_run();

        // Same flow, different listing: no reset
        assert!(!session.observe_url("https://www.etsy.com/listing-editor/copy/2"));
        // Leaving the editor keeps state
        assert!(!session.observe_url("https://www.etsy.com/your/shops/me/tools/listings"));
        assert!(session.has_auto_run());

        assert!(session.observe_url("https://www.etsy.com/listing-editor/create"));
        assert_eq!(session.mode(), PageMode::Create);
        assert!(!session.has_auto_run());
        assert_eq!(session.last_image_src(), None);
        assert!(session.take_setup());
        assert!(!session.take_setup());
        assert_eq!(session.consider_image(&image("https://x/1.jpg")), ImageDecision::Generate);
    }

    #[test]
    fn test_present_images_are_not_uploads() {
        let mut session = session("https://www.etsy.com/listing-editor/copy/1");
        session.mark_present("https://x/inherited.jpg");
        session.mark_present("");

        assert_eq!(
            session.consider_image(&image("https://x/inherited.jpg")),
            ImageDecision::Skip(SkipReason::AlreadyProcessed)
        );
        assert_eq!(session.last_image_src(), None);
        assert_eq!(session.consider_image(&image("https://x/new.jpg")), ImageDecision::Generate);
    }
}
