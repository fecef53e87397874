use super::gemini::GeneratedContent;
use crate::error::Result;
use crate::host::{ContentHost, PollPolicy, WaitOutcome, wait_until};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

/// Which fields a fill (or a regeneration) touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FillTarget {
    Title,
    Tags,
    #[default]
    All,
}

impl FillTarget {
    pub fn includes_title(self) -> bool {
        self != FillTarget::Tags
    }

    pub fn includes_tags(self) -> bool {
        self != FillTarget::Title
    }
}

impl std::str::FromStr for FillTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "title" => Ok(FillTarget::Title),
            "tags" => Ok(FillTarget::Tags),
            "all" => Ok(FillTarget::All),
            other => Err(format!("unknown fill target '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FillTimings {
    /// Bound on the delete-all-chips loop
    pub chip_clear: PollPolicy,
    /// Pause after the chips are gone
    pub after_clear: Duration,
    /// Pause between filling the tag input and clicking its add control
    pub before_add_tags: Duration,
}

impl Default for FillTimings {
    fn default() -> Self {
        Self {
            chip_clear: PollPolicy::new(20, Duration::from_millis(100)),
            after_clear: Duration::from_millis(50),
            before_add_tags: Duration::from_millis(500),
        }
    }
}

impl FillTimings {
    pub fn immediate() -> Self {
        Self { chip_clear: PollPolicy::new(20, Duration::ZERO), after_clear: Duration::ZERO, before_add_tags: Duration::ZERO }
    }
}

/// What a fill actually changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    pub title_set: bool,
    pub chips_deleted: usize,
    /// Whether chip deletion converged to zero chips within the attempt bound
    pub chips_cleared: bool,
    pub tags_added: bool,
}

/// Writes generated title and tags into the listing form
pub struct ContentFillEngine<'a, H: ContentHost + ?Sized> {
    host: &'a H,
    timings: FillTimings,
}

impl<'a, H: ContentHost + ?Sized> ContentFillEngine<'a, H> {
    pub fn new(host: &'a H) -> Self {
        Self { host, timings: FillTimings::default() }
    }

    pub fn with_timings(mut self, timings: FillTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Replace the title and/or the tag set with `content`.
    ///
    /// Existing tag chips are all deleted before the new tags are added, so repeating the
    /// call converges on the same final fields. Without a tag input nothing is deleted.
    pub async fn apply(&self, content: &GeneratedContent, target: FillTarget) -> Result<FillReport> {
        let mut report = FillReport::default();

        if target.includes_title() {
            match content.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
                Some(title) => {
                    report.title_set = self.host.set_title(title).await?;
                    if report.title_set {
                        info!("Title updated");
                    } else {
                        warn!("Title field not found");
                    }
                }
                None => debug!("No title in generated content"),
            }
        }

        if target.includes_tags() && !content.tags.is_empty() {
            self.replace_tags(&content.tags, &mut report).await?;
        }

        Ok(report)
    }

    async fn replace_tags(&self, tags: &[String], report: &mut FillReport) -> Result<()> {
        // existing tags stay put unless the new ones can be added
        if !self.host.has_tag_controls().await? {
            warn!("Tag input not found, tags skipped");
            return Ok(());
        }

        let deleted = AtomicUsize::new(0);
        let outcome = wait_until(
            |_| {
                let deleted = &deleted;
                async move {
                    match self.host.delete_tag_chips().await {
                        Ok(0) => Some(Ok(())),
                        Ok(n) => {
                            debug!("Deleting {} tag chips", n);
                            deleted.fetch_add(n, Ordering::Relaxed);
                            None
                        }
                        Err(e) => Some(Err(e)),
                    }
                }
            },
            self.timings.chip_clear,
        )
        .await;

        report.chips_deleted = deleted.load(Ordering::Relaxed);
        report.chips_cleared = outcome.is_ready();
        match outcome {
            WaitOutcome::Ready { value, .. } => value?,
            WaitOutcome::TimedOut { attempts } => warn!("Tag chips still present after {} rounds", attempts),
        }
        sleep(self.timings.after_clear).await;

        let joined = tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()).collect::<Vec<_>>().join(",");
        if !self.host.set_tag_input(&joined).await? {
            warn!("Tag input not found, tags skipped");
            return Ok(());
        }

        sleep(self.timings.before_add_tags).await;
        report.tags_added = self.host.click_add_tags().await?;
        if report.tags_added {
            info!("Tags updated ({})", tags.len());
        } else {
            warn!("Tag add control not found");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_parsing() {
        assert_eq!("Title".parse::<FillTarget>(), Ok(FillTarget::Title));
        assert_eq!(" tags ".parse::<FillTarget>(), Ok(FillTarget::Tags));
        assert_eq!("all".parse::<FillTarget>(), Ok(FillTarget::All));
        assert!("description".parse::<FillTarget>().is_err());
    }

    #[test]
    fn test_target_fields() {
        assert!(FillTarget::All.includes_title() && FillTarget::All.includes_tags());
        assert!(!FillTarget::Title.includes_tags());
        assert!(!FillTarget::Tags.includes_title());
    }
}
