//! Pagination driver
//!
//! Produces batches of listing references one index page at a time, in two
//! modes:
//!
//! - **Counted**: a URL template with a `{page}` placeholder walked from
//!   `start_page` to `end_page` inclusive. A page that fails to load is logged,
//!   counted and skipped.
//! - **Scroll**: a single infinite-scroll index. The driver scrolls until the
//!   target count is reached or the list stops growing, then yields one batch.
//!
//! Index pages are loaded on the worker pool in short-lived sessions, like
//! detail pages.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::harvest_types::{JobError, ListingReference};
use super::pipeline::{CancelFlag, PipelineTimeouts, fetch_document, sleep_unless_cancelled};
use crate::browser_session::{BrowserSession, FetchError, SessionFactory, SessionGuard};
use crate::page_extractor::ParsedDocument;
use crate::runtime::WorkerPool;
use crate::site::SiteProfile;

const PAGE_PLACEHOLDER: &str = "{page}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PaginationMode {
    Counted {
        url_template: String,
        start_page: u32,
        end_page: u32,
    },
    Scroll {
        index_url: String,
        target_count: Option<usize>,
        stall_limit: u32,
    },
}

impl PaginationMode {
    pub fn counted(url_template: impl Into<String>, start_page: u32, end_page: u32) -> Self {
        Self::Counted {
            url_template: url_template.into(),
            start_page,
            end_page,
        }
    }

    pub fn scroll(index_url: impl Into<String>, target_count: Option<usize>, stall_limit: u32) -> Self {
        Self::Scroll {
            index_url: index_url.into(),
            target_count,
            stall_limit,
        }
    }

    /// Index URL for `page` (scroll mode ignores the page number)
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        match self {
            Self::Counted { url_template, .. } => {
                url_template.replace(PAGE_PLACEHOLDER, &page.to_string())
            }
            Self::Scroll { index_url, .. } => index_url.clone(),
        }
    }

    /// Check the mode describes a non-empty, well-formed walk
    ///
    /// # Errors
    ///
    /// Returns a message describing the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Self::Counted {
                url_template,
                start_page,
                end_page,
            } => {
                if !url_template.contains(PAGE_PLACEHOLDER) {
                    return Err(format!("URL template must contain {PAGE_PLACEHOLDER}: {url_template}"));
                }
                if start_page > end_page {
                    return Err(format!("start page {start_page} is after end page {end_page}"));
                }
                Ok(())
            }
            Self::Scroll {
                index_url,
                target_count,
                stall_limit,
            } => {
                if index_url.is_empty() {
                    return Err("scroll index URL is empty".to_string());
                }
                if *target_count == Some(0) {
                    return Err("scroll target count must be positive".to_string());
                }
                if *stall_limit == 0 {
                    return Err("scroll stall limit must be at least 1".to_string());
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorMode {
    Counted,
    Scroll,
}

/// Position of a driver within its walk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationCursor {
    current_page: u32,
    seen_count: usize,
    mode: CursorMode,
    exhausted: bool,
}

impl PaginationCursor {
    fn start(mode: &PaginationMode) -> Self {
        match mode {
            PaginationMode::Counted { start_page, .. } => Self {
                current_page: *start_page,
                seen_count: 0,
                mode: CursorMode::Counted,
                exhausted: false,
            },
            PaginationMode::Scroll { .. } => Self {
                current_page: 1,
                seen_count: 0,
                mode: CursorMode::Scroll,
                exhausted: false,
            },
        }
    }

    /// Page the next call to `next_batch` will load
    #[must_use]
    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    /// References yielded so far
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen_count
    }

    #[must_use]
    pub fn mode(&self) -> CursorMode {
        self.mode
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// All listing references found on one index page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageBatch {
    pub page: u32,
    pub references: Vec<ListingReference>,
}

/// Timing for index page loads
#[derive(Debug, Clone, Copy)]
pub struct IndexTimeouts {
    pub page_load: Duration,
    pub settle: Duration,
    /// Pause after scrolling to the bottom, before re-scanning
    pub scroll_settle: Duration,
}

/// Result of scrolling an infinite index
#[derive(Debug, Clone)]
pub struct ScrollOutcome {
    pub references: Vec<ListingReference>,
    /// Scroll iterations performed, not counting the initial scan
    pub iterations: u32,
}

pub struct PaginationDriver {
    mode: PaginationMode,
    profile: Arc<SiteProfile>,
    sessions: Arc<dyn SessionFactory>,
    pool: Arc<WorkerPool>,
    timeouts: IndexTimeouts,
    cursor: PaginationCursor,
    pages_failed: usize,
}

impl PaginationDriver {
    pub fn new(
        mode: PaginationMode,
        profile: Arc<SiteProfile>,
        sessions: Arc<dyn SessionFactory>,
        pool: Arc<WorkerPool>,
        timeouts: IndexTimeouts,
    ) -> Self {
        let cursor = PaginationCursor::start(&mode);
        Self {
            mode,
            profile,
            sessions,
            pool,
            timeouts,
            cursor,
            pages_failed: 0,
        }
    }

    #[must_use]
    pub fn cursor(&self) -> &PaginationCursor {
        &self.cursor
    }

    /// Index pages that could not be loaded
    #[must_use]
    pub fn pages_failed(&self) -> usize {
        self.pages_failed
    }

    /// Rewind to the first page
    pub fn reset(&mut self) {
        self.cursor = PaginationCursor::start(&self.mode);
        self.pages_failed = 0;
    }

    /// Load the next index page and return its references
    ///
    /// Returns `None` once the walk is exhausted.
    pub async fn next_batch(&mut self) -> Option<PageBatch> {
        match self.mode.clone() {
            PaginationMode::Counted { end_page, .. } => self.next_counted(end_page).await,
            PaginationMode::Scroll {
                target_count,
                stall_limit,
                ..
            } => self.next_scroll(target_count, stall_limit).await,
        }
    }

    async fn next_counted(&mut self, end_page: u32) -> Option<PageBatch> {
        loop {
            if self.cursor.exhausted || self.cursor.current_page > end_page {
                self.cursor.exhausted = true;
                return None;
            }

            let page = self.cursor.current_page;
            match page.checked_add(1) {
                Some(next) if page < end_page => self.cursor.current_page = next,
                _ => self.cursor.exhausted = true,
            }
            let url = self.mode.page_url(page);

            match self.scan_index_page(url.clone(), page).await {
                Ok(references) => {
                    debug!(
                        target: "listing_harvest::pagination",
                        "Page {page}: {} listings",
                        references.len()
                    );
                    self.cursor.seen_count += references.len();
                    return Some(PageBatch { page, references });
                }
                Err(e) => {
                    warn!(target: "listing_harvest::pagination", "Skipping index page {page} ({url}): {e}");
                    self.pages_failed += 1;
                }
            }
        }
    }

    async fn next_scroll(&mut self, target_count: Option<usize>, stall_limit: u32) -> Option<PageBatch> {
        if self.cursor.exhausted {
            return None;
        }
        self.cursor.exhausted = true;

        let url = self.mode.page_url(1);
        let sessions = Arc::clone(&self.sessions);
        let profile = Arc::clone(&self.profile);
        let timeouts = self.timeouts;
        let job_url = url.clone();

        let result = self
            .pool
            .spawn(move || -> Result<ScrollOutcome, JobError> {
                let mut guard = SessionGuard::open(sessions.as_ref())?;
                let session = guard.session_mut();
                session.navigate(&job_url, timeouts.page_load)?;
                sleep_unless_cancelled(timeouts.settle, &CancelFlag::new())?;
                let outcome = scroll_until_stalled(
                    session,
                    &profile,
                    target_count,
                    stall_limit,
                    timeouts.scroll_settle,
                )?;
                close_quietly(guard);
                Ok(outcome)
            })
            .await
            .map_err(JobError::from)
            .and_then(|r| r);

        match result {
            Ok(outcome) => {
                info!(
                    target: "listing_harvest::pagination",
                    "Collected {} listings from {url} after {} scrolls",
                    outcome.references.len(),
                    outcome.iterations
                );
                self.cursor.seen_count += outcome.references.len();
                Some(PageBatch {
                    page: 1,
                    references: outcome.references,
                })
            }
            Err(e) => {
                warn!(target: "listing_harvest::pagination", "Failed to load scroll index {url}: {e}");
                self.pages_failed += 1;
                None
            }
        }
    }

    async fn scan_index_page(&self, url: String, page: u32) -> Result<Vec<ListingReference>, JobError> {
        let sessions = Arc::clone(&self.sessions);
        let profile = Arc::clone(&self.profile);
        let timeouts = PipelineTimeouts {
            page_load: self.timeouts.page_load,
            settle: self.timeouts.settle,
            reveal: Duration::ZERO,
        };

        self.pool
            .spawn(move || -> Result<Vec<ListingReference>, JobError> {
                let mut guard = SessionGuard::open(sessions.as_ref())?;
                let doc = fetch_document(
                    guard.session_mut(),
                    &url,
                    None,
                    None,
                    &timeouts,
                    &CancelFlag::new(),
                )?;
                let references = profile.scan_listings(&doc, page);
                drop(doc);
                close_quietly(guard);
                Ok(references)
            })
            .await
            .map_err(JobError::from)
            .and_then(|r| r)
    }
}

/// Scroll an already-loaded index until it stops growing
///
/// Each iteration scrolls to the bottom, waits `settle`, scrolls back to the
/// top and re-scans. Stops when `target` references are collected or after
/// `stall_limit` consecutive iterations that found nothing new. References
/// are keyed by detail URL and truncated to `target`.
pub fn scroll_until_stalled(
    session: &mut dyn BrowserSession,
    profile: &SiteProfile,
    target: Option<usize>,
    stall_limit: u32,
    settle: Duration,
) -> Result<ScrollOutcome, FetchError> {
    let mut seen = HashSet::new();
    let mut references = Vec::new();
    absorb(profile, &session.snapshot()?, &mut seen, &mut references);

    let reached = |count: usize| target.is_some_and(|t| count >= t);
    let mut iterations = 0;
    let mut stalled = 0;

    while !reached(references.len()) && stalled < stall_limit {
        session.scroll_to_bottom()?;
        if !settle.is_zero() {
            std::thread::sleep(settle);
        }
        session.scroll_to_top()?;

        let before = references.len();
        absorb(profile, &session.snapshot()?, &mut seen, &mut references);
        iterations += 1;

        if references.len() > before {
            stalled = 0;
        } else {
            stalled += 1;
        }
        debug!(
            target: "listing_harvest::pagination",
            "Scroll {iterations}: {} listings ({stalled} without growth)",
            references.len()
        );
    }

    if let Some(t) = target {
        references.truncate(t);
    }
    Ok(ScrollOutcome {
        references,
        iterations,
    })
}

fn absorb(
    profile: &SiteProfile,
    doc: &ParsedDocument,
    seen: &mut HashSet<String>,
    references: &mut Vec<ListingReference>,
) {
    for reference in profile.scan_listings(doc, 1) {
        if seen.insert(reference.detail_url().to_string()) {
            references.push(reference);
        }
    }
}

fn close_quietly(guard: SessionGuard) {
    if let Err(e) = guard.close() {
        warn!(target: "listing_harvest::pagination", "Index session close failed: {e}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_substitutes_placeholder() {
        let mode = PaginationMode::counted("https://bina.az/alqi-satqi?page={page}", 1, 3);
        assert_eq!(mode.page_url(2), "https://bina.az/alqi-satqi?page=2");
    }

    #[test]
    fn validate_rejects_bad_modes() {
        assert!(PaginationMode::counted("https://x.az/?p=1", 1, 2).validate().is_err());
        assert!(PaginationMode::counted("https://x.az/?p={page}", 3, 2).validate().is_err());
        assert!(PaginationMode::scroll("https://x.az", Some(0), 3).validate().is_err());
        assert!(PaginationMode::scroll("https://x.az", None, 0).validate().is_err());
        assert!(PaginationMode::scroll("https://x.az", None, 3).validate().is_ok());
    }

    #[test]
    fn cursor_starts_at_first_page() {
        let cursor = PaginationCursor::start(&PaginationMode::counted("{page}", 4, 9));
        assert_eq!(cursor.current_page(), 4);
        assert_eq!(cursor.mode(), CursorMode::Counted);
        assert!(!cursor.is_exhausted());
    }

    #[test]
    fn mode_serializes_with_tag() {
        let json = serde_json::to_string(&PaginationMode::scroll("https://tap.az/elanlar", Some(10), 3))
            .unwrap();
        assert!(json.contains(r#""mode":"scroll""#));
    }
}
