//! Per-listing extraction pipeline
//!
//! One job, one fresh browser session: navigate, let the page settle,
//! optionally reveal hidden content, snapshot, run every extractor, close.
//! Everything here is blocking and runs on a worker-pool thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};

use super::harvest_types::{JobError, ListingReference, Record};
use crate::browser_session::{BrowserSession, SessionFactory, SessionGuard};
use crate::page_extractor::ParsedDocument;
use crate::site::{RevealInteraction, SiteProfile};

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Bounds applied to each stage of a detail-page fetch
#[derive(Debug, Clone, Copy)]
pub struct PipelineTimeouts {
    pub page_load: Duration,
    /// Fixed pause after navigation before touching the page
    pub settle: Duration,
    /// Default bound for each reveal wait; a site may override it
    pub reveal: Duration,
}

/// Cooperative cancellation checked between pipeline stages
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// `Err(JobError::Cancelled)` once cancelled
    pub fn check(&self) -> Result<(), JobError> {
        if self.is_cancelled() {
            Err(JobError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Turns one [`ListingReference`] into one [`Record`]
pub struct ExtractionPipeline {
    sessions: Arc<dyn SessionFactory>,
    profile: Arc<SiteProfile>,
    timeouts: PipelineTimeouts,
}

impl ExtractionPipeline {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        profile: Arc<SiteProfile>,
        timeouts: PipelineTimeouts,
    ) -> Self {
        Self {
            sessions,
            profile,
            timeouts,
        }
    }

    #[must_use]
    pub fn profile(&self) -> &SiteProfile {
        &self.profile
    }

    /// Run the whole job for `reference`
    ///
    /// The session is closed on every path. A close failure after a
    /// successful extraction is logged and does not discard the record.
    ///
    /// # Errors
    ///
    /// Returns a [`JobError`] if the page cannot be loaded, a required reveal
    /// fails, or `cancel` is set between stages.
    pub fn run(&self, reference: &ListingReference, cancel: &CancelFlag) -> Result<Record, JobError> {
        cancel.check()?;
        let started = Instant::now();

        let mut guard = SessionGuard::open(self.sessions.as_ref())?;
        let doc = fetch_document(
            guard.session_mut(),
            reference.detail_url(),
            self.profile.reveal(),
            self.profile.ready_selector(),
            &self.timeouts,
            cancel,
        )?;

        let fields = self.profile.extractors().extract_all(&doc);
        drop(doc);
        let record = Record::new(reference.clone(), fields);

        if let Err(e) = guard.close() {
            warn!(
                target: "listing_harvest::pipeline",
                "Listing {}: session close failed: {e}",
                reference.listing_id()
            );
        }

        debug!(
            target: "listing_harvest::pipeline",
            "Listing {} extracted in {:?}",
            reference.listing_id(),
            started.elapsed()
        );
        Ok(record)
    }
}

/// Load `url` in `session` and return its DOM after the optional reveal
///
/// Stages: navigate, settle, wait for `ready`, reveal, snapshot. `cancel` is
/// checked between stages and during the settle pause.
pub fn fetch_document(
    session: &mut dyn BrowserSession,
    url: &str,
    reveal: Option<&RevealInteraction>,
    ready: Option<&str>,
    timeouts: &PipelineTimeouts,
    cancel: &CancelFlag,
) -> Result<ParsedDocument, JobError> {
    session.navigate(url, timeouts.page_load)?;
    cancel.check()?;

    sleep_unless_cancelled(timeouts.settle, cancel)?;

    if let Some(selector) = ready
        && !session.wait_for(selector, timeouts.page_load)?
    {
        return Err(JobError::NotReady {
            selector: selector.to_string(),
            timeout_secs: timeouts.page_load.as_secs(),
        });
    }

    if let Some(reveal) = reveal {
        perform_reveal(session, reveal, reveal.timeout.unwrap_or(timeouts.reveal))?;
        cancel.check()?;
    }

    Ok(session.snapshot()?)
}

fn perform_reveal(
    session: &mut dyn BrowserSession,
    reveal: &RevealInteraction,
    timeout: Duration,
) -> Result<(), JobError> {
    let not_found = || JobError::RevealNotFound {
        selector: reveal.trigger_selector.clone(),
        timeout_secs: timeout.as_secs(),
    };

    let clicked = session.wait_for(&reveal.trigger_selector, timeout)?
        && session.click(&reveal.trigger_selector)?;

    if !clicked {
        return Err(not_found());
    }

    if session.wait_for(&reveal.revealed_selector, timeout)? {
        Ok(())
    } else {
        Err(JobError::RevealTimeout {
            selector: reveal.revealed_selector.clone(),
            timeout_secs: timeout.as_secs(),
        })
    }
}

/// Sleep for `duration` in short slices, stopping early if cancelled
pub fn sleep_unless_cancelled(duration: Duration, cancel: &CancelFlag) -> Result<(), JobError> {
    let deadline = Instant::now() + duration;
    loop {
        cancel.check()?;
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        thread::sleep((deadline - now).min(CANCEL_POLL_INTERVAL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_sleep_returns_early() {
        let cancel = CancelFlag::new();
        cancel.cancel();
        let started = Instant::now();
        assert!(matches!(
            sleep_unless_cancelled(Duration::from_secs(5), &cancel),
            Err(JobError::Cancelled)
        ));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn zero_sleep_is_immediate() {
        assert!(sleep_unless_cancelled(Duration::ZERO, &CancelFlag::new()).is_ok());
    }
}
