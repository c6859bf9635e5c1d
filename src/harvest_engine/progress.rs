//! Progress reporting abstraction for harvest runs
//!
//! Defines the `ProgressReporter` trait for lifecycle event reporting
//! and provides a no-op and a logging implementation.

use log::info;

/// Trait for reporting harvest progress at key lifecycle events
///
/// Implementations can send updates to channels, log to console, update UI, etc.
pub trait ProgressReporter: Send + Sync {
    /// Report that an index page is about to be scanned
    fn report_page_started(&self, page: u32);

    /// Report that every job from an index page has finished
    fn report_page_completed(&self, page: u32, written: usize, skipped: usize);

    /// Report that a record reached the sink
    fn report_record_written(&self, listing_id: &str);

    /// Report that a job produced no record
    fn report_job_skipped(&self, listing_id: &str, reason: &str);

    /// Report that the run has finished
    fn report_completed(&self, records_written: usize);
}

/// Progress reporter that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpProgress;

impl ProgressReporter for NoOpProgress {
    #[inline(always)]
    fn report_page_started(&self, _page: u32) {}

    #[inline(always)]
    fn report_page_completed(&self, _page: u32, _written: usize, _skipped: usize) {}

    #[inline(always)]
    fn report_record_written(&self, _listing_id: &str) {}

    #[inline(always)]
    fn report_job_skipped(&self, _listing_id: &str, _reason: &str) {}

    #[inline(always)]
    fn report_completed(&self, _records_written: usize) {}
}

/// Progress reporter that writes page-level events to the log
///
/// Per-record events are logged at debug level to keep `info` readable on
/// long runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn report_page_started(&self, page: u32) {
        info!(target: "listing_harvest::progress", "Scraping page {page}");
    }

    fn report_page_completed(&self, page: u32, written: usize, skipped: usize) {
        info!(
            target: "listing_harvest::progress",
            "Page {page} done: {written} written, {skipped} skipped"
        );
    }

    fn report_record_written(&self, listing_id: &str) {
        log::debug!(target: "listing_harvest::progress", "Saved listing {listing_id}");
    }

    fn report_job_skipped(&self, listing_id: &str, reason: &str) {
        log::debug!(target: "listing_harvest::progress", "Skipped listing {listing_id}: {reason}");
    }

    fn report_completed(&self, records_written: usize) {
        info!(target: "listing_harvest::progress", "Harvest finished, {records_written} records written");
    }
}
