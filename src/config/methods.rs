//! Builder methods available for all states
//!
//! This module contains methods that can be called on the builder
//! regardless of its current type state.

use std::path::PathBuf;

use super::builder::HarvestConfigBuilder;

impl<State> HarvestConfigBuilder<State> {
    /// Maximum number of detail pages processed at once (default 5)
    #[must_use]
    pub fn max_concurrent_jobs(mut self, jobs: usize) -> Self {
        self.max_concurrent_jobs = jobs;
        self
    }

    /// Size of the blocking worker pool (default `min(32, cpus + 4)`)
    #[must_use]
    pub fn worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads;
        self
    }

    /// Set browser headless mode (visible vs invisible browser window)
    ///
    /// Honoured in every build. Headed mode helps diagnose selector drift.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    #[must_use]
    pub fn page_load_timeout_secs(mut self, secs: u64) -> Self {
        self.page_load_timeout_secs = secs;
        self
    }

    /// Pause after navigation before interacting with the page
    #[must_use]
    pub fn settle_delay_ms(mut self, ms: u64) -> Self {
        self.settle_delay_ms = ms;
        self
    }

    #[must_use]
    pub fn reveal_timeout_secs(mut self, secs: u64) -> Self {
        self.reveal_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn scroll_settle_ms(mut self, ms: u64) -> Self {
        self.scroll_settle_ms = ms;
        self
    }

    /// Cancel any single job that runs longer than `secs`
    #[must_use]
    pub fn job_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.job_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn chrome_data_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.chrome_data_root = Some(dir.into());
        self
    }

    #[must_use]
    pub fn browser_request_timeout_secs(mut self, secs: u64) -> Self {
        self.browser_request_timeout_secs = secs;
        self
    }
}
