//! Type-safe builder for `HarvestConfig` using the typestate pattern
//!
//! The output path and the pagination mode must both be supplied before
//! `build()` is available.

use anyhow::{Result, anyhow};
use std::marker::PhantomData;
use std::path::PathBuf;

use super::types::HarvestConfig;
use crate::harvest_engine::PaginationMode;
use crate::utils::{
    DEFAULT_BROWSER_REQUEST_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_JOBS,
    DEFAULT_PAGE_LOAD_TIMEOUT_SECS, DEFAULT_REVEAL_TIMEOUT_SECS, DEFAULT_SCROLL_SETTLE_MS,
    DEFAULT_SETTLE_DELAY_MS, MAX_CONCURRENT_JOBS_LIMIT, MAX_WORKER_THREADS,
    default_worker_threads,
};

// Type states for the builder
pub struct WithOutputPath;
pub struct Complete;

pub struct HarvestConfigBuilder<State = ()> {
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) pagination: Option<PaginationMode>,
    pub(crate) max_concurrent_jobs: usize,
    pub(crate) worker_threads: usize,
    pub(crate) headless: bool,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) settle_delay_ms: u64,
    pub(crate) reveal_timeout_secs: u64,
    pub(crate) scroll_settle_ms: u64,
    pub(crate) job_timeout_secs: Option<u64>,
    pub(crate) chrome_data_root: Option<PathBuf>,
    pub(crate) browser_request_timeout_secs: u64,
    pub(crate) _phantom: PhantomData<State>,
}

impl Default for HarvestConfigBuilder<()> {
    fn default() -> Self {
        Self {
            output_path: None,
            pagination: None,
            max_concurrent_jobs: DEFAULT_MAX_CONCURRENT_JOBS,
            worker_threads: default_worker_threads(),
            headless: true,
            page_load_timeout_secs: DEFAULT_PAGE_LOAD_TIMEOUT_SECS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            reveal_timeout_secs: DEFAULT_REVEAL_TIMEOUT_SECS,
            scroll_settle_ms: DEFAULT_SCROLL_SETTLE_MS,
            job_timeout_secs: None,
            chrome_data_root: None,
            browser_request_timeout_secs: DEFAULT_BROWSER_REQUEST_TIMEOUT_SECS,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfig {
    /// Create a builder for configuring a `HarvestConfig` with a fluent interface
    #[must_use]
    pub fn builder() -> HarvestConfigBuilder<()> {
        HarvestConfigBuilder::default()
    }
}

impl<State> HarvestConfigBuilder<State> {
    fn transition<Next>(self) -> HarvestConfigBuilder<Next> {
        HarvestConfigBuilder {
            output_path: self.output_path,
            pagination: self.pagination,
            max_concurrent_jobs: self.max_concurrent_jobs,
            worker_threads: self.worker_threads,
            headless: self.headless,
            page_load_timeout_secs: self.page_load_timeout_secs,
            settle_delay_ms: self.settle_delay_ms,
            reveal_timeout_secs: self.reveal_timeout_secs,
            scroll_settle_ms: self.scroll_settle_ms,
            job_timeout_secs: self.job_timeout_secs,
            chrome_data_root: self.chrome_data_root,
            browser_request_timeout_secs: self.browser_request_timeout_secs,
            _phantom: PhantomData,
        }
    }
}

impl HarvestConfigBuilder<()> {
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> HarvestConfigBuilder<WithOutputPath> {
        self.output_path = Some(path.into());
        self.transition()
    }
}

impl HarvestConfigBuilder<WithOutputPath> {
    pub fn pagination(mut self, mode: PaginationMode) -> HarvestConfigBuilder<Complete> {
        self.pagination = Some(mode);
        self.transition()
    }
}

// `build` exists only once output path and pagination are both set
impl HarvestConfigBuilder<Complete> {
    /// Validate and produce the config
    ///
    /// # Errors
    ///
    /// Returns an error if a limit is out of range or the pagination mode is
    /// malformed.
    pub fn build(self) -> Result<HarvestConfig> {
        let pagination = self
            .pagination
            .ok_or_else(|| anyhow!("pagination is required"))?;
        pagination
            .validate()
            .map_err(|e| anyhow!("Invalid pagination: {e}"))?;

        if !(1..=MAX_CONCURRENT_JOBS_LIMIT).contains(&self.max_concurrent_jobs) {
            return Err(anyhow!(
                "max_concurrent_jobs must be between 1 and {MAX_CONCURRENT_JOBS_LIMIT}, got {}",
                self.max_concurrent_jobs
            ));
        }
        if !(1..=MAX_WORKER_THREADS).contains(&self.worker_threads) {
            return Err(anyhow!(
                "worker_threads must be between 1 and {MAX_WORKER_THREADS}, got {}",
                self.worker_threads
            ));
        }
        if self.page_load_timeout_secs == 0 || self.reveal_timeout_secs == 0 {
            return Err(anyhow!("page load and reveal timeouts must be positive"));
        }
        if self.job_timeout_secs == Some(0) {
            return Err(anyhow!("job_timeout_secs must be positive when set"));
        }


        Ok(HarvestConfig {
            output_path: self
                .output_path
                .ok_or_else(|| anyhow!("output_path is required"))?,
            pagination,
            max_concurrent_jobs: self.max_concurrent_jobs,
            worker_threads: self.worker_threads,
            headless: self.headless,
            page_load_timeout_secs: self.page_load_timeout_secs,
            settle_delay_ms: self.settle_delay_ms,
            reveal_timeout_secs: self.reveal_timeout_secs,
            scroll_settle_ms: self.scroll_settle_ms,
            job_timeout_secs: self.job_timeout_secs,
            chrome_data_root: self.chrome_data_root,
            browser_request_timeout_secs: self.browser_request_timeout_secs,
        })
    }
}
