//! Core configuration type for harvest runs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::harvest_engine::PaginationMode;

/// Main configuration struct for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// CSV file records are appended to
    pub(crate) output_path: PathBuf,
    pub(crate) pagination: PaginationMode,
    /// Concurrency gate capacity (N)
    pub(crate) max_concurrent_jobs: usize,
    /// Blocking worker threads (W), independent of N
    pub(crate) worker_threads: usize,
    pub(crate) headless: bool,
    pub(crate) page_load_timeout_secs: u64,
    pub(crate) settle_delay_ms: u64,
    pub(crate) reveal_timeout_secs: u64,
    pub(crate) scroll_settle_ms: u64,
    /// Per-job wall-clock limit; `None` means unbounded
    pub(crate) job_timeout_secs: Option<u64>,
    /// Parent of per-session browser profile directories; system temp dir if unset
    pub(crate) chrome_data_root: Option<PathBuf>,
    pub(crate) browser_request_timeout_secs: u64,
}
