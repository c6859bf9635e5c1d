//! Getter methods for `HarvestConfig`

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::types::HarvestConfig;
use crate::harvest_engine::{IndexTimeouts, PaginationMode, PipelineTimeouts};

impl HarvestConfig {
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    #[must_use]
    pub fn pagination(&self) -> &PaginationMode {
        &self.pagination
    }

    #[must_use]
    pub fn max_concurrent_jobs(&self) -> usize {
        self.max_concurrent_jobs
    }

    #[must_use]
    pub fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    #[must_use]
    pub fn headless(&self) -> bool {
        self.headless
    }

    #[must_use]
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    #[must_use]
    pub fn reveal_timeout(&self) -> Duration {
        Duration::from_secs(self.reveal_timeout_secs)
    }

    #[must_use]
    pub fn scroll_settle(&self) -> Duration {
        Duration::from_millis(self.scroll_settle_ms)
    }

    #[must_use]
    pub fn job_timeout(&self) -> Option<Duration> {
        self.job_timeout_secs.map(Duration::from_secs)
    }

    /// Parent directory for per-session browser profiles
    ///
    /// Falls back to the system temp directory when unset.
    #[must_use]
    pub fn chrome_data_root(&self) -> PathBuf {
        self.chrome_data_root
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    #[must_use]
    pub fn browser_request_timeout(&self) -> Duration {
        Duration::from_secs(self.browser_request_timeout_secs)
    }

    /// Stage bounds for detail-page jobs
    #[must_use]
    pub fn pipeline_timeouts(&self) -> PipelineTimeouts {
        PipelineTimeouts {
            page_load: self.page_load_timeout(),
            settle: self.settle_delay(),
            reveal: self.reveal_timeout(),
        }
    }

    /// Timing for index page loads
    #[must_use]
    pub fn index_timeouts(&self) -> IndexTimeouts {
        IndexTimeouts {
            page_load: self.page_load_timeout(),
            settle: self.settle_delay(),
            scroll_settle: self.scroll_settle(),
        }
    }
}
