//! Harvest orchestration
//!
//! Wires the sink, worker pool, gate, pipeline, dispatcher and pagination
//! driver together and walks the index one page at a time. Each page's
//! listings are dispatched concurrently and fully drained before the next
//! page is loaded.

use std::sync::Arc;
use std::time::Instant;

use log::{error, info};
use serde::Serialize;

use super::dispatcher::Dispatcher;
use super::gate::ConcurrencyGate;
use super::harvest_types::HarvestError;
use super::pagination::PaginationDriver;
use super::pipeline::ExtractionPipeline;
use super::progress::{NoOpProgress, ProgressReporter};
use super::shutdown::ShutdownSignal;
use crate::browser_session::SessionFactory;
use crate::config::HarvestConfig;
use crate::content_saver::{CsvSink, RecordSink};
use crate::runtime::WorkerPool;
use crate::site::SiteProfile;

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HarvestSummary {
    pub pages_visited: usize,
    pub pages_failed: usize,
    pub jobs_dispatched: usize,
    pub records_written: usize,
    pub jobs_skipped: usize,
    pub jobs_not_started: usize,
    /// True when the run stopped early on a shutdown request
    pub interrupted: bool,
    pub elapsed_secs: f64,
}

pub struct Harvester {
    config: HarvestConfig,
    profile: Arc<SiteProfile>,
    sessions: Arc<dyn SessionFactory>,
    progress: Arc<dyn ProgressReporter>,
    sink: Option<Arc<dyn RecordSink>>,
    shutdown: ShutdownSignal,
}

impl Harvester {
    pub fn new(
        config: HarvestConfig,
        profile: SiteProfile,
        sessions: Arc<dyn SessionFactory>,
    ) -> Self {
        Self {
            config,
            profile: Arc::new(profile),
            sessions,
            progress: Arc::new(NoOpProgress),
            sink: None,
            shutdown: ShutdownSignal::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Persist to `sink` instead of the CSV file named in the config
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Handle that stops the run when triggered
    #[must_use]
    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Run the harvest to completion, exhaustion or shutdown
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be opened, the worker pool cannot
    /// start, or a record cannot be written. Per-listing and per-page failures
    /// are counted in the summary instead.
    pub async fn run(self) -> Result<HarvestSummary, HarvestError> {
        let started = Instant::now();
        let config = &self.config;
        config.pagination().validate().map_err(HarvestError::Config)?;

        let sink = match self.sink.clone() {
            Some(sink) => sink,
            None => Arc::new(
                CsvSink::open(config.output_path(), self.profile.columns())
                    .map_err(HarvestError::SinkInit)?,
            ),
        };

        let pool = Arc::new(WorkerPool::new(config.worker_threads()).map_err(HarvestError::WorkerPool)?);
        let gate = ConcurrencyGate::new(config.max_concurrent_jobs());
        let pipeline = Arc::new(ExtractionPipeline::new(
            Arc::clone(&self.sessions),
            Arc::clone(&self.profile),
            config.pipeline_timeouts(),
        ));
        let dispatcher = Dispatcher::new(gate, Arc::clone(&pool), pipeline, sink)
            .with_progress(Arc::clone(&self.progress))
            .with_job_timeout(config.job_timeout())
            .with_shutdown(self.shutdown.clone());
        let mut driver = PaginationDriver::new(
            config.pagination().clone(),
            Arc::clone(&self.profile),
            Arc::clone(&self.sessions),
            pool,
            config.index_timeouts(),
        );

        info!(
            target: "listing_harvest::harvest",
            "Harvesting {} into {} (N={}, workers={})",
            self.profile.name(),
            config.output_path().display(),
            config.max_concurrent_jobs(),
            config.worker_threads()
        );

        let mut summary = HarvestSummary::default();

        loop {
            if self.shutdown.is_triggered() {
                break;
            }

            let batch = tokio::select! {
                batch = driver.next_batch() => batch,
                () = self.shutdown.wait() => break,
            };
            let Some(batch) = batch else {
                break;
            };

            summary.pages_visited += 1;
            self.progress.report_page_started(batch.page);

            match dispatcher.dispatch_batch(batch.references).await {
                Ok(outcome) => {
                    summary.records_written += outcome.written;
                    summary.jobs_skipped += outcome.skipped;
                    summary.jobs_not_started += outcome.not_started;
                    summary.jobs_dispatched += outcome.written + outcome.skipped;
                    self.progress
                        .report_page_completed(batch.page, outcome.written, outcome.skipped);
                }
                Err(e) => {
                    error!(
                        target: "listing_harvest::harvest",
                        "Harvest aborted on page {}: {e}",
                        batch.page
                    );
                    return Err(e);
                }
            }
        }

        summary.pages_failed = driver.pages_failed();
        summary.interrupted = self.shutdown.is_triggered();
        summary.elapsed_secs = started.elapsed().as_secs_f64();

        self.progress.report_completed(summary.records_written);
        info!(
            target: "listing_harvest::harvest",
            "{}: {} records written, {} skipped, {} pages failed in {:.1}s{}",
            self.profile.name(),
            summary.records_written,
            summary.jobs_skipped,
            summary.pages_failed,
            summary.elapsed_secs,
            if summary.interrupted { " (interrupted)" } else { "" }
        );

        Ok(summary)
    }
}
