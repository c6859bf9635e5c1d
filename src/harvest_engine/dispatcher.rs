//! Gated dispatch of extraction jobs onto the worker pool
//!
//! `submit` is the only place job failures are contained: whatever happens
//! inside a job (navigation errors, missing reveals, panics, timeouts) ends
//! here as a logged skip. The one error that escapes is a failed sink write.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, warn};

use super::gate::ConcurrencyGate;
use super::harvest_types::{HarvestError, JobError, ListingReference, Record};
use super::pipeline::{CancelFlag, ExtractionPipeline};
use super::progress::{NoOpProgress, ProgressReporter};
use super::shutdown::ShutdownSignal;
use crate::content_saver::{RecordSink, SinkError};
use crate::runtime::WorkerPool;

/// Totals for one dispatched batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub written: usize,
    pub skipped: usize,
    /// References never started because shutdown was requested
    pub not_started: usize,
}

enum JobOutcome {
    Written(Record),
    Skipped,
    NotStarted,
}

pub struct Dispatcher {
    gate: ConcurrencyGate,
    pool: Arc<WorkerPool>,
    pipeline: Arc<ExtractionPipeline>,
    sink: Arc<dyn RecordSink>,
    progress: Arc<dyn ProgressReporter>,
    job_timeout: Option<Duration>,
    shutdown: ShutdownSignal,
}

impl Dispatcher {
    pub fn new(
        gate: ConcurrencyGate,
        pool: Arc<WorkerPool>,
        pipeline: Arc<ExtractionPipeline>,
        sink: Arc<dyn RecordSink>,
    ) -> Self {
        Self {
            gate,
            pool,
            pipeline,
            sink,
            progress: Arc::new(NoOpProgress),
            job_timeout: None,
            shutdown: ShutdownSignal::new(),
        }
    }

    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    /// Cancel jobs that run longer than `timeout`
    ///
    /// A cancelled job keeps its gate permit until its worker actually returns.
    #[must_use]
    pub fn with_job_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.job_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_shutdown(mut self, shutdown: ShutdownSignal) -> Self {
        self.shutdown = shutdown;
        self
    }

    #[must_use]
    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run one reference through the pipeline and persist its record
    ///
    /// Returns `Ok(None)` when the job failed and was skipped, or was never
    /// started because shutdown is in progress.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::Sink`] if the record could not be written.
    pub async fn submit(&self, reference: ListingReference) -> Result<Option<Record>, HarvestError> {
        match self.run_job(reference).await? {
            JobOutcome::Written(record) => Ok(Some(record)),
            JobOutcome::Skipped | JobOutcome::NotStarted => Ok(None),
        }
    }

    /// Submit every reference concurrently and wait for all of them
    ///
    /// On a sink failure, shutdown is triggered so queued references are not
    /// started, in-flight jobs drain, and the first error is returned.
    pub async fn dispatch_batch(
        &self,
        references: Vec<ListingReference>,
    ) -> Result<BatchOutcome, HarvestError> {
        let mut jobs: FuturesUnordered<_> =
            references.into_iter().map(|r| self.run_job(r)).collect();

        let mut outcome = BatchOutcome::default();
        let mut fatal = None;

        while let Some(result) = jobs.next().await {
            match result {
                Ok(JobOutcome::Written(_)) => outcome.written += 1,
                Ok(JobOutcome::Skipped) => outcome.skipped += 1,
                Ok(JobOutcome::NotStarted) => outcome.not_started += 1,
                Err(e) => {
                    if fatal.is_none() {
                        error!(target: "listing_harvest::dispatch", "Stopping harvest: {e}");
                        self.shutdown.trigger();
                        fatal = Some(e);
                    }
                }
            }
        }

        match fatal {
            Some(e) => Err(e),
            None => Ok(outcome),
        }
    }

    async fn run_job(&self, reference: ListingReference) -> Result<JobOutcome, HarvestError> {
        if self.shutdown.is_triggered() {
            return Ok(JobOutcome::NotStarted);
        }

        let Some(permit) = self.gate.acquire().await else {
            return Ok(JobOutcome::NotStarted);
        };
        if self.shutdown.is_triggered() {
            return Ok(JobOutcome::NotStarted);
        }

        debug!(
            target: "listing_harvest::dispatch",
            "Starting listing {} ({} in flight)",
            reference.listing_id(),
            self.gate.in_flight()
        );

        let cancel = CancelFlag::new();
        let mut handle = {
            let pipeline = Arc::clone(&self.pipeline);
            let reference = reference.clone();
            let cancel = cancel.clone();
            self.pool.spawn(move || pipeline.run(&reference, &cancel))
        };

        let joined = match self.job_timeout {
            Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        target: "listing_harvest::dispatch",
                        "Listing {} exceeded {limit:?}; cancelling",
                        reference.listing_id()
                    );
                    cancel.cancel();
                    handle.await
                }
            },
            None => handle.await,
        };
        drop(permit);

        match joined.map_err(JobError::from).and_then(|r| r) {
            Ok(record) => {
                let record = self.persist(record).await?;
                self.progress.report_record_written(record.listing_id());
                Ok(JobOutcome::Written(record))
            }
            Err(e) => {
                warn!(
                    target: "listing_harvest::dispatch",
                    "Skipping listing {} ({}): {e}",
                    reference.listing_id(),
                    reference.detail_url()
                );
                self.progress
                    .report_job_skipped(reference.listing_id(), &e.to_string());
                Ok(JobOutcome::Skipped)
            }
        }
    }

    async fn persist(&self, record: Record) -> Result<Record, HarvestError> {
        let sink = Arc::clone(&self.sink);
        let listing_id = record.listing_id().to_string();

        let written = tokio::task::spawn_blocking(move || sink.append(&record).map(|()| record))
            .await
            .map_err(|e| SinkError::Task(e.to_string()))
            .and_then(|r| r);

        written.map_err(|source| HarvestError::Sink { listing_id, source })
    }
}
