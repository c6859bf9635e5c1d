//! Harvest Engine Module
//!
//! The concurrent harvesting core: pagination, gated dispatch onto the
//! worker pool, the per-listing extraction pipeline, and run orchestration.

// Sub-modules
pub mod dispatcher;
pub mod gate;
pub mod harvest_types;
pub mod orchestrator;
pub mod pagination;
pub mod pipeline;
pub mod progress;
pub mod shutdown;

// Re-export core types
pub use harvest_types::{FieldValue, HarvestError, JobError, ListingReference, Record};

// Re-export orchestration and progress types
pub use orchestrator::{HarvestSummary, Harvester};
pub use progress::{LogProgress, NoOpProgress, ProgressReporter};
pub use shutdown::ShutdownSignal;

// Re-export building blocks for custom pipelines
pub use dispatcher::{BatchOutcome, Dispatcher};
pub use gate::{ConcurrencyGate, GatePermit};
pub use pagination::{
    CursorMode, IndexTimeouts, PageBatch, PaginationCursor, PaginationDriver, PaginationMode,
    ScrollOutcome, scroll_until_stalled,
};
pub use pipeline::{CancelFlag, ExtractionPipeline, PipelineTimeouts, fetch_document};
