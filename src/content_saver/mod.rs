//! Record persistence

// Module declarations
mod csv_sink;

// Re-export public API from csv_sink module
pub use csv_sink::{CsvSink, RecordSink, SinkError};
