//! Append-only CSV persistence for harvested records
//!
//! One row per record, flushed before `append` returns, so a crash loses at
//! most the record being written. The header is written only when the file
//! is new or empty, which makes reopening an existing output idempotent.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use parking_lot::Mutex;
use thiserror::Error;

use crate::harvest_engine::Record;

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("sink task failed: {0}")]
    Task(String),
}

/// Durable destination for records
///
/// `append` must have persisted the record when it returns `Ok`.
/// Implementations serialize concurrent appends internally.
pub trait RecordSink: Send + Sync {
    fn append(&self, record: &Record) -> Result<(), SinkError>;
}

pub struct CsvSink {
    path: PathBuf,
    columns: Vec<String>,
    writer: Mutex<csv::Writer<File>>,
    rows_written: AtomicU64,
}

impl CsvSink {
    /// Open `path` for appending, writing the header row if the file is new
    ///
    /// Parent directories are created. If the file already has a different
    /// header, rows are still appended in `columns` order and a warning is
    /// logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created, opened or written.
    pub fn open(path: impl AsRef<Path>, columns: Vec<String>) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size > 0 {
            check_existing_header(&path, &columns);
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if size == 0 {
            writer.write_record(&columns)?;
            writer.flush()?;
            debug!(target: "listing_harvest::sink", "Created {} with {} columns", path.display(), columns.len());
        }

        Ok(Self {
            path,
            columns,
            writer: Mutex::new(writer),
            rows_written: AtomicU64::new(0),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows appended through this handle
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_written.load(Ordering::Relaxed)
    }
}

impl RecordSink for CsvSink {
    fn append(&self, record: &Record) -> Result<(), SinkError> {
        let row: Vec<String> = self.columns.iter().map(|c| record.cell(c)).collect();

        let mut writer = self.writer.lock();
        writer.write_record(&row)?;
        writer.flush()?;
        drop(writer);

        self.rows_written.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn check_existing_header(path: &Path, columns: &[String]) {
    let mut reader = match csv::ReaderBuilder::new().has_headers(false).from_path(path) {
        Ok(reader) => reader,
        Err(e) => {
            warn!(target: "listing_harvest::sink", "Could not read existing header of {}: {e}", path.display());
            return;
        }
    };

    let mut first = csv::StringRecord::new();
    match reader.read_record(&mut first) {
        Ok(true) => {
            let existing: Vec<&str> = first.iter().collect();
            if existing != columns.iter().map(String::as_str).collect::<Vec<_>>() {
                warn!(
                    target: "listing_harvest::sink",
                    "Existing header of {} differs from expected columns; appending in expected order",
                    path.display()
                );
            }
        }
        Ok(false) => {}
        Err(e) => {
            warn!(target: "listing_harvest::sink", "Could not read existing header of {}: {e}", path.display());
        }
    }
}
