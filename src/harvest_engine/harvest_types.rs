//! Core data and error types for the harvest engine

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::browser_session::FetchError;
use crate::content_saver::SinkError;
use crate::runtime::WorkerError;
use crate::utils::constants::{COLUMN_DETAIL_URL, COLUMN_LISTING_ID, COLUMN_SOURCE_PAGE};

/// Identity of one listing discovered on an index page
///
/// Immutable once produced by the pagination driver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingReference {
    listing_id: String,
    detail_url: String,
    source_page: u32,
}

impl ListingReference {
    pub fn new(
        listing_id: impl Into<String>,
        detail_url: impl Into<String>,
        source_page: u32,
    ) -> Self {
        Self {
            listing_id: listing_id.into(),
            detail_url: detail_url.into(),
            source_page,
        }
    }

    #[must_use]
    pub fn listing_id(&self) -> &str {
        &self.listing_id
    }

    #[must_use]
    pub fn detail_url(&self) -> &str {
        &self.detail_url
    }

    #[must_use]
    pub fn source_page(&self) -> u32 {
        self.source_page
    }
}

/// A single extracted value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Render as a CSV cell
    #[must_use]
    pub fn to_cell(&self) -> String {
        self.to_string()
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(i) => write!(f, "{i}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// The result of one successful extraction job
///
/// Built in one step from a reference and every extractor's output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    reference: ListingReference,
    fields: Vec<(String, Option<FieldValue>)>,
}

impl Record {
    #[must_use]
    pub fn new(reference: ListingReference, fields: Vec<(String, Option<FieldValue>)>) -> Self {
        Self { reference, fields }
    }

    #[must_use]
    pub fn reference(&self) -> &ListingReference {
        &self.reference
    }

    #[must_use]
    pub fn listing_id(&self) -> &str {
        self.reference.listing_id()
    }

    #[must_use]
    pub fn detail_url(&self) -> &str {
        self.reference.detail_url()
    }

    #[must_use]
    pub fn source_page(&self) -> u32 {
        self.reference.source_page()
    }

    /// Extracted fields in extractor order
    #[must_use]
    pub fn fields(&self) -> &[(String, Option<FieldValue>)] {
        &self.fields
    }

    /// Value of an extracted field; `None` if the field is null or unknown
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Cell text for `column`, including the identity columns
    ///
    /// Null and unknown columns render as an empty cell.
    #[must_use]
    pub fn cell(&self, column: &str) -> String {
        match column {
            COLUMN_LISTING_ID => self.listing_id().to_string(),
            COLUMN_DETAIL_URL => self.detail_url().to_string(),
            COLUMN_SOURCE_PAGE => self.source_page().to_string(),
            other => self.field(other).map(FieldValue::to_cell).unwrap_or_default(),
        }
    }
}

/// Why a single extraction job produced no record
///
/// Always contained at the dispatcher: the job is logged and skipped.
#[derive(Error, Debug)]
pub enum JobError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("reveal trigger '{selector}' not found within {timeout_secs}s")]
    RevealNotFound { selector: String, timeout_secs: u64 },

    #[error("revealed content '{selector}' did not appear within {timeout_secs}s")]
    RevealTimeout { selector: String, timeout_secs: u64 },

    #[error("page not ready: '{selector}' did not appear within {timeout_secs}s")]
    NotReady { selector: String, timeout_secs: u64 },

    #[error("job cancelled")]
    Cancelled,

    #[error(transparent)]
    Worker(#[from] WorkerError),
}

/// Errors that end a harvest run
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("failed to persist record {listing_id}: {source}")]
    Sink {
        listing_id: String,
        #[source]
        source: SinkError,
    },

    #[error("failed to open output: {0}")]
    SinkInit(#[source] SinkError),

    #[error("failed to start worker pool: {0}")]
    WorkerPool(#[source] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new(
            ListingReference::new("42", "https://example.az/items/42", 3),
            vec![
                ("title".to_string(), Some(FieldValue::from("Mənzil"))),
                ("price".to_string(), Some(FieldValue::Integer(125_000))),
                ("views".to_string(), None),
            ],
        )
    }

    #[test]
    fn cells_cover_identity_and_fields() {
        let r = record();
        assert_eq!(r.cell("listing_id"), "42");
        assert_eq!(r.cell("source_page"), "3");
        assert_eq!(r.cell("title"), "Mənzil");
        assert_eq!(r.cell("price"), "125000");
        assert_eq!(r.cell("views"), "");
        assert_eq!(r.cell("missing"), "");
    }

    #[test]
    fn field_value_serializes_untagged() {
        let json = serde_json::to_string(&vec![
            FieldValue::Integer(1),
            FieldValue::Number(2.5),
            FieldValue::Text("x".into()),
        ])
        .unwrap();
        assert_eq!(json, r#"[1,2.5,"x"]"#);
    }
}
