//! Named field extractors and the fail-soft set that runs them

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use log::warn;

use super::ParsedDocument;
use crate::harvest_engine::FieldValue;

/// Pure function from a parsed document to one named field
///
/// Returns `None` when the field cannot be found. Implementations must not
/// retain the document.
pub trait FieldExtractor: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, doc: &ParsedDocument) -> Option<FieldValue>;
}

/// A [`FieldExtractor`] backed by a closure
pub struct FnExtractor<F> {
    name: String,
    func: F,
}

impl<F> FnExtractor<F>
where
    F: Fn(&ParsedDocument) -> Option<FieldValue> + Send + Sync,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl<F> FieldExtractor for FnExtractor<F>
where
    F: Fn(&ParsedDocument) -> Option<FieldValue> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn extract(&self, doc: &ParsedDocument) -> Option<FieldValue> {
        (self.func)(doc)
    }
}

/// Ordered collection of extractors, one per output column
#[derive(Clone, Default)]
pub struct ExtractorSet {
    extractors: Vec<Arc<dyn FieldExtractor>>,
}

impl ExtractorSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extractor, replacing any existing one with the same name in place
    #[must_use]
    pub fn with(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        match self
            .extractors
            .iter()
            .position(|e| e.name() == extractor.name())
        {
            Some(idx) => self.extractors[idx] = extractor,
            None => self.extractors.push(extractor),
        }
        self
    }

    /// Add a closure extractor under `name`
    #[must_use]
    pub fn field<F>(self, name: &str, func: F) -> Self
    where
        F: Fn(&ParsedDocument) -> Option<FieldValue> + Send + Sync + 'static,
    {
        self.with(Arc::new(FnExtractor::new(name, func)))
    }

    /// Field names in registration order
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        self.extractors.iter().map(|e| e.name().to_string()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    /// Run every extractor independently against `doc`
    ///
    /// A panicking extractor is contained and yields `None` for its own field.
    #[must_use]
    pub fn extract_all(&self, doc: &ParsedDocument) -> Vec<(String, Option<FieldValue>)> {
        self.extractors
            .iter()
            .map(|extractor| {
                let value = match catch_unwind(AssertUnwindSafe(|| extractor.extract(doc))) {
                    Ok(value) => value,
                    Err(_) => {
                        warn!(
                            target: "listing_harvest::extract",
                            "Extractor '{}' panicked; recording null",
                            extractor.name()
                        );
                        None
                    }
                };
                (extractor.name().to_string(), value)
            })
            .collect()
    }
}

impl std::fmt::Debug for ExtractorSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorSet")
            .field("columns", &self.columns())
            .finish()
    }
}
