//! Field extraction from parsed listing pages.
//!
//! A site's fields are described as an [`ExtractorSet`] of named, independent
//! [`FieldExtractor`]s run against a read-only [`ParsedDocument`].

// Sub-modules
pub mod document;
pub mod extractors;
pub mod helpers;

// Re-exports for public API
pub use document::ParsedDocument;
pub use extractors::{ExtractorSet, FieldExtractor, FnExtractor};
