//! Site profiles
//!
//! A [`SiteProfile`] is everything site-specific: where listing anchors live on
//! an index page, how a listing id is derived from its URL, the optional
//! reveal click on a detail page, and the field extractors. The harvest engine
//! only consumes profiles; the built-in ones live in the submodules.

pub mod bina;
pub mod lalafo;
pub mod tapaz;

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::debug;
use url::Url;

use crate::harvest_engine::{ListingReference, PaginationMode};
use crate::page_extractor::{ExtractorSet, ParsedDocument};
use crate::utils::constants::{COLUMN_DETAIL_URL, COLUMN_LISTING_ID, COLUMN_SOURCE_PAGE};

/// How a listing id is read from a detail URL path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingIdStrategy {
    /// `/items/4123456` -> `4123456`
    LastPathSegment,
    /// `/baku/ads/flat-for-rent-id-104823948` -> `104823948`
    LastDashSegment,
}

impl ListingIdStrategy {
    #[must_use]
    pub fn listing_id(&self, path: &str) -> Option<String> {
        let segment = path.trim_end_matches('/').rsplit('/').next()?;
        let id = match self {
            Self::LastPathSegment => segment,
            Self::LastDashSegment => segment.rsplit('-').next()?,
        };
        if id.is_empty() {
            None
        } else {
            Some(id.to_string())
        }
    }
}

/// A click that exposes hidden content, such as a "show phone" button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealInteraction {
    pub trigger_selector: String,
    pub revealed_selector: String,
    /// Overrides the configured reveal timeout for this site
    pub timeout: Option<Duration>,
}

impl RevealInteraction {
    pub fn required(trigger: impl Into<String>, revealed: impl Into<String>) -> Self {
        Self {
            trigger_selector: trigger.into(),
            revealed_selector: revealed.into(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SiteProfile {
    name: String,
    base_url: Url,
    listing_selector: String,
    id_strategy: ListingIdStrategy,
    ready_selector: Option<String>,
    reveal: Option<RevealInteraction>,
    extractors: ExtractorSet,
}

impl SiteProfile {
    /// Create a profile with no reveal step and no extractors
    ///
    /// # Errors
    ///
    /// Returns an error if `base_url` is not an absolute URL or
    /// `listing_selector` is not valid CSS.
    pub fn new(name: &str, base_url: &str, listing_selector: &str) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid base URL for {name}: {base_url}"))?;
        scraper::Selector::parse(listing_selector)
            .map_err(|e| anyhow!("Invalid listing selector for {name}: {e}"))?;

        Ok(Self {
            name: name.to_string(),
            base_url,
            listing_selector: listing_selector.to_string(),
            id_strategy: ListingIdStrategy::LastPathSegment,
            ready_selector: None,
            reveal: None,
            extractors: ExtractorSet::new(),
        })
    }

    #[must_use]
    pub fn with_id_strategy(mut self, strategy: ListingIdStrategy) -> Self {
        self.id_strategy = strategy;
        self
    }

    #[must_use]
    pub fn with_ready_selector(mut self, selector: impl Into<String>) -> Self {
        self.ready_selector = Some(selector.into());
        self
    }

    #[must_use]
    pub fn with_reveal(mut self, reveal: RevealInteraction) -> Self {
        self.reveal = Some(reveal);
        self
    }

    #[must_use]
    pub fn with_extractors(mut self, extractors: ExtractorSet) -> Self {
        self.extractors = extractors;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    #[must_use]
    pub fn listing_selector(&self) -> &str {
        &self.listing_selector
    }

    #[must_use]
    pub fn id_strategy(&self) -> ListingIdStrategy {
        self.id_strategy
    }

    #[must_use]
    pub fn ready_selector(&self) -> Option<&str> {
        self.ready_selector.as_deref()
    }

    #[must_use]
    pub fn reveal(&self) -> Option<&RevealInteraction> {
        self.reveal.as_ref()
    }

    #[must_use]
    pub fn extractors(&self) -> &ExtractorSet {
        &self.extractors
    }

    /// Output columns: identity, extractor fields in order, then the source page
    #[must_use]
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![COLUMN_LISTING_ID.to_string(), COLUMN_DETAIL_URL.to_string()];
        columns.extend(self.extractors.columns());
        columns.push(COLUMN_SOURCE_PAGE.to_string());
        columns
    }

    /// Turn an anchor href into a reference, or `None` if no id can be derived
    #[must_use]
    pub fn resolve_reference(&self, href: &str, source_page: u32) -> Option<ListingReference> {
        let url = self.base_url.join(href).ok()?;
        let id = self.id_strategy.listing_id(url.path())?;
        Some(ListingReference::new(id, url.to_string(), source_page))
    }

    /// Every listing reference on an index page, in document order
    ///
    /// Hrefs repeated on the same page produce one reference.
    #[must_use]
    pub fn scan_listings(&self, doc: &ParsedDocument, source_page: u32) -> Vec<ListingReference> {
        let mut seen = HashSet::new();
        let mut references = Vec::new();
        for href in doc.listing_hrefs(&self.listing_selector) {
            match self.resolve_reference(&href, source_page) {
                Some(reference) => {
                    if seen.insert(reference.detail_url().to_string()) {
                        references.push(reference);
                    }
                }
                None => debug!(target: "listing_harvest::site", "{}: no listing id in {href}", self.name),
            }
        }
        references
    }
}

/// Run settings a built-in site ships with
#[derive(Debug, Clone)]
pub struct SiteDefaults {
    pub pagination: PaginationMode,
    pub max_concurrent_jobs: usize,
}

/// A built-in site: its profile and its default run settings
#[derive(Debug, Clone)]
pub struct BuiltinSite {
    pub profile: SiteProfile,
    pub defaults: SiteDefaults,
}

/// Names accepted by [`builtin`]
pub const BUILTIN_SITES: &[&str] = &["tapaz", "bina", "lalafo"];

/// Look up a built-in site by name
///
/// # Errors
///
/// Returns an error for an unknown name.
pub fn builtin(name: &str) -> Result<BuiltinSite> {
    match name {
        "tapaz" => tapaz::site(),
        "bina" => bina::site(),
        "lalafo" => lalafo::site(),
        other => Err(anyhow!(
            "Unknown site '{other}', expected one of: {}",
            BUILTIN_SITES.join(", ")
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_strategies() {
        assert_eq!(
            ListingIdStrategy::LastPathSegment.listing_id("/items/4123456/").as_deref(),
            Some("4123456")
        );
        assert_eq!(
            ListingIdStrategy::LastDashSegment
                .listing_id("/baku/ads/flat-for-rent-id-104823948")
                .as_deref(),
            Some("104823948")
        );
        assert_eq!(ListingIdStrategy::LastPathSegment.listing_id("/"), None);
    }

    #[test]
    fn scan_resolves_relative_hrefs_and_collapses_duplicates() {
        let profile = SiteProfile::new("test", "https://example.az", "a.card").unwrap();
        let doc = ParsedDocument::parse(
            r#"<a class="card" href="/items/1">a</a>
               <a class="card" href="/items/2">b</a>
               <a class="card" href="/items/1">a again</a>
               <a class="card" href="/">home</a>"#,
        );
        let refs = profile.scan_listings(&doc, 7);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].listing_id(), "1");
        assert_eq!(refs[0].detail_url(), "https://example.az/items/1");
        assert_eq!(refs[1].source_page(), 7);
    }

    #[test]
    fn columns_wrap_extractor_fields() {
        let profile = SiteProfile::new("test", "https://example.az", "a")
            .unwrap()
            .with_extractors(ExtractorSet::new().field("title", |_| None));
        assert_eq!(
            profile.columns(),
            vec!["listing_id", "detail_url", "title", "source_page"]
        );
    }

    #[test]
    fn unknown_builtin_is_rejected() {
        assert!(builtin("craigslist").is_err());
        for name in BUILTIN_SITES {
            assert!(builtin(name).is_ok(), "{name}");
        }
    }
}
