//! Test utilities for the listing_harvest test suite
//!
//! `FakeWeb` is an in-memory `SessionFactory` serving canned HTML by URL. It
//! counts open sessions so tests can check the concurrency bound and that
//! every session is closed.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use listing_harvest::harvest_engine::PipelineTimeouts;
use listing_harvest::page_extractor::helpers::{first_attr, first_text, text_value};
use listing_harvest::{
    BrowserSession, ExtractorSet, FetchError, FieldValue, ParsedDocument, RevealInteraction,
    SessionFactory, SiteProfile,
};
use parking_lot::Mutex;

pub const BASE_URL: &str = "https://fake.az";

/// One canned page
#[allow(dead_code)]
#[derive(Debug, Clone, Default)]
pub struct FakePage {
    pub html: String,
    /// Served once the reveal trigger has been clicked
    pub revealed_html: Option<String>,
    /// Time `navigate` blocks for
    pub latency: Duration,
    pub fail_navigation: bool,
    /// Served by `snapshot` after N scrolls (clamped to the last frame)
    pub scroll_frames: Vec<String>,
}

#[allow(dead_code)]
impl FakePage {
    pub fn new(html: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            ..Self::default()
        }
    }

    pub fn revealing(mut self, html: impl Into<String>) -> Self {
        self.revealed_html = Some(html.into());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_navigation: true,
            ..Self::default()
        }
    }

    pub fn scrolling(frames: Vec<String>) -> Self {
        Self {
            html: frames.first().cloned().unwrap_or_default(),
            scroll_frames: frames,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct Inner {
    pages: Mutex<HashMap<String, FakePage>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opened: AtomicUsize,
    closed: AtomicUsize,
    fail_open: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakeWeb {
    inner: Arc<Inner>,
}

#[allow(dead_code)]
impl FakeWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(self, url: impl Into<String>, page: FakePage) -> Self {
        self.inner.pages.lock().insert(url.into(), page);
        self
    }

    pub fn fail_open(&self, fail: bool) {
        self.inner.fail_open.store(fail, Ordering::SeqCst);
    }

    pub fn max_in_flight(&self) -> usize {
        self.inner.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn opened(&self) -> usize {
        self.inner.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.inner.closed.load(Ordering::SeqCst)
    }

    pub fn factory(&self) -> Arc<dyn SessionFactory> {
        Arc::new(self.clone())
    }
}

impl SessionFactory for FakeWeb {
    fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        if self.inner.fail_open.load(Ordering::SeqCst) {
            return Err(FetchError::Launch("fake launch failure".to_string()));
        }
        self.inner.opened.fetch_add(1, Ordering::SeqCst);
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.max_in_flight.fetch_max(now, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            web: Arc::clone(&self.inner),
            page: None,
            revealed: false,
            scrolls: 0,
            closed: false,
        }))
    }
}

struct FakeSession {
    web: Arc<Inner>,
    page: Option<FakePage>,
    revealed: bool,
    scrolls: usize,
    closed: bool,
}

impl FakeSession {
    fn current_html(&self) -> Result<String, FetchError> {
        if self.closed {
            return Err(FetchError::Closed);
        }
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| FetchError::Browser("no page loaded".to_string()))?;

        if !page.scroll_frames.is_empty() {
            let idx = self.scrolls.min(page.scroll_frames.len() - 1);
            return Ok(page.scroll_frames[idx].clone());
        }
        match (&page.revealed_html, self.revealed) {
            (Some(revealed), true) => Ok(revealed.clone()),
            _ => Ok(page.html.clone()),
        }
    }

    fn has(&self, selector: &str) -> Result<bool, FetchError> {
        let sel = scraper::Selector::parse(selector)
            .map_err(|e| FetchError::Selector(format!("{selector}: {e}")))?;
        let html = scraper::Html::parse_document(&self.current_html()?);
        Ok(html.select(&sel).next().is_some())
    }
}

impl BrowserSession for FakeSession {
    fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<(), FetchError> {
        if self.closed {
            return Err(FetchError::Closed);
        }
        let page = self.web.pages.lock().get(url).cloned();
        let Some(page) = page else {
            return Err(FetchError::navigation(url, "404 Not Found"));
        };
        if !page.latency.is_zero() {
            thread::sleep(page.latency);
        }
        if page.fail_navigation {
            return Err(FetchError::navigation(url, "connection reset"));
        }
        self.page = Some(page);
        self.revealed = false;
        self.scrolls = 0;
        Ok(())
    }

    fn wait_for(&mut self, selector: &str, _timeout: Duration) -> Result<bool, FetchError> {
        self.has(selector)
    }

    fn click(&mut self, selector: &str) -> Result<bool, FetchError> {
        if self.has(selector)? {
            self.revealed = true;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.scrolls += 1;
        Ok(())
    }

    fn scroll_to_top(&mut self) -> Result<(), FetchError> {
        Ok(())
    }

    fn snapshot(&mut self) -> Result<ParsedDocument, FetchError> {
        Ok(ParsedDocument::parse(&self.current_html()?))
    }

    fn close(&mut self) -> Result<(), FetchError> {
        if !self.closed {
            self.closed = true;
            self.web.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.web.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Index page linking to `/items/<id>` for each id
#[allow(dead_code)]
pub fn index_html(ids: &[&str]) -> String {
    let links: String = ids
        .iter()
        .map(|id| format!(r#"<a class="listing" href="/items/{id}">Listing {id}</a>"#))
        .collect();
    format!("<html><body><div class=\"grid\">{links}</div></body></html>")
}

/// Detail page before the phone is revealed
#[allow(dead_code)]
pub fn detail_html(title: &str) -> String {
    format!(
        r#"<html><body><h1 class="title">{title}</h1>
           <button class="show-phone">Show</button></body></html>"#
    )
}

/// Detail page after the phone is revealed
#[allow(dead_code)]
pub fn revealed_html(title: &str, phone: &str) -> String {
    format!(
        r#"<html><body><h1 class="title">{title}</h1>
           <div class="phone"><a href="tel:{phone}">{phone}</a></div></body></html>"#
    )
}

/// Detail page served with its phone reveal working
#[allow(dead_code)]
pub fn listing(title: &str, phone: &str) -> FakePage {
    FakePage::new(detail_html(title)).revealing(revealed_html(title, phone))
}

#[allow(dead_code)]
pub fn item_url(id: &str) -> String {
    format!("{BASE_URL}/items/{id}")
}

/// Extractors for the fake detail pages
#[allow(dead_code)]
pub fn test_extractors() -> ExtractorSet {
    ExtractorSet::new()
        .field("title", |doc| text_value(first_text(doc, "h1.title")))
        .field("phone_number", |doc| {
            first_attr(doc, "div.phone a", "href")
                .map(|href| FieldValue::Text(href.replace("tel:", "")))
        })
}

/// Profile for the fake site with a required phone reveal
#[allow(dead_code)]
pub fn test_profile() -> SiteProfile {
    SiteProfile::new("fake", BASE_URL, "a.listing")
        .unwrap()
        .with_reveal(RevealInteraction::required(".show-phone", ".phone"))
        .with_extractors(test_extractors())
}

/// Timeouts with no settle pause so tests run fast
#[allow(dead_code)]
pub fn fast_timeouts() -> PipelineTimeouts {
    PipelineTimeouts {
        page_load: Duration::from_secs(5),
        settle: Duration::ZERO,
        reveal: Duration::from_secs(1),
    }
}

/// All data rows of a CSV file, header excluded
#[allow(dead_code)]
pub fn read_rows(path: &Path) -> Vec<csv::StringRecord> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.records().map(|r| r.unwrap()).collect()
}

/// Header row of a CSV file
#[allow(dead_code)]
pub fn read_header(path: &Path) -> Vec<String> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.headers().unwrap().iter().map(str::to_string).collect()
}
