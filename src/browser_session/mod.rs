//! Browser session abstraction
//!
//! A session is one isolated browser instance used by exactly one job. The
//! harvest core only talks to the [`BrowserSession`] and [`SessionFactory`]
//! traits; [`ChromiumSessionFactory`] is the production implementation.
//!
//! Session methods are blocking. They are called from worker-pool threads,
//! never from the async scheduler.

pub mod chromium;
pub mod cleanup;
pub mod page_timeout;

use std::time::Duration;

use thiserror::Error;

use crate::page_extractor::ParsedDocument;

pub use chromium::{ChromiumSessionFactory, ChromiumSessionOptions};
pub use cleanup::{CleanupResult, cleanup_browser_and_data};
pub use page_timeout::{poll_until, with_call_timeout};

/// Errors raised by a browser session
#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("browser error: {0}")]
    Browser(String),

    #[error("invalid selector: {0}")]
    Selector(String),

    #[error("session already closed")]
    Closed,
}

impl FetchError {
    /// Returns true if the error was caused by a bounded wait elapsing
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    pub fn browser(err: impl std::fmt::Display) -> Self {
        Self::Browser(err.to_string())
    }

    pub fn navigation(url: &str, err: impl std::fmt::Display) -> Self {
        Self::Navigation {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}

/// One isolated, single-owner browser instance
pub trait BrowserSession: Send {
    /// Load `url` and wait for the navigation to settle, bounded by `timeout`
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError>;

    /// Wait until an element matching `selector` exists
    ///
    /// Returns `Ok(false)` when `timeout` elapses without a match. Browser or
    /// connection failures are returned as errors, not as "absent".
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, FetchError>;

    /// Click the first element matching `selector`
    ///
    /// Returns `Ok(false)` when no element matches.
    fn click(&mut self, selector: &str) -> Result<bool, FetchError>;

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError>;

    fn scroll_to_top(&mut self) -> Result<(), FetchError>;

    /// Parse the current DOM into a read-only document
    fn snapshot(&mut self) -> Result<ParsedDocument, FetchError>;

    /// Release the browser and everything it owns
    ///
    /// Must be idempotent: a second call is a no-op.
    fn close(&mut self) -> Result<(), FetchError>;
}

/// Creates fresh sessions. Shared by all workers.
pub trait SessionFactory: Send + Sync {
    fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError>;
}

/// Scoped owner of a session that closes it on every exit path
///
/// Call [`SessionGuard::close`] on the success path to observe close errors;
/// the `Drop` impl covers early returns and panics and only logs.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    closed: bool,
}

impl SessionGuard {
    #[must_use]
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        Self {
            session,
            closed: false,
        }
    }

    /// Open a session from `factory` and guard it
    pub fn open(factory: &dyn SessionFactory) -> Result<Self, FetchError> {
        factory.open().map(Self::new)
    }

    pub fn session_mut(&mut self) -> &mut dyn BrowserSession {
        self.session.as_mut()
    }

    /// Close the session now and report the result
    pub fn close(mut self) -> Result<(), FetchError> {
        self.closed = true;
        self.session.close()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if !self.closed
            && let Err(e) = self.session.close()
        {
            log::warn!(target: "listing_harvest::session", "Failed to close browser session: {e}");
        }
    }
}
