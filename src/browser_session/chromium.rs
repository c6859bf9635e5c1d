//! Chromium-backed browser sessions
//!
//! chromiumoxide is async and its CDP connection is driven by a task on the
//! tokio runtime. Sessions are used from worker-pool threads, so every call
//! is bridged with [`Handle::block_on`]. The runtime's own thread keeps
//! driving IO and timers while a worker is parked in `block_on`.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chromiumoxide::{Browser, Page};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::cleanup::{CleanupResult, cleanup_browser_and_data};
use super::page_timeout::{poll_until, with_call_timeout};
use super::{BrowserSession, FetchError, SessionFactory};
use crate::browser_setup::{LaunchOptions, launch_browser};
use crate::page_extractor::ParsedDocument;
use crate::utils::constants::SELECTOR_POLL_INTERVAL_MS;

const SCROLL_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight); true";
const SCROLL_TOP_SCRIPT: &str = "window.scrollTo(0, 0); true";

/// Settings shared by every session a factory opens
#[derive(Debug, Clone)]
pub struct ChromiumSessionOptions {
    pub executable: PathBuf,
    pub headless: bool,
    /// Parent directory for per-session profile directories
    pub data_root: PathBuf,
    /// Bound on launching the browser and opening its first tab
    pub launch_timeout: Duration,
    /// Bound on any single CDP call that has no caller-supplied timeout
    pub call_timeout: Duration,
    /// chromiumoxide request timeout
    pub request_timeout: Duration,
}

/// Opens one fresh Chromium process per session
///
/// `open` blocks on the runtime behind `handle`, so it must be called from a
/// thread outside that runtime (a worker-pool thread).
pub struct ChromiumSessionFactory {
    handle: Handle,
    options: ChromiumSessionOptions,
}

impl ChromiumSessionFactory {
    #[must_use]
    pub fn new(handle: Handle, options: ChromiumSessionOptions) -> Self {
        Self { handle, options }
    }

    #[must_use]
    pub fn options(&self) -> &ChromiumSessionOptions {
        &self.options
    }
}

impl SessionFactory for ChromiumSessionFactory {
    fn open(&self) -> Result<Box<dyn BrowserSession>, FetchError> {
        let user_data_dir = self
            .options
            .data_root
            .join(format!("listing_harvest_{}", uuid::Uuid::new_v4()));

        let launch = LaunchOptions {
            executable: self.options.executable.clone(),
            headless: self.options.headless,
            user_data_dir: user_data_dir.clone(),
            request_timeout: self.options.request_timeout,
        };

        let launched = self.handle.block_on(with_call_timeout(
            async {
                launch_browser(&launch)
                    .await
                    .map_err(|e| FetchError::Launch(format!("{e:#}")))
            },
            self.options.launch_timeout,
            "launch",
        ));

        let (browser, handler, data_dir) = match launched {
            Ok(parts) => parts,
            Err(e) => {
                remove_profile_dir(&user_data_dir);
                return Err(e);
            }
        };

        let mut session = ChromiumSession {
            handle: self.handle.clone(),
            browser: Some(browser),
            page: None,
            handler: Some(handler),
            data_dir,
            call_timeout: self.options.call_timeout,
        };

        match session.open_blank_page() {
            Ok(page) => {
                session.page = Some(page);
                debug!("Opened browser session in {}", session.data_dir.display());
                Ok(Box::new(session))
            }
            Err(e) => {
                if let Err(close_err) = session.close() {
                    warn!("Failed to close browser after page creation error: {close_err}");
                }
                Err(e)
            }
        }
    }
}

/// One Chromium process with a single tab
pub struct ChromiumSession {
    handle: Handle,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    data_dir: PathBuf,
    call_timeout: Duration,
}

impl ChromiumSession {
    fn open_blank_page(&self) -> Result<Page, FetchError> {
        let browser = self.browser.as_ref().ok_or(FetchError::Closed)?;
        self.handle.block_on(with_call_timeout(
            async {
                browser
                    .new_page("about:blank")
                    .await
                    .map_err(FetchError::browser)
            },
            self.call_timeout,
            "new_page",
        ))
    }

    fn page(&self) -> Result<&Page, FetchError> {
        self.page.as_ref().ok_or(FetchError::Closed)
    }

    fn run_script_bool(&self, script: String, operation: &'static str) -> Result<bool, FetchError> {
        let page = self.page()?;
        self.handle.block_on(with_call_timeout(
            async {
                let result = page.evaluate(script).await.map_err(FetchError::browser)?;
                result.into_value::<bool>().map_err(FetchError::browser)
            },
            self.call_timeout,
            operation,
        ))
    }
}

impl BrowserSession for ChromiumSession {
    fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), FetchError> {
        let page = self.page()?;
        trace!("Navigating to {url}");
        self.handle.block_on(with_call_timeout(
            async {
                page.goto(url)
                    .await
                    .map_err(|e| FetchError::navigation(url, e))?;
                page.wait_for_navigation()
                    .await
                    .map_err(|e| FetchError::navigation(url, e))?;
                Ok(())
            },
            timeout,
            "navigate",
        ))
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, FetchError> {
        scraper::Selector::parse(selector)
            .map_err(|e| FetchError::Selector(format!("{selector}: {e}")))?;

        // querySelector answers "absent" with null, so any error here is the
        // browser or its connection failing
        let quoted = serde_json::to_string(selector).map_err(FetchError::browser)?;
        let script = format!("document.querySelector({quoted}) !== null");
        let script = script.as_str();
        let page = self.page()?;
        let start = Instant::now();

        let found = self.handle.block_on(poll_until(
            move || async move {
                let result = page
                    .evaluate(script.to_string())
                    .await
                    .map_err(FetchError::browser)?;
                result.into_value::<bool>().map_err(FetchError::browser)
            },
            timeout,
            self.call_timeout,
            Duration::from_millis(SELECTOR_POLL_INTERVAL_MS),
            "wait_for",
        ))?;

        if found {
            trace!("{selector} present after {:?}", start.elapsed());
        }
        Ok(found)
    }

    fn click(&mut self, selector: &str) -> Result<bool, FetchError> {
        let quoted = serde_json::to_string(selector).map_err(FetchError::browser)?;
        let script = format!(
            "(() => {{ const el = document.querySelector({quoted}); \
             if (!el) return false; el.click(); return true; }})()"
        );
        self.run_script_bool(script, "click")
    }

    fn scroll_to_bottom(&mut self) -> Result<(), FetchError> {
        self.run_script_bool(SCROLL_BOTTOM_SCRIPT.to_string(), "scroll_to_bottom")
            .map(|_| ())
    }

    fn scroll_to_top(&mut self) -> Result<(), FetchError> {
        self.run_script_bool(SCROLL_TOP_SCRIPT.to_string(), "scroll_to_top")
            .map(|_| ())
    }

    fn snapshot(&mut self) -> Result<ParsedDocument, FetchError> {
        let page = self.page()?;
        let html = self.handle.block_on(with_call_timeout(
            async { page.content().await.map_err(FetchError::browser) },
            self.call_timeout,
            "snapshot",
        ))?;
        Ok(ParsedDocument::parse(&html))
    }

    fn close(&mut self) -> Result<(), FetchError> {
        let Some(mut browser) = self.browser.take() else {
            return Ok(());
        };
        self.page = None;

        let result = self.handle.block_on(cleanup_browser_and_data(
            &mut browser,
            Some(self.data_dir.as_path()),
        ));

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        match result {
            CleanupResult::Success => Ok(()),
            CleanupResult::PartialFailure(errors) => Err(FetchError::Browser(errors.join("; "))),
        }
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.browser.is_none() {
            return;
        }

        // block_on panics inside a runtime context. There, chromiumoxide's own
        // Drop kills the child process and only the directory is left to us.
        if Handle::try_current().is_err() {
            if let Err(e) = self.close() {
                warn!("Browser session cleanup on drop failed: {e}");
            }
            return;
        }

        self.page = None;
        self.browser = None;
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        remove_profile_dir(&self.data_dir);
    }
}

fn remove_profile_dir(path: &Path) {
    if path.exists()
        && let Err(e) = std::fs::remove_dir_all(path)
    {
        warn!("Failed to remove browser profile {}: {e}", path.display());
    }
}
