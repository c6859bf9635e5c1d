//! Shared configuration constants for listing_harvest
//!
//! Default values used by the config builder, the CLI and the built-in site
//! profiles, kept in one place to avoid magic numbers.

/// Default number of detail-page jobs allowed in flight at once
pub const DEFAULT_MAX_CONCURRENT_JOBS: usize = 5;

/// Upper bound for `max_concurrent_jobs`
///
/// Every in-flight job owns a full browser process, so values past this
/// point exhaust file descriptors long before they add throughput.
pub const MAX_CONCURRENT_JOBS_LIMIT: usize = 256;

/// Upper bound for the number of worker threads
pub const MAX_WORKER_THREADS: usize = 32;

/// Default page load timeout in seconds
pub const DEFAULT_PAGE_LOAD_TIMEOUT_SECS: u64 = 30;

/// Default delay after navigation before interacting with the page
///
/// Listing pages render their contact widgets from script after the load
/// event; two seconds covers the slow tail on all three built-in sites.
pub const DEFAULT_SETTLE_DELAY_MS: u64 = 2000;

/// Default bound on waiting for a reveal trigger and the revealed content
pub const DEFAULT_REVEAL_TIMEOUT_SECS: u64 = 10;

/// Default pause between scrolling to the bottom and re-scanning an index page
pub const DEFAULT_SCROLL_SETTLE_MS: u64 = 3000;

/// Default number of non-growing scroll iterations before giving up
pub const DEFAULT_SCROLL_STALL_LIMIT: u32 = 3;

/// Default CDP request timeout for a launched browser
pub const DEFAULT_BROWSER_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Interval between selector checks while waiting for an element
pub const SELECTOR_POLL_INTERVAL_MS: u64 = 100;

/// Column holding the listing identifier
pub const COLUMN_LISTING_ID: &str = "listing_id";

/// Column holding the detail page URL
pub const COLUMN_DETAIL_URL: &str = "detail_url";

/// Column holding the index page number the listing was found on
pub const COLUMN_SOURCE_PAGE: &str = "source_page";

/// Chrome user agent string for launched browsers
///
/// Updated: 2025-01-29 to Chrome 132 (current stable)
///
/// Reference: https://chromiumdash.appspot.com/schedule
pub const CHROME_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/132.0.6834.160 Safari/537.36";

/// Default worker pool size: `min(32, cpus + 4)`
#[must_use]
pub fn default_worker_threads() -> usize {
    (num_cpus::get() + 4).min(MAX_WORKER_THREADS)
}
