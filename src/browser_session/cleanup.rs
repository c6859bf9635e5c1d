//! Browser and profile directory teardown

use std::path::Path;

use chromiumoxide::Browser;
use log::{debug, warn};

/// Outcome of tearing a session down
#[derive(Debug, Clone)]
pub enum CleanupResult {
    Success,
    /// Teardown finished but one or more steps reported an error
    PartialFailure(Vec<String>),
}

impl CleanupResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Close the browser, reap its process, then delete its profile directory
///
/// Every step runs even when an earlier one fails.
pub async fn cleanup_browser_and_data(
    browser: &mut Browser,
    profile_dir: Option<&Path>,
) -> CleanupResult {
    let mut failures = Vec::new();

    debug!(target: "listing_harvest::cleanup", "Closing browser");
    if let Err(e) = browser.close().await {
        warn!(target: "listing_harvest::cleanup", "Browser did not close cleanly: {e}");
        failures.push(format!("close: {e}"));
    }

    // Reap the child so chromiumoxide does not warn about an unclosed browser
    if let Err(e) = browser.wait().await {
        warn!(target: "listing_harvest::cleanup", "Browser process did not exit cleanly: {e}");
        failures.push(format!("wait: {e}"));
    }

    if let Some(dir) = profile_dir.filter(|d| d.exists()) {
        debug!(target: "listing_harvest::cleanup", "Removing profile directory {}", dir.display());
        if let Err(e) = std::fs::remove_dir_all(dir) {
            warn!(target: "listing_harvest::cleanup", "Cannot remove {}: {e}", dir.display());
            failures.push(format!("remove {}: {e}", dir.display()));
        }
    }

    if failures.is_empty() {
        CleanupResult::Success
    } else {
        CleanupResult::PartialFailure(failures)
    }
}
