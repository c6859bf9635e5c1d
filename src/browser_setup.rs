//! Chromium discovery and launch.
//!
//! Every harvest job launches its own browser process with its own profile
//! directory, so the launcher takes the executable and profile path from the
//! caller instead of resolving them on each call.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use chromiumoxide::fetcher::{BrowserFetcher, BrowserFetcherOptions};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::utils::constants::CHROME_USER_AGENT;

/// Flags passed to every launched browser
///
/// Hides the automation banner and `navigator.webdriver`, and turns off
/// background services a one-page session never needs.
const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-notifications",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-popup-blocking",
    "--disable-background-networking",
    "--disable-breakpad",
    "--disable-features=TranslateUI",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--ignore-certificate-errors",
    "--password-store=basic",
    "--use-mock-keychain",
    "--mute-audio",
];

/// CDP messages newer than chromiumoxide's protocol types; they are dropped
const IGNORED_HANDLER_ERRORS: &[&str] = &[
    "data did not match any variant of untagged enum Message",
    "Failed to deserialize WS response",
];

const BROWSER_COMMANDS: &[&str] = &["chromium", "chromium-browser", "google-chrome", "chrome"];

#[cfg(target_os = "windows")]
const SYSTEM_PATHS: &[&str] = &[
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files\Chromium\Application\chrome.exe",
];

#[cfg(target_os = "macos")]
const SYSTEM_PATHS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/homebrew/bin/chromium",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const SYSTEM_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/usr/local/bin/chromium",
    "/opt/google/chrome/chrome",
];

/// Options for launching one isolated browser process.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    pub executable: PathBuf,
    pub headless: bool,
    pub user_data_dir: PathBuf,
    pub request_timeout: Duration,
}

/// Locate an installed Chrome or Chromium.
///
/// Checked in order: `CHROMIUM_PATH`, well-known install locations for the
/// current OS, then the `PATH` via `which` (not on Windows).
pub async fn find_browser_executable() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os("CHROMIUM_PATH").map(PathBuf::from) {
        if path.exists() {
            info!("Using browser from CHROMIUM_PATH: {}", path.display());
            return Ok(path);
        }
        warn!("Ignoring CHROMIUM_PATH, no such file: {}", path.display());
    }

    if let Some(path) = user_install_path().filter(|p| p.exists()) {
        info!("Using per-user browser install at {}", path.display());
        return Ok(path);
    }

    if let Some(path) = SYSTEM_PATHS.iter().map(PathBuf::from).find(|p| p.exists()) {
        info!("Using browser at {}", path.display());
        return Ok(path);
    }

    if !cfg!(target_os = "windows")
        && let Some(path) = BROWSER_COMMANDS.iter().find_map(|cmd| which(cmd))
    {
        info!("Using browser found on PATH: {}", path.display());
        return Ok(path);
    }

    bail!("no Chrome or Chromium installation found")
}

fn user_install_path() -> Option<PathBuf> {
    if cfg!(target_os = "windows") {
        dirs::data_local_dir().map(|d| d.join(r"Google\Chrome\Application\chrome.exe"))
    } else if cfg!(target_os = "macos") {
        dirs::home_dir()
            .map(|d| d.join("Applications/Google Chrome.app/Contents/MacOS/Google Chrome"))
    } else {
        None
    }
}

fn which(command: &str) -> Option<PathBuf> {
    let output = std::process::Command::new("which").arg(command).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!found.is_empty()).then(|| PathBuf::from(found))
}

/// Download a pinned Chromium build into the user cache directory.
pub async fn download_managed_browser() -> Result<PathBuf> {
    let cache_root = dirs::cache_dir().unwrap_or_else(|| {
        let fallback = std::env::temp_dir();
        warn!("No user cache directory; downloading Chromium under {}", fallback.display());
        fallback
    });
    let install_dir = cache_root.join("listing_harvest").join("chromium");
    std::fs::create_dir_all(&install_dir)
        .with_context(|| format!("Cannot create {}", install_dir.display()))?;

    info!("No local browser found; downloading Chromium into {}", install_dir.display());
    let options = BrowserFetcherOptions::builder()
        .with_path(&install_dir)
        .build()
        .context("Invalid browser fetcher options")?;
    let installed = BrowserFetcher::new(options)
        .fetch()
        .await
        .context("Chromium download failed")?;

    debug!("Chromium installed in {}", installed.folder_path.display());
    Ok(installed.executable_path)
}

/// Find a local browser, falling back to a managed download.
pub async fn resolve_browser_executable() -> Result<PathBuf> {
    match find_browser_executable().await {
        Ok(path) => Ok(path),
        Err(e) => {
            debug!("{e}; trying a managed download");
            download_managed_browser().await
        }
    }
}

/// Launch one browser process and spawn the task that drives its CDP connection.
///
/// The returned handler task must be aborted once the browser is closed.
pub async fn launch_browser(options: &LaunchOptions) -> Result<(Browser, JoinHandle<()>, PathBuf)> {
    ensure_profile_dir(&options.user_data_dir)?;

    let mut builder = BrowserConfigBuilder::default()
        .chrome_executable(options.executable.clone())
        .user_data_dir(options.user_data_dir.clone())
        .request_timeout(options.request_timeout)
        .window_size(1920, 1080)
        .arg(format!("--user-agent={CHROME_USER_AGENT}"));
    builder = if options.headless {
        builder.headless_mode(HeadlessMode::default())
    } else {
        builder.with_head()
    };
    for arg in LAUNCH_ARGS {
        builder = builder.arg(*arg);
    }
    let config = builder
        .build()
        .map_err(|e| anyhow!("Invalid browser config: {e}"))?;

    trace!("Launching {} with profile {}", options.executable.display(), options.user_data_dir.display());
    let (browser, mut handler) = Browser::launch(config)
        .await
        .with_context(|| format!("Cannot launch {}", options.executable.display()))?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let Err(e) = event else {
                continue;
            };
            let message = e.to_string();
            if IGNORED_HANDLER_ERRORS.iter().any(|m| message.contains(m)) {
                trace!("Ignoring CDP message: {message}");
            } else {
                error!("CDP handler error: {e:?}");
            }
        }
        trace!("CDP handler finished");
    });

    Ok((browser, handler_task, options.user_data_dir.clone()))
}

fn ensure_profile_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Cannot create browser profile directory {}", path.display()))
}
