pub mod browser_session;
pub mod browser_setup;
pub mod config;
pub mod content_saver;
pub mod harvest_engine;
pub mod page_extractor;
pub mod runtime;
pub mod site;
pub mod utils;

use std::sync::Arc;
use std::time::Duration;

pub use browser_session::{
    BrowserSession, ChromiumSessionFactory, ChromiumSessionOptions, FetchError, SessionFactory,
    SessionGuard,
};
pub use browser_setup::{download_managed_browser, find_browser_executable, launch_browser};
pub use config::HarvestConfig;
pub use content_saver::{CsvSink, RecordSink, SinkError};
pub use harvest_engine::{
    FieldValue, HarvestError, HarvestSummary, Harvester, JobError, ListingReference,
    LogProgress, PaginationMode, ProgressReporter, Record, ShutdownSignal,
};
pub use page_extractor::{ExtractorSet, FieldExtractor, FnExtractor, ParsedDocument};
pub use runtime::{JobHandle, WorkerPool};
pub use site::{ListingIdStrategy, RevealInteraction, SiteProfile};

/// Build a harvester that drives real Chromium sessions
///
/// Resolves the browser executable (downloading a managed build if none is
/// installed) and binds sessions to the current tokio runtime, so this must
/// be called from within one.
///
/// # Errors
///
/// Returns an error if no browser can be found or downloaded.
pub async fn chromium_harvester(
    config: HarvestConfig,
    profile: SiteProfile,
) -> anyhow::Result<Harvester> {
    let executable = browser_setup::resolve_browser_executable().await?;
    let options = ChromiumSessionOptions {
        executable,
        headless: config.headless(),
        data_root: config.chrome_data_root(),
        launch_timeout: config.browser_request_timeout() + Duration::from_secs(30),
        call_timeout: config.browser_request_timeout(),
        request_timeout: config.browser_request_timeout(),
    };
    let sessions = Arc::new(ChromiumSessionFactory::new(
        tokio::runtime::Handle::current(),
        options,
    ));

    Ok(Harvester::new(config, profile, sessions).with_progress(Arc::new(LogProgress)))
}

/// Harvest `profile` with real Chromium sessions until the walk is exhausted
///
/// # Errors
///
/// Returns an error if the browser cannot be resolved or the run aborts.
pub async fn harvest(config: HarvestConfig, profile: SiteProfile) -> anyhow::Result<HarvestSummary> {
    let harvester = chromium_harvester(config, profile).await?;
    Ok(harvester.run().await?)
}
