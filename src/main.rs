//! listing-harvest: harvest classified-ad listings into CSV.
//!
//! Runs one of the built-in site profiles with its default pagination and
//! concurrency, overridable from the command line.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Parser, ValueEnum};
use listing_harvest::harvest_engine::PaginationMode;
use listing_harvest::site;
use listing_harvest::{HarvestConfig, chromium_harvester};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Site {
    Tapaz,
    Bina,
    Lalafo,
}

impl Site {
    fn name(self) -> &'static str {
        match self {
            Self::Tapaz => "tapaz",
            Self::Bina => "bina",
            Self::Lalafo => "lalafo",
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "listing-harvest", version, about = "Harvest classified-ad listings into CSV")]
struct Cli {
    /// Site profile to run
    #[arg(value_enum)]
    site: Site,

    /// First index page (counted sites)
    #[arg(long)]
    start_page: Option<u32>,

    /// Last index page, inclusive (counted sites)
    #[arg(long)]
    end_page: Option<u32>,

    /// Stop scrolling once this many listings are collected (scroll sites)
    #[arg(long)]
    target_count: Option<usize>,

    /// Non-growing scroll iterations before giving up (scroll sites)
    #[arg(long)]
    stall_limit: Option<u32>,

    /// Maximum detail pages in flight
    #[arg(short = 'n', long, env = "HARVEST_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Blocking worker threads
    #[arg(short, long)]
    workers: Option<usize>,

    /// Output CSV path (defaults to <site>.csv)
    #[arg(short, long, env = "HARVEST_OUTPUT")]
    output: Option<PathBuf>,

    /// Show browser windows instead of running headless
    #[arg(long, default_value_t = false)]
    headed: bool,

    /// Cancel any single listing after this many seconds
    #[arg(long)]
    job_timeout: Option<u64>,
}

fn pagination_for(cli: &Cli, default: PaginationMode) -> Result<PaginationMode> {
    match default {
        PaginationMode::Counted {
            url_template,
            start_page,
            end_page,
        } => {
            if cli.target_count.is_some() || cli.stall_limit.is_some() {
                bail!("{} uses numbered pages; use --start-page/--end-page", cli.site.name());
            }
            Ok(PaginationMode::counted(
                url_template,
                cli.start_page.unwrap_or(start_page),
                cli.end_page.unwrap_or(end_page),
            ))
        }
        PaginationMode::Scroll {
            index_url,
            target_count,
            stall_limit,
        } => {
            if cli.start_page.is_some() || cli.end_page.is_some() {
                bail!("{} is an infinite-scroll site; use --target-count", cli.site.name());
            }
            Ok(PaginationMode::scroll(
                index_url,
                cli.target_count.or(target_count),
                cli.stall_limit.unwrap_or(stall_limit),
            ))
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "listing_harvest=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let builtin = site::builtin(cli.site.name())?;

    let mut builder = HarvestConfig::builder()
        .output_path(
            cli.output
                .clone()
                .unwrap_or_else(|| PathBuf::from(format!("{}.csv", cli.site.name()))),
        )
        .pagination(pagination_for(&cli, builtin.defaults.pagination.clone())?)
        .max_concurrent_jobs(cli.concurrency.unwrap_or(builtin.defaults.max_concurrent_jobs))
        .headless(!cli.headed)
        .job_timeout_secs(cli.job_timeout);
    if let Some(workers) = cli.workers {
        builder = builder.worker_threads(workers);
    }
    let config = builder.build()?;

    let harvester = chromium_harvester(config, builtin.profile).await?;

    let shutdown = harvester.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received; finishing in-flight listings");
            shutdown.trigger();
        }
    });

    let summary = harvester.run().await?;
    info!("Execution time: {:.1} seconds", summary.elapsed_secs);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
