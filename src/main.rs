//! CLI entry point for the bookshelf crawler.

use anyhow::{Context, Result};
use bookshelf_core::{CrawlConfig, Pipeline};
use clap::Parser;
use tracing::{debug, info};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Bookshelf starting");

    let mut config = CrawlConfig::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config.display()))?;
    if let Some(concurrency) = args.concurrency.map(usize::from) {
        // A per-host cap that tracked the global cap keeps tracking it.
        if config.max_connections_per_host >= config.max_concurrent_requests {
            config.max_connections_per_host = concurrency;
        } else {
            config.max_connections_per_host = config.max_connections_per_host.min(concurrency);
        }
        config.max_concurrent_requests = concurrency;
    }
    if let Some(max_pages) = args.max_pages {
        config.max_pages_per_tag = max_pages;
    }
    config
        .ensure_dirs()
        .context("failed to prepare data directories")?;

    let summary = Pipeline::new(config)
        .run()
        .await
        .context("crawl run failed")?;

    debug!(?summary, "Crawl complete");

    Ok(())
}
