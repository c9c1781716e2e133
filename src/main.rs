//! # blog_feed
//!
//! Publishes an RSS 2.0 feed for a blog that has none, by scraping its
//! listing page on a schedule.
//!
//! ## Features
//!
//! - Fetches the listing page with bounded retry and exponential backoff
//! - Extracts articles with a prioritized list of selector strategies, so
//!   small markup changes degrade gracefully instead of emptying the feed
//! - Merges each scrape with the previously published feed, which doubles as
//!   the only persistent state
//! - Writes the feed atomically so a web server never serves a partial file
//!
//! ## Usage
//!
//! ```sh
//! blog_feed -o public/feed.xml
//! RSS_OUTPUT_FILE=public/feed.xml blog_feed
//! blog_feed -c blog_feed.yaml
//! ```
//!
//! ## Architecture
//!
//! One invocation is one run of a linear pipeline:
//! 1. **Fetching**: Download the listing page (retrying transient failures)
//! 2. **Extracting**: Turn markup into article records
//! 3. **Merging**: Combine with the stored feed, dedupe, sort, cap
//! 4. **Output**: Render RSS 2.0 and atomically replace the feed file
//!
//! A failed fetch or write exits non-zero and leaves the previous feed intact.

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod fetcher;
mod merge;
mod models;
mod outputs;
mod pipeline;
mod scrapers;
mod utils;

use cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!(version = env!("CARGO_PKG_VERSION"), "blog_feed starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // ---- Resolve configuration ----
    let config = match args.resolve_config().await {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Could not load configuration");
            return Err(e.into());
        }
    };
    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(e.into());
    }
    info!(
        source = %config.source_url,
        output = %config.output_path.display(),
        max_items = config.max_items,
        per_run_cap = config.per_run_cap,
        "Configuration resolved"
    );

    // ---- Run ----
    let result = pipeline::run_once(&config).await;

    let elapsed = start_time.elapsed();
    match result {
        Ok(summary) => {
            info!(
                ?elapsed,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                items = summary.written,
                new = summary.new,
                "Execution complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(
                ?elapsed,
                error = %e,
                "Run failed; previous feed left untouched"
            );
            Err(e.into())
        }
    }
}
