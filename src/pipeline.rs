//! One end-to-end run: fetch → extract → merge → serialize → write.
//!
//! Stages are plain functions composed in a straight line. Fetch and write
//! failures abort the run; extraction and history failures degrade to empty
//! inputs, so a broken scrape can at worst add nothing to the feed.

use crate::config::{Config, ConfigError};
use crate::fetcher::{self, FetchError};
use crate::merge::{load_existing, merge};
use crate::models::FeedDocument;
use crate::outputs::rss;
use crate::outputs::writer::{WriteError, write_atomic};
use crate::scrapers;
use crate::utils::truncate_for_log;
use chrono::{SubsecRound, Utc};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Failures that end a run with a non-zero exit status.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("fetching listing page failed: {0}")]
    Fetch(#[from] FetchError),
    #[error("rendering feed failed: {0}")]
    Serialize(#[source] std::io::Error),
    #[error(transparent)]
    Write(#[from] WriteError),
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Articles extracted from the listing page.
    pub extracted: usize,
    /// Extracted articles whose link was not in the previous feed.
    pub new: usize,
    /// Items the previous feed held.
    pub previous: usize,
    /// Items in the feed just written.
    pub written: usize,
    pub output_path: PathBuf,
}

/// Run the pipeline once against `config`.
#[instrument(level = "info", skip_all, fields(source = %config.source_url))]
pub async fn run_once(config: &Config) -> Result<RunSummary, PipelineError> {
    let source = config.source()?;
    let origin = config.origin()?;
    let seen_at = Utc::now().trunc_subsecs(0);

    // ---- Fetch ----
    let client = fetcher::build_client(
        &config.fetch.user_agent,
        Duration::from_secs(config.fetch.timeout_secs),
    )?;
    let page = fetcher::fetch(&client, &source, &config.retry_policy()).await?;

    // ---- Extract ----
    let fresh = match scrapers::extract(&page.body, &origin, config.per_run_cap) {
        Ok(articles) => articles,
        Err(e) => {
            warn!(
                error = %e,
                preview = %truncate_for_log(&page.body, 200),
                "Listing page could not be parsed; continuing with no new articles"
            );
            Vec::new()
        }
    };
    if fresh.is_empty() {
        warn!(
            url = %page.url,
            "No articles found on listing page; the page markup may have changed"
        );
    }

    // ---- Merge ----
    let existing = load_existing(&config.output_path).await;
    let previous = existing.len();
    let new = fresh
        .iter()
        .filter(|a| !existing.iter().any(|r| r.link == a.link))
        .count();
    let extracted = fresh.len();
    let items = merge(existing, fresh, config.max_items, seen_at);
    debug!(extracted, new, previous, kept = items.len(), "Merge complete");

    // ---- Serialize & write ----
    let document = FeedDocument {
        meta: config.feed_metadata(),
        last_build: seen_at,
        items,
    };
    let xml = rss::serialize(&document).map_err(PipelineError::Serialize)?;
    write_atomic(&config.output_path, &xml).await?;

    let summary = RunSummary {
        extracted,
        new,
        previous,
        written: document.items.len(),
        output_path: config.output_path.clone(),
    };
    info!(
        extracted = summary.extracted,
        new = summary.new,
        previous = summary.previous,
        written = summary.written,
        path = %summary.output_path.display(),
        "Feed updated"
    );
    Ok(summary)
}
