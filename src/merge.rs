//! Combining the previous feed with freshly scraped articles.
//!
//! The feed file written by the last run is the only memory the pipeline
//! has. Each run reads it back, layers the new scrape on top and produces the
//! next item set:
//!
//! 1. Fresh articles come first, then the stored ones, deduplicated by link.
//!    The first occurrence wins, so a fresh title or summary replaces the
//!    stored one.
//! 2. A fresh article without a date keeps the time it was first seen. Only
//!    articles never seen before get the current run's time.
//! 3. Items are stably sorted newest first and cut to the feed size.
//!
//! At most `max_items` fresh articles are considered, in page order. An
//! undated article cut by the cap is absent from history, so it would look
//! brand new on the next run and displace the items kept this time.
//!
//! Since the sort is stable and fresh articles are encountered first, an
//! unchanged page yields an unchanged item set run after run.

use crate::models::{ArticleRecord, ScrapedArticle};
use crate::outputs::rss::{self, ReadError};
use chrono::{DateTime, Utc};
use itertools::Itertools;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

/// The previous feed exists but cannot be used as history.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("failed to read previous feed: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Malformed(#[from] ReadError),
}

/// Read the items of the previously written feed at `path`.
///
/// A missing or unreadable feed means "no history": the error is logged and
/// an empty set is returned, so a corrupt file never blocks a new feed.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_existing(path: &Path) -> Vec<ArticleRecord> {
    match read_history(path).await {
        Ok(Some(items)) => {
            info!(count = items.len(), "Loaded previous feed items");
            items
        }
        Ok(None) => {
            info!("No previous feed; starting with empty history");
            Vec::new()
        }
        Err(e) => {
            warn!(error = %e, "Previous feed unreadable; starting with empty history");
            Vec::new()
        }
    }
}

async fn read_history(path: &Path) -> Result<Option<Vec<ArticleRecord>>, HistoryError> {
    let xml = match fs::read_to_string(path).await {
        Ok(xml) => xml,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(rss::parse_items(&xml)?))
}

/// Merge stored and freshly scraped articles into the next feed item set.
///
/// # Arguments
///
/// * `existing` - Items of the previous feed, newest first
/// * `fresh` - Articles scraped this run, in page order; only the first
///   `max_items` are used
/// * `max_items` - Feed size cap
/// * `seen_at` - Time assigned to undated articles seen for the first time
///
/// # Returns
///
/// At most `max_items` records, unique by link, ordered by `published`
/// descending with ties kept in encounter order.
pub fn merge(
    existing: Vec<ArticleRecord>,
    fresh: Vec<ScrapedArticle>,
    max_items: usize,
    seen_at: DateTime<Utc>,
) -> Vec<ArticleRecord> {
    let first_seen: HashMap<String, DateTime<Utc>> = existing
        .iter()
        .map(|record| (record.link.clone(), record.published))
        .collect();

    if fresh.len() > max_items {
        debug!(
            fresh = fresh.len(),
            max_items, "Considering only the first fresh articles that fit the feed"
        );
    }
    let fresh = fresh.into_iter().take(max_items).map(|article| {
        let fallback = first_seen.get(&article.link).copied().unwrap_or(seen_at);
        ArticleRecord::from_scraped(article, fallback)
    });

    let mut merged: Vec<ArticleRecord> = fresh
        .chain(existing)
        .unique_by(|record| record.link.clone())
        .collect();
    merged.sort_by(|a, b| b.published.cmp(&a.published));

    let dropped = merged.len().saturating_sub(max_items);
    merged.truncate(max_items);
    debug!(kept = merged.len(), dropped, "Merged feed items");
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeedDocument, FeedMetadata};
    use chrono::{Duration, TimeZone};
    use std::collections::HashSet;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, day, 8, 0, 0).unwrap()
    }

    fn link(name: &str) -> String {
        format!("https://blog.example.com/{name}")
    }

    fn stored(name: &str, day: u32) -> ArticleRecord {
        ArticleRecord {
            title: name.to_uppercase(),
            link: link(name),
            summary: format!("stored {name}"),
            published: at(day),
        }
    }

    fn scraped(name: &str, published: Option<DateTime<Utc>>) -> ScrapedArticle {
        ScrapedArticle {
            title: name.to_uppercase(),
            link: link(name),
            summary: format!("fresh {name}"),
            published,
        }
    }

    fn links(items: &[ArticleRecord]) -> Vec<String> {
        items.iter().map(|r| r.link.clone()).collect()
    }

    #[test]
    fn test_cold_start_keeps_extraction_order() {
        let now = at(20);
        let fresh: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|n| scraped(n, None))
            .collect();

        let merged = merge(Vec::new(), fresh, 20, now);

        assert_eq!(
            links(&merged),
            ["a", "b", "c", "d", "e"].map(link).to_vec()
        );
        assert!(merged.iter().all(|r| r.published == now));
    }

    #[test]
    fn test_partial_overlap_updates_and_preserves_first_seen() {
        let existing = vec![stored("a", 3), stored("b", 2), stored("c", 1)];
        let mut updated_a = scraped("a", None);
        updated_a.summary = "changed summary".to_string();
        let fresh = vec![updated_a, scraped("d", None)];
        let now = at(20);

        let merged = merge(existing, fresh, 20, now);

        assert_eq!(merged.len(), 4);
        let a = merged.iter().find(|r| r.link == link("a")).unwrap();
        assert_eq!(a.summary, "changed summary");
        assert_eq!(a.published, at(3));
        let d = merged.iter().find(|r| r.link == link("d")).unwrap();
        assert_eq!(d.published, now);
        assert_eq!(links(&merged), ["d", "a", "b", "c"].map(link).to_vec());
    }

    #[test]
    fn test_fresh_date_replaces_stored_date() {
        let existing = vec![stored("a", 3)];
        let merged = merge(existing, vec![scraped("a", Some(at(5)))], 20, at(20));

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].published, at(5));
        assert_eq!(merged[0].summary, "fresh a");
    }

    #[test]
    fn test_each_link_appears_once() {
        let existing = vec![stored("a", 3), stored("b", 2)];
        let fresh = vec![
            scraped("b", None),
            scraped("a", None),
            scraped("b", Some(at(9))),
        ];

        let merged = merge(existing, fresh, 20, at(20));

        let unique: HashSet<_> = merged.iter().map(|r| r.link.as_str()).collect();
        assert_eq!(unique.len(), merged.len());
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_ordering_is_descending_with_stable_ties() {
        let existing = vec![stored("old", 1), stored("tie-stored", 5)];
        let fresh = vec![
            scraped("tie-fresh", Some(at(5))),
            scraped("newest", Some(at(7))),
            scraped("mid", Some(at(3))),
        ];

        let merged = merge(existing, fresh, 20, at(20));

        assert!(merged.windows(2).all(|w| w[0].published >= w[1].published));
        assert_eq!(
            links(&merged),
            ["newest", "tie-fresh", "tie-stored", "mid", "old"]
                .map(link)
                .to_vec()
        );
    }

    #[test]
    fn test_cap_drops_oldest() {
        let existing: Vec<_> = (1..=10).rev().map(|d| stored(&format!("s{d}"), d)).collect();
        let fresh = vec![scraped("new", None)];

        let merged = merge(existing, fresh, 4, at(20));

        assert_eq!(merged.len(), 4);
        assert_eq!(links(&merged), ["new", "s10", "s9", "s8"].map(link).to_vec());
    }

    #[test]
    fn test_no_fresh_items_passes_history_through() {
        let existing = vec![stored("a", 3), stored("b", 2), stored("c", 1)];
        let merged = merge(existing.clone(), Vec::new(), 20, at(20));
        assert_eq!(merged, existing);
    }

    #[test]
    fn test_repeated_merge_is_idempotent() {
        let page = || vec![scraped("x", None), scraped("y", Some(at(4))), scraped("z", None)];
        let first = merge(Vec::new(), page(), 20, at(10));
        let second = merge(first.clone(), page(), 20, at(10) + Duration::hours(1));

        assert_eq!(first, second);
    }

    #[test]
    fn test_page_larger_than_feed_is_stable_across_runs() {
        let page = || -> Vec<_> { (0..10).map(|i| scraped(&format!("p{i}"), None)).collect() };
        let first = merge(Vec::new(), page(), 5, at(10));
        let second = merge(first.clone(), page(), 5, at(10) + Duration::hours(1));
        let third = merge(second.clone(), page(), 5, at(10) + Duration::hours(2));

        let expected: Vec<_> = (0..5).map(|i| link(&format!("p{i}"))).collect();
        assert_eq!(links(&first), expected);
        assert_eq!(second, first);
        assert_eq!(third, first);
    }

    #[tokio::test]
    async fn test_load_existing_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_existing(&dir.path().join("feed.xml")).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_existing_corrupt_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        std::fs::write(&path, "<rss><channel><item><title>cut off").unwrap();

        assert!(load_existing(&path).await.is_empty());
    }

    #[tokio::test]
    async fn test_load_existing_reads_written_feed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("feed.xml");
        let items = vec![stored("a", 3), stored("b", 2)];
        let doc = FeedDocument {
            meta: FeedMetadata {
                title: "T".to_string(),
                description: "D".to_string(),
                link: link(""),
                language: "en-us".to_string(),
                self_url: None,
            },
            last_build: at(4),
            items: items.clone(),
        };
        std::fs::write(&path, rss::serialize(&doc).unwrap()).unwrap();

        assert_eq!(load_existing(&path).await, items);
    }
}
