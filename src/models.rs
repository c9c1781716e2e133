//! Data models for scraped articles and the feed built from them.
//!
//! This module defines the values that flow between pipeline stages:
//! - [`ScrapedArticle`]: one card as the extractor saw it on the listing page
//! - [`ArticleRecord`]: one feed item, with a settled publication time
//! - [`FeedMetadata`] and [`FeedDocument`]: the complete syndication document
//!
//! Every run builds these values from scratch. Nothing here is mutated after
//! construction; each stage consumes one value and produces the next.

use chrono::{DateTime, Utc};

/// An article card as extracted from the listing page.
///
/// `published` is `None` when the card carried no parseable date. The merge
/// stage decides what time such an article gets, so the extractor never
/// invents one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedArticle {
    /// The article headline, whitespace-collapsed and never empty.
    pub title: String,
    /// Absolute URL of the article. Identity key across runs.
    pub link: String,
    /// Short teaser text, empty if the card had none.
    pub summary: String,
    /// Publication time shown on the card, if any.
    pub published: Option<DateTime<Utc>>,
}

/// A single feed item.
///
/// Two records with the same `link` describe the same article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleRecord {
    pub title: String,
    pub link: String,
    pub summary: String,
    /// Publication time as shown by the source, or the time the article was
    /// first seen when the source gave none.
    pub published: DateTime<Utc>,
}

impl ArticleRecord {
    /// Settle a scraped article into a feed item using `fallback` when the card
    /// had no date of its own.
    pub fn from_scraped(article: ScrapedArticle, fallback: DateTime<Utc>) -> Self {
        Self {
            title: article.title,
            link: article.link,
            summary: article.summary,
            published: article.published.unwrap_or(fallback),
        }
    }
}

/// Static channel-level metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedMetadata {
    pub title: String,
    pub description: String,
    /// Canonical link of the site the feed mirrors.
    pub link: String,
    /// RSS language code, e.g. `en-us`.
    pub language: String,
    /// Public URL of the feed file itself, emitted as `atom:link rel="self"`.
    pub self_url: Option<String>,
}

/// The syndication document written at the end of a run.
///
/// `items` are ordered newest first and already capped by the merge stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub meta: FeedMetadata,
    /// Wall-clock time at which this document was assembled.
    pub last_build: DateTime<Utc>,
    pub items: Vec<ArticleRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_from_scraped_keeps_card_date() {
        let card_date = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        let fallback = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let record = ArticleRecord::from_scraped(
            ScrapedArticle {
                title: "Title".to_string(),
                link: "https://example.com/a".to_string(),
                summary: String::new(),
                published: Some(card_date),
            },
            fallback,
        );

        assert_eq!(record.published, card_date);
        assert_eq!(record.link, "https://example.com/a");
    }

    #[test]
    fn test_from_scraped_uses_fallback_without_date() {
        let fallback = Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).unwrap();
        let record = ArticleRecord::from_scraped(
            ScrapedArticle {
                title: "Title".to_string(),
                link: "https://example.com/a".to_string(),
                summary: "Summary".to_string(),
                published: None,
            },
            fallback,
        );

        assert_eq!(record.published, fallback);
        assert_eq!(record.summary, "Summary");
    }
}
