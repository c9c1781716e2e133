//! Field extraction for a single article card.

use super::dates::parse_published;
use crate::models::ScrapedArticle;
use crate::utils::{clean_text, truncate_chars};
use once_cell::sync::Lazy;
use scraper::{ElementRef, Selector};
use tracing::debug;
use url::Url;

const MAX_TITLE_CHARS: usize = 200;
const MAX_SUMMARY_CHARS: usize = 500;

static HEADING: Lazy<Selector> = Lazy::new(|| Selector::parse("h1, h2, h3, h4").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());
static SUMMARY: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".summary, .excerpt, .description, p:not(.search-result__eyebrow)").unwrap()
});

/// Places a card may keep its date, most specific first.
static DATE_SOURCES: Lazy<Vec<Selector>> = Lazy::new(|| {
    [".search-result__eyebrow", "time", ".date", ".published", "[datetime]"]
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .collect()
});

/// Extract an article from a card element.
///
/// Returns `None` when the card has no usable title or link.
pub fn extract_card(card: ElementRef<'_>, base: &Url) -> Option<ScrapedArticle> {
    let heading = card.select(&HEADING).next();
    let first_link = card.select(&LINK).next();

    let title = heading
        .map(element_text)
        .filter(|t| !t.is_empty())
        .or_else(|| first_link.map(element_text).filter(|t| !t.is_empty()))
        .or_else(|| is_anchor(card).then(|| element_text(card)))
        .filter(|t| !t.is_empty());
    let Some(title) = title else {
        debug!("Discarding card without a title");
        return None;
    };

    let href = heading
        .and_then(|h| h.select(&LINK).next())
        .or(first_link)
        .and_then(|a| a.value().attr("href"))
        .or_else(|| card.value().attr("href"));
    let Some(link) = href.and_then(|href| resolve_link(base, href)) else {
        debug!(%title, "Discarding card without a resolvable link");
        return None;
    };

    let summary = card
        .select(&SUMMARY)
        .map(element_text)
        .find(|t| !t.is_empty())
        .map(|t| truncate_chars(&t, MAX_SUMMARY_CHARS))
        .unwrap_or_default();

    Some(ScrapedArticle {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        link,
        summary,
        published: card_date(card),
    })
}

/// Build an article from a bare anchor, used when no card structure matched.
pub fn extract_link(anchor: ElementRef<'_>, base: &Url) -> Option<ScrapedArticle> {
    let href = anchor.value().attr("href")?;
    if !looks_like_article(href) {
        return None;
    }
    let title = element_text(anchor);
    if title.is_empty() {
        return None;
    }

    Some(ScrapedArticle {
        title: truncate_chars(&title, MAX_TITLE_CHARS),
        link: resolve_link(base, href)?,
        summary: String::new(),
        published: None,
    })
}

fn card_date(card: ElementRef<'_>) -> Option<chrono::DateTime<chrono::Utc>> {
    DATE_SOURCES.iter().find_map(|selector| {
        card.select(selector).find_map(|el| {
            el.value()
                .attr("datetime")
                .and_then(parse_published)
                .or_else(|| parse_published(&element_text(el)))
        })
    })
}

fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}

fn is_anchor(el: ElementRef<'_>) -> bool {
    el.value().name() == "a"
}

/// Resolve `href` against the site origin, keeping only http(s) results.
pub fn resolve_link(base: &Url, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    let mut url = base.join(href).ok()?;
    match url.scheme() {
        "http" | "https" => {
            url.set_fragment(None);
            Some(url.to_string())
        }
        _ => None,
    }
}

/// Filter out navigation links that never point at an article.
pub fn looks_like_article(href: &str) -> bool {
    const SKIP_PATTERNS: &[&str] = &[
        "javascript:",
        "mailto:",
        "#",
        "/search",
        "/tag",
        "/category",
        "google.com/search",
    ];
    let href = href.trim().to_ascii_lowercase();
    !href.is_empty() && !SKIP_PATTERNS.iter().any(|p| href.contains(p))
}
