//! Article extraction from the blog listing page.
//!
//! Listing page markup is not a stable contract, so extraction never relies
//! on one selector path. It walks a prioritised list of strategies and keeps
//! the first one that produces at least one usable article:
//!
//! | Priority | Strategy | Selector |
//! |----------|----------|----------|
//! | 1-7 | Card | `article`, `.search-result`, `.post`, `.blog-post`, `[class*="post"]`, `.entry`, `.article` |
//! | 8-11 | Link | `h2 a`, `h3 a`, `h4 a`, `.title a`, `a[href*="/en/"]`, `a[href*="blog"]` |
//!
//! Card strategies read title, link, summary and date from the card's
//! children (see [`card`]). Link strategies are the last resort for pages
//! without repeated card markup: each anchor becomes an article with its text
//! as the title and no summary or date.
//!
//! Finding nothing is not an error. The caller logs it and carries on with
//! an empty set, so the previously published feed survives a markup change.

pub mod card;
pub mod dates;

use crate::models::ScrapedArticle;
use itertools::Itertools;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

/// The document could not be treated as markup at all.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("document contains no markup ({bytes} bytes)")]
    NotMarkup { bytes: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StrategyKind {
    Card,
    Link,
}

struct Strategy {
    kind: StrategyKind,
    css: &'static str,
    selector: Selector,
}

static STRATEGIES: Lazy<Vec<Strategy>> = Lazy::new(|| {
    const CARDS: &[&str] = &[
        "article",
        ".search-result",
        ".post",
        ".blog-post",
        "[class*=\"post\"]",
        ".entry",
        ".article",
    ];
    const LINKS: &[&str] = &[
        "h2 a[href], h3 a[href], h4 a[href]",
        ".title a[href]",
        "a[href*=\"/en/\"]",
        "a[href*=\"blog\"]",
    ];

    let cards = CARDS.iter().map(|css| (StrategyKind::Card, *css));
    let links = LINKS.iter().map(|css| (StrategyKind::Link, *css));
    cards
        .chain(links)
        .map(|(kind, css)| Strategy {
            kind,
            css,
            selector: Selector::parse(css).unwrap(),
        })
        .collect()
});

/// Extract up to `per_run_cap` candidate articles from a listing page.
///
/// # Arguments
///
/// * `raw` - The listing page body
/// * `base` - Site origin used to resolve relative links
/// * `per_run_cap` - Maximum number of candidate elements considered
///
/// # Returns
///
/// Articles in page order, deduplicated by link. Empty when no strategy
/// matched anything usable.
///
/// # Errors
///
/// [`ExtractError::NotMarkup`] when the body contains no markup.
#[instrument(level = "info", skip(raw), fields(bytes = raw.len()))]
pub fn extract(
    raw: &str,
    base: &Url,
    per_run_cap: usize,
) -> Result<Vec<ScrapedArticle>, ExtractError> {
    if !raw.contains('<') {
        return Err(ExtractError::NotMarkup { bytes: raw.len() });
    }

    let document = Html::parse_document(raw);
    for strategy in STRATEGIES.iter() {
        let articles = apply(&document, strategy, base, per_run_cap);
        if articles.is_empty() {
            debug!(selector = strategy.css, "Strategy matched nothing usable");
            continue;
        }

        info!(
            count = articles.len(),
            selector = strategy.css,
            kind = ?strategy.kind,
            "Extracted articles"
        );
        return Ok(articles);
    }

    Ok(Vec::new())
}

fn apply(
    document: &Html,
    strategy: &Strategy,
    base: &Url,
    per_run_cap: usize,
) -> Vec<ScrapedArticle> {
    let extract_one = |el: ElementRef<'_>| match strategy.kind {
        StrategyKind::Card => card::extract_card(el, base),
        StrategyKind::Link => card::extract_link(el, base),
    };

    document
        .select(&strategy.selector)
        .filter(|el| strategy.kind == StrategyKind::Link || is_outermost(*el, &strategy.selector))
        .take(per_run_cap)
        .filter_map(extract_one)
        .unique_by(|article| article.link.clone())
        .collect()
}

/// Skip matches nested inside another match of the same selector, e.g. a
/// `.post-title` inside a `.post-card` for `[class*="post"]`.
fn is_outermost(el: ElementRef<'_>, selector: &Selector) -> bool {
    !el.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| selector.matches(&ancestor))
}
