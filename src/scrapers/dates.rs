//! Publication date parsing for article cards.
//!
//! Blogs print dates in a handful of shapes. Google's developer blog uses an
//! upper-case "eyebrow" such as `AUG. 1, 2025 / SEARCH`; other themes use
//! `<time datetime="...">` or plain ISO dates. Anything that does not match a
//! known shape yields `None`. A wrong date is worse than none, because the
//! merge stage substitutes the first-seen time for missing dates.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];

static MONTH_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(jan(uary)?|feb(ruary)?|mar(ch)?|apr(il)?|may|june?|july?|aug(ust)?|sept?(ember)?|oct(ober)?|nov(ember)?|dec(ember)?)\b",
    )
    .unwrap()
});

// "AUG." -> "AUG", "Sept." -> "Sept"
static ABBREVIATION_DOT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Za-z]{3,9})\.").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").unwrap());

/// Parse a card's date text into a UTC timestamp.
///
/// Date-only values become midnight UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let text = eyebrow_date(raw);
    let text = ABBREVIATION_DOT.replace_all(text, "$1");
    let text = WORD.replace_all(&text, |caps: &regex::Captures<'_>| title_case(&caps[0]));
    let text = normalize_month(&text);

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text.trim(), fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Eyebrows carry tags after a slash: "AUG. 1, 2025 / TAGS". Only text that
/// names a month is cut, so numeric dates keep their slashes.
fn eyebrow_date(text: &str) -> &str {
    match text.split_once('/') {
        Some((date_part, _)) if MONTH_NAME.is_match(date_part) => date_part.trim(),
        _ => text,
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    }
}

// chrono only knows three-letter and full month names.
fn normalize_month(text: &str) -> String {
    text.replacen("Sept ", "Sep ", 1)
}
