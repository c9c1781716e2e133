//! Text helpers shared by the extractor and logging.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// Scraped text nodes are joined with spaces, so this also removes the
/// padding introduced by nested inline elements.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(clean_text("  Hello \n\t world  "), "Hello world");
/// ```
pub fn clean_text(text: &str) -> String {
    let text = strip_xml_invalid(text);
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Whether `c` matches the XML 1.0 `Char` production.
fn is_xml_char(c: char) -> bool {
    matches!(
        c,
        '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}'
    )
}

/// Drop characters that may not appear in an XML document, even escaped.
///
/// HTML parsers happily decode references like `&#x8;`; writing them into
/// the feed would make it malformed.
pub fn strip_xml_invalid(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

/// Keep at most `max` characters of `s`, never splitting a character.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].trim_end().to_string(),
        None => s.to_string(),
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to `max` bytes (backing off to a character boundary)
/// with an ellipsis and the number of dropped bytes appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  Hello \n\t world  "), "Hello world");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text("single"), "single");
    }

    #[test]
    fn test_clean_text_drops_control_characters() {
        assert_eq!(clean_text("Bad\u{8}title\u{1}"), "Badtitle");
        assert_eq!(clean_text("tab\tand\u{0}nul"), "tab andnul");
    }

    #[test]
    fn test_strip_xml_invalid() {
        assert!(matches!(strip_xml_invalid("plain é ✓"), Cow::Borrowed(_)));
        assert_eq!(strip_xml_invalid("a\u{1F}b\u{FFFE}c\nd"), "abc\nd");
        assert_eq!(strip_xml_invalid("emoji 🦀"), "emoji 🦀");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("ab cd", 3), "ab");
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte_boundary() {
        let result = truncate_for_log("ééé", 3);
        assert_eq!(result, "é…(+4 bytes)");
    }
}
