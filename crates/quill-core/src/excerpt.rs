//! # Card Text Helpers
//!
//! Excerpt extraction, tag labels and date labels for preview cards. All
//! functions are total: bad input yields an empty or default string.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Maximum excerpt length in characters before the ellipsis marker.
pub const EXCERPT_LIMIT: usize = 160;

/// Appended to truncated excerpts.
pub const ELLIPSIS: &str = "...";

/// Tag label used when a record has no tags.
pub const DEFAULT_TAG_LABEL: &str = "General";

/// Separator between the (at most two) displayed tags.
pub const TAG_SEPARATOR: &str = " • ";

static MARKUP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("static regex is valid"));
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex is valid"));

/// Plain-text excerpt of an HTML body.
///
/// Tags become spaces, whitespace runs collapse to one space, and text
/// longer than [`EXCERPT_LIMIT`] characters is cut and suffixed with
/// [`ELLIPSIS`].
pub fn excerpt(markup: Option<&str>) -> String {
    let Some(markup) = markup else {
        return String::new();
    };
    let stripped = MARKUP_TAG.replace_all(markup, " ");
    let collapsed = WHITESPACE_RUN.replace_all(&stripped, " ");
    let text = collapsed.trim();

    match text.char_indices().nth(EXCERPT_LIMIT) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

/// The first two tags joined with [`TAG_SEPARATOR`], verbatim.
///
/// Falls back to [`DEFAULT_TAG_LABEL`] only when the joined label is
/// empty, so `["", "a"]` yields `" • a"`.
pub fn tag_label(tags: Option<&[String]>) -> String {
    let label = tags
        .unwrap_or_default()
        .iter()
        .take(2)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(TAG_SEPARATOR);
    if label.is_empty() {
        DEFAULT_TAG_LABEL.to_string()
    } else {
        label
    }
}

/// Medium-length English date label (`Jan 5, 2024`), in UTC.
///
/// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.f]` timestamps
/// (read as UTC) and plain `YYYY-MM-DD` dates. Anything else yields `""`.
pub fn date_label(created_at: Option<&str>) -> String {
    match created_at.map(str::trim).and_then(parse_timestamp) {
        Some(ts) => ts.format("%b %-d, %Y").to_string(),
        None => String::new(),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_body_truncated_to_163_chars() {
        let body = format!("<p>{}</p>", "a".repeat(200));
        let out = excerpt(Some(&body));
        assert_eq!(out.chars().count(), 163);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..160], "a".repeat(160));
    }

    #[test]
    fn exactly_limit_not_truncated() {
        let body = "b".repeat(160);
        assert_eq!(excerpt(Some(&body)), body);
    }

    #[test]
    fn tags_stripped_and_whitespace_collapsed() {
        let out = excerpt(Some("<h1>Title</h1>\n\n<p>First   line<br/>second</p>"));
        assert_eq!(out, "Title First line second");
    }

    #[test]
    fn absent_or_empty_body_yields_empty_excerpt() {
        assert_eq!(excerpt(None), "");
        assert_eq!(excerpt(Some("")), "");
        assert_eq!(excerpt(Some("<p> </p>")), "");
    }

    #[test]
    fn multibyte_truncation_on_char_boundary() {
        let body = "é".repeat(170);
        let out = excerpt(Some(&body));
        assert_eq!(out.chars().count(), 163);
    }

    #[test]
    fn tag_label_takes_first_two() {
        let tags = vec!["x".to_string(), "y".to_string(), "z".to_string()];
        assert_eq!(tag_label(Some(&tags)), "x • y");
    }

    #[test]
    fn tag_label_defaults_to_general() {
        assert_eq!(tag_label(None), "General");
        assert_eq!(tag_label(Some(&[])), "General");
        assert_eq!(tag_label(Some(&[String::new()])), "General");
    }

    #[test]
    fn tag_label_keeps_tags_verbatim() {
        let tags = vec![String::new(), "a".to_string()];
        assert_eq!(tag_label(Some(&tags)), " • a");
        let tags = vec![" rust ".to_string()];
        assert_eq!(tag_label(Some(&tags)), " rust ");
    }

    #[test]
    fn date_label_formats() {
        assert_eq!(date_label(Some("2024-01-05T10:00:00Z")), "Jan 5, 2024");
        assert_eq!(date_label(Some("2024-11-23T23:30:00-02:00")), "Nov 24, 2024");
        assert_eq!(date_label(Some("2023-07-14")), "Jul 14, 2023");
        assert_eq!(date_label(Some("2023-07-14T08:15:00.250")), "Jul 14, 2023");
    }

    #[test]
    fn date_label_degrades_to_empty() {
        assert_eq!(date_label(None), "");
        assert_eq!(date_label(Some("yesterday")), "");
    }
}
