//! Date/time utilities for newsfeed.
//!
//! Feeds publish timestamps in whatever format their generator prefers. Everything
//! is normalized to a naive [`NaiveDateTime`] and persisted as fixed-width text so
//! that ordering comparisons in SQL stay lexicographic on every backend.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::debug;

/// Storage format for instants (`YYYY-MM-DD HH:MM:SS`).
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// ISO-8601 layouts carrying an explicit offset.
const ISO_WITH_OFFSET: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M:%S%z",
];

/// ISO-8601 layouts without an offset.
const ISO_NAIVE: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Normalize a feed timestamp into a canonical instant.
///
/// Tries RFC-822/RFC-1123 first (the RSS `pubDate` convention, converted to UTC),
/// then ISO-8601 with fractional seconds removed and any offset discarded.
/// Absent or unparseable input yields `now`; this never fails.
pub fn normalize_date(raw: Option<&str>, now: NaiveDateTime) -> NaiveDateTime {
    parse_feed_date(raw).unwrap_or(now)
}

/// Parse a feed timestamp, returning `None` when it is absent or unrecognised.
pub fn parse_feed_date(raw: Option<&str>) -> Option<NaiveDateTime> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return None,
    };

    let parsed = parse_rfc822(raw).or_else(|| parse_iso8601(raw));
    if parsed.is_none() {
        debug!("Could not parse date '{}', using current time", raw);
    }
    parsed
}

fn parse_rfc822(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.naive_utc());
    }
    // chrono knows "UT" and "GMT" but not the "UTC" zone name some feeds emit.
    let prefix = s.strip_suffix(" UTC")?;
    DateTime::parse_from_rfc2822(&format!("{prefix} +0000"))
        .ok()
        .map(|dt| dt.naive_utc())
}

fn parse_iso8601(s: &str) -> Option<NaiveDateTime> {
    let mut cleaned = strip_fractional_seconds(s);
    if cleaned.ends_with('Z') || cleaned.ends_with('z') {
        cleaned.pop();
        cleaned.push_str("+00:00");
    }

    for fmt in ISO_WITH_OFFSET {
        if let Ok(dt) = DateTime::parse_from_str(&cleaned, fmt) {
            // Keep the wall-clock fields, drop the offset.
            return Some(dt.naive_local());
        }
    }
    for fmt in ISO_NAIVE {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(&cleaned, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Remove every `.` followed by digits (e.g. `.123` in `12:00:00.123Z`).
fn strip_fractional_seconds(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '.' && chars.peek().is_some_and(|c| c.is_ascii_digit()) {
            while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                chars.next();
            }
            continue;
        }
        out.push(ch);
    }
    out
}

/// Format an instant for storage.
pub fn to_storage(dt: &NaiveDateTime) -> String {
    dt.format(STORAGE_FORMAT).to_string()
}

/// Parse a stored instant.
///
/// Accepts the storage format and RFC3339 (for rows written by other tools).
pub fn from_storage(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, STORAGE_FORMAT) {
        return Some(dt);
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn now() -> NaiveDateTime {
        at(2025, 3, 1, 12, 0, 0)
    }

    #[test]
    fn test_rfc822_gmt() {
        let dt = normalize_date(Some("Mon, 21 Oct 2024 07:28:00 GMT"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_rfc822_utc_zone_name() {
        assert_eq!(
            parse_feed_date(Some("Mon, 21 Oct 2024 07:28:00 UTC")),
            Some(at(2024, 10, 21, 7, 28, 0))
        );
        assert_eq!(
            parse_feed_date(Some("21 Oct 2024 07:28:00 UTC")),
            Some(at(2024, 10, 21, 7, 28, 0))
        );
    }

    #[test]
    fn test_rfc822_with_offset_is_converted_to_utc() {
        let dt = normalize_date(Some("Mon, 21 Oct 2024 09:28:00 +0200"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_iso_zulu() {
        let dt = normalize_date(Some("2024-10-21T07:28:00Z"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_iso_fractional_seconds() {
        let dt = normalize_date(Some("2024-10-21T07:28:00.123456Z"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_iso_offset_is_discarded() {
        let dt = normalize_date(Some("2024-10-21T07:28:00+05:00"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));

        let dt = normalize_date(Some("2024-10-21T07:28:00.5-0300"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_iso_naive() {
        assert_eq!(
            normalize_date(Some("2024-10-21T07:28:00"), now()),
            at(2024, 10, 21, 7, 28, 0)
        );
        assert_eq!(
            normalize_date(Some("2024-10-21 07:28:00"), now()),
            at(2024, 10, 21, 7, 28, 0)
        );
        assert_eq!(
            normalize_date(Some("2024-10-21"), now()),
            at(2024, 10, 21, 0, 0, 0)
        );
    }

    #[test]
    fn test_surrounding_whitespace() {
        let dt = normalize_date(Some("\n   2024-10-21T07:28:00Z  \n"), now());
        assert_eq!(dt, at(2024, 10, 21, 7, 28, 0));
    }

    #[test]
    fn test_fallback_to_now() {
        assert_eq!(normalize_date(None, now()), now());
        assert_eq!(normalize_date(Some(""), now()), now());
        assert_eq!(normalize_date(Some("   "), now()), now());
        assert_eq!(normalize_date(Some("yesterday afternoon"), now()), now());
        assert_eq!(normalize_date(Some("2024-13-45T99:00:00Z"), now()), now());
    }

    #[test]
    fn test_parse_feed_date_reports_absence() {
        assert_eq!(parse_feed_date(None), None);
        assert_eq!(parse_feed_date(Some("soon")), None);
        assert_eq!(
            parse_feed_date(Some("2024-10-21T07:28:00Z")),
            Some(at(2024, 10, 21, 7, 28, 0))
        );
    }

    #[test]
    fn test_strip_fractional_seconds() {
        assert_eq!(
            strip_fractional_seconds("12:00:00.123Z"),
            "12:00:00Z".to_string()
        );
        assert_eq!(strip_fractional_seconds("v1.0 release"), "v1 release");
        assert_eq!(strip_fractional_seconds("end."), "end.");
    }

    #[test]
    fn test_storage_format() {
        let dt = at(2024, 1, 5, 9, 3, 7);
        assert_eq!(to_storage(&dt), "2024-01-05 09:03:07");
        assert_eq!(from_storage("2024-01-05 09:03:07"), Some(dt));
    }

    #[test]
    fn test_from_storage_rfc3339() {
        assert_eq!(
            from_storage("2024-01-05T10:03:07+01:00"),
            Some(at(2024, 1, 5, 9, 3, 7))
        );
        assert_eq!(from_storage("garbage"), None);
    }

    #[test]
    fn test_storage_strings_sort_chronologically() {
        let earlier = to_storage(&at(2024, 9, 30, 23, 59, 59));
        let later = to_storage(&at(2024, 10, 1, 0, 0, 0));
        assert!(earlier < later);
    }
}
