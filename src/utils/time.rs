// src/utils/time.rs

//! Timestamp parsing and formatting.
//!
//! Every timestamp that crosses a file boundary is normalized to UTC.
//! Values without an offset are taken to already be UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse an ISO-8601 style timestamp into UTC.
///
/// Accepts RFC 3339 (`Z` or numeric offset), the space-separated form, naive
/// date-times and bare dates. Returns `None` for anything else.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(raw, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Format a timestamp as RFC 3339 with an explicit `+00:00` offset.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::AutoSi, false)
}

/// Format a timestamp at minute resolution for upstream date-range queries.
pub fn format_query_bound(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d%H%M").to_string()
}

/// Calendar stamp used in output paths.
pub fn date_stamp(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_zulu() {
        let parsed = parse_timestamp("2024-06-09T12:00:00Z").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_offset_normalized_to_utc() {
        let parsed = parse_timestamp("2024-06-09T20:00:00+08:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap());

        let spaced = parse_timestamp("2024-06-09 14:00:00+02:00").unwrap();
        assert_eq!(spaced, Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_naive_assumed_utc() {
        let parsed = parse_timestamp("2024-06-09T12:00:00.250").unwrap();
        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap()
                + chrono::Duration::milliseconds(250)
        );

        let date_only = parse_timestamp("2024-06-09").unwrap();
        assert_eq!(date_only, Utc.with_ymd_and_hms(2024, 6, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("2024-13-40").is_none());
    }

    #[test]
    fn test_formatting() {
        let at = Utc.with_ymd_and_hms(2024, 6, 7, 8, 9, 0).unwrap();
        assert_eq!(format_timestamp(at), "2024-06-07T08:09:00+00:00");
        assert_eq!(format_query_bound(at), "202406070809");
        assert_eq!(date_stamp(at), "20240607");
        assert_eq!(parse_timestamp(&format_timestamp(at)), Some(at));
    }
}
