// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing.

use chrono::{DateTime, Utc};

/// Parse a stored timestamp leniently.
///
/// Profiles written by older clients carry RFC3339 strings with millisecond
/// precision; anything that does not parse is treated as absent.
pub fn parse_utc_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn test_parse_accepts_browser_iso_strings() {
        let parsed = parse_utc_rfc3339("2025-08-01T10:15:30.123Z").unwrap();
        assert_eq!(parsed.timestamp_subsec_millis(), 123);
        assert_eq!(
            parsed.with_nanosecond(0),
            Some(Utc.with_ymd_and_hms(2025, 8, 1, 10, 15, 30).unwrap())
        );
    }

    #[test]
    fn test_parse_normalizes_offsets() {
        let parsed = parse_utc_rfc3339("2025-01-02T05:04:05+02:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_utc_rfc3339("last tuesday").is_none());
        assert!(parse_utc_rfc3339("").is_none());
    }
}
