//! Observation timestamp parsing
//!
//! The engine carries timestamps as `i64` nanoseconds since the Unix epoch
//! and records them verbatim; it never reorders by time. Parsing happens
//! once at the ingest edge with a caller-supplied chrono format string;
//! date-only formats land at midnight UTC.

use crate::errors::ChartError;
use chrono::{NaiveDate, NaiveDateTime};

pub const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Parse a timestamp field with the given chrono format.
///
/// Tries a full date-time parse first, then falls back to date-only for
/// end-of-day feeds.
pub fn parse_observation_time(s: &str, format: &str) -> Result<i64, ChartError> {
    let trimmed = s.trim();

    if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
        return nanos_since_epoch(datetime, trimmed, format);
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
        let midnight = date.and_hms_opt(0, 0, 0).ok_or_else(|| malformed(trimmed, format))?;
        return nanos_since_epoch(midnight, trimmed, format);
    }

    Err(malformed(trimmed, format))
}

fn nanos_since_epoch(datetime: NaiveDateTime, value: &str, format: &str) -> Result<i64, ChartError> {
    datetime
        .and_utc()
        .timestamp_nanos_opt()
        .ok_or_else(|| malformed(value, format))
}

fn malformed(value: &str, format: &str) -> ChartError {
    ChartError::MalformedTimestamp {
        value: value.to_string(),
        format: format.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_date_only_at_midnight() {
        let nanos = parse_observation_time("2021-07-26", "%Y-%m-%d").unwrap();
        assert_eq!(nanos % (24 * 3600 * NANOS_PER_SEC), 0);
        assert_eq!(nanos, 1_627_257_600 * NANOS_PER_SEC);
    }

    #[test]
    fn parses_full_datetime() {
        let nanos =
            parse_observation_time("2021-07-26 09:36:00", "%Y-%m-%d %H:%M:%S").unwrap();
        assert_eq!(nanos, 1_627_292_160 * NANOS_PER_SEC);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        assert!(parse_observation_time("  2021-07-26 ", "%Y-%m-%d").is_ok());
    }

    #[test]
    fn rejects_mismatched_format() {
        assert!(matches!(
            parse_observation_time("07/26/2021", "%Y-%m-%d"),
            Err(ChartError::MalformedTimestamp { .. })
        ));
    }
}
