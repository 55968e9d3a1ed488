//! Date and time parsing for tool arguments

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::domain::error::ValidationError;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a calendar date (`YYYY-MM-DD`). Full timestamps are truncated.
pub fn parse_date(field: &str, input: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.date_naive());
    }
    parse_naive_datetime(trimmed)
        .map(|dt| dt.date())
        .ok_or_else(|| ValidationError::invalid(field, format!("expected YYYY-MM-DD, got \"{}\"", input)))
}

/// Parse a full date-time. Offsets are honoured; naive values are local time.
pub fn parse_datetime(field: &str, input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = parse_naive_datetime(trimmed).ok_or_else(|| {
        ValidationError::invalid(
            field,
            format!("expected an ISO 8601 date-time, got \"{}\"", input),
        )
    })?;

    // DST gaps have no local mapping; fold to the earliest valid instant
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| ValidationError::invalid(field, "time does not exist in the local timezone"))
}

/// Human-readable local rendering of an instant, e.g. "Sun 18 Oct 2026, 15:30"
pub fn human_time(instant: &DateTime<Utc>) -> String {
    instant
        .with_timezone(&Local)
        .format("%a %d %b %Y, %H:%M")
        .to_string()
}

fn parse_naive_datetime(input: &str) -> Option<NaiveDateTime> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn parses_plain_date() {
        let d = parse_date("date", "2026-10-18").unwrap();
        assert_eq!((d.year(), d.month(), d.day()), (2026, 10, 18));
    }

    #[test]
    fn date_truncates_timestamp() {
        let d = parse_date("date", "2026-10-18T23:10:00Z").unwrap();
        assert_eq!(d.day(), 18);
    }

    #[test]
    fn date_rejects_garbage() {
        let err = parse_date("date", "next tuesday").unwrap_err();
        assert!(err.to_string().contains("date"));
    }

    #[test]
    fn datetime_honours_offset() {
        let dt = parse_datetime("date", "2026-10-18T15:30:00+02:00").unwrap();
        assert_eq!(dt.hour(), 13);
        assert_eq!(dt.minute(), 30);
    }

    #[test]
    fn datetime_accepts_naive_local() {
        let dt = parse_datetime("date", "2026-10-18 09:15").unwrap();
        let local = dt.with_timezone(&Local);
        assert_eq!((local.hour(), local.minute()), (9, 15));
    }

    #[test]
    fn human_time_mentions_year() {
        let dt = parse_datetime("date", "2026-10-18T12:00:00Z").unwrap();
        assert!(human_time(&dt).contains("2026"));
    }
}
