//! Date input parsing shared by record inputs and query strings.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Like [`parse_date`], but a bare date means the end of that day.
pub fn parse_date_end(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_milli_opt(23, 59, 59, 999))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn accepts_both_shapes() {
        let d = parse_date("2025-03-01").unwrap();
        assert_eq!((d.year(), d.month(), d.day(), d.hour()), (2025, 3, 1, 0));

        let ts = parse_date("2025-03-01T10:30:00+02:00").unwrap();
        assert_eq!(ts.hour(), 8);
    }

    #[test]
    fn end_bound_covers_the_whole_day() {
        let d = parse_date_end("2025-03-01").unwrap();
        assert_eq!((d.hour(), d.minute(), d.second()), (23, 59, 59));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_date("yesterday").is_none());
        assert!(parse_date_end("").is_none());
    }
}
