//! Timestamp parsing for the loosely formatted date strings the API returns.
//!
//! Event start dates usually carry a UTC offset (`2024-06-01T18:00:00-04:00`),
//! but last-login values and older events may be naive. Naive event starts are
//! read in the local timezone; naive logins are read as UTC.

use chrono::{DateTime, FixedOffset, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// A parsed timestamp that remembers whether it carried an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timestamp {
    Aware(DateTime<FixedOffset>),
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// Parse an API date string. Returns `None` for empty or unrecognised input.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(Timestamp::Aware(dt));
        }
        if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
            return Some(Timestamp::Aware(dt));
        }
        for fmt in NAIVE_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
                return Some(Timestamp::Naive(dt));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Timestamp::Naive)
    }

    /// Whether this instant lies strictly after `now`, judged in the
    /// timestamp's own timezone (local time for naive values).
    pub fn is_after(&self, now: DateTime<Utc>) -> bool {
        match self {
            Timestamp::Aware(dt) => *dt > now.with_timezone(dt.offset()),
            Timestamp::Naive(dt) => *dt > now.with_timezone(&Local).naive_local(),
        }
    }

    /// Normalise to UTC, reading naive values as UTC.
    pub fn to_utc(&self) -> DateTime<Utc> {
        match self {
            Timestamp::Aware(dt) => dt.with_timezone(&Utc),
            Timestamp::Naive(dt) => Utc.from_utc_datetime(dt),
        }
    }
}

/// Sort key for a last-login value: missing logins sort before everything.
pub fn login_sort_key(last_login: Option<DateTime<Utc>>) -> DateTime<Utc> {
    last_login.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// `MM/DD/YYYY`, the format used in archival notes.
pub fn note_date(now: DateTime<Local>) -> String {
    now.format("%m/%d/%Y").to_string()
}
