//! Time utilities: timezone-aware calendar days and display formatting.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Parse an IANA timezone name like "Asia/Shanghai".
pub fn parse_timezone(tz: &str) -> Result<Tz> {
    tz.trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid timezone: {tz}"))
}

/// Parse a `YYYY-MM-DD` calendar day.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|e| anyhow::anyhow!("invalid date '{s}' (expected YYYY-MM-DD): {e}"))
}

/// Calendar day of `at` in `tz`.
pub fn local_date(at: DateTime<Utc>, tz: Tz) -> NaiveDate {
    at.with_timezone(&tz).date_naive()
}

/// Short display form used by trend points: `MM/DD HH:MM` in `tz`.
pub fn display_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%m/%d %H:%M").to_string()
}

pub fn clock_time(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz).format("%H:%M:%S").to_string()
}
