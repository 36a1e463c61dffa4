//! Time utilities for nsc-core.
//!
//! All claim timestamps are Unix epoch seconds (i64). The current time is
//! always obtained through a [`Clock`] so validity checks stay testable.

use chrono::{DateTime, Months, NaiveDate, TimeZone, Utc};

use crate::error::{NscError, Result};

/// Source of the current time.
pub trait Clock {
    /// Current time as seconds since the Unix epoch.
    fn now(&self) -> i64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// A clock frozen at a fixed instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now(&self) -> i64 {
        self.0
    }
}

/// Parse a start or expiry value.
///
/// Accepted forms:
/// - `""` or `"0"`: unset
/// - `YYYY-MM-DD`: midnight UTC of that day
/// - RFC 3339 timestamp
/// - `<n>h`, `<n>d`, `<n>w`, `<n>M`, `<n>y`: relative to `now`
///
/// `field` names the flag in the returned validation error.
pub fn parse_expiry(field: &str, text: &str, now: i64) -> Result<Option<i64>> {
    let s = text.trim();
    if s.is_empty() || s == "0" {
        return Ok(None);
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| Utc.from_utc_datetime(&dt).timestamp());
        return midnight
            .map(Some)
            .ok_or_else(|| NscError::validation(field, format!("{s:?} is not a valid date")));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(Some(dt.timestamp()));
    }

    parse_relative(s, now)
        .map(Some)
        .ok_or_else(|| NscError::validation(field, format!("{s:?} is not a valid date or duration")))
}

fn parse_relative(s: &str, now: i64) -> Option<i64> {
    let unit = s.chars().last()?;
    let count: u32 = s[..s.len() - unit.len_utf8()].parse().ok()?;
    let base = DateTime::from_timestamp(now, 0)?;
    let at = match unit {
        'h' | 'H' => base.checked_add_signed(chrono::Duration::hours(i64::from(count)))?,
        'd' | 'D' => base.checked_add_signed(chrono::Duration::days(i64::from(count)))?,
        'w' | 'W' => base.checked_add_signed(chrono::Duration::weeks(i64::from(count)))?,
        'M' => base.checked_add_months(Months::new(count))?,
        'y' | 'Y' => base.checked_add_months(Months::new(count.checked_mul(12)?))?,
        _ => return None,
    };
    Some(at.timestamp())
}

/// Render epoch seconds for humans, or `"never"`/`"immediate"` when unset.
pub fn describe(ts: Option<i64>, unset: &str) -> String {
    match ts.and_then(|t| DateTime::from_timestamp(t, 0)) {
        Some(dt) => dt.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        None => unset.to_string(),
    }
}
