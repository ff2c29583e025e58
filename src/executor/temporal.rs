//! Temporal value parsing and calendar arithmetic
//!
//! Temporal values arrive either as epoch milliseconds or as date strings.
//! Strings without an explicit zone are read in the caller's display offset
//! (minutes east of UTC, UTC when absent).

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveDateTime, Offset, TimeZone, Timelike,
    Utc,
};
use serde_json::Value;

use crate::workflow::TimeUnit;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Resolves an optional minute offset to a fixed zone
pub fn zone(offset_minutes: Option<i32>) -> FixedOffset {
    offset_minutes
        .and_then(|m| FixedOffset::east_opt(m.saturating_mul(60)))
        .unwrap_or_else(|| Utc.fix())
}

/// Parses a row value into a zoned timestamp
pub fn parse_timestamp(value: &Value, offset_minutes: Option<i32>) -> Option<DateTime<FixedOffset>> {
    let tz = zone(offset_minutes);
    match value {
        Value::Number(n) => {
            let ms = n.as_f64().filter(|v| v.is_finite())?;
            tz.timestamp_millis_opt(ms as i64).single()
        }
        Value::String(s) => parse_str(s.trim(), &tz),
        _ => None,
    }
}

/// Parses a row value into epoch milliseconds
pub fn parse_epoch_ms(value: &Value, offset_minutes: Option<i32>) -> Option<i64> {
    parse_timestamp(value, offset_minutes).map(|dt| dt.timestamp_millis())
}

fn parse_str(s: &str, tz: &FixedOffset) -> Option<DateTime<FixedOffset>> {
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(tz));
    }

    for format in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return tz.from_local_datetime(&naive).single();
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            let naive = date.and_hms_opt(0, 0, 0)?;
            return tz.from_local_datetime(&naive).single();
        }
    }

    None
}

/// Truncates a timestamp to the start of `unit`, returning epoch milliseconds
pub fn drill(dt: &DateTime<FixedOffset>, unit: TimeUnit) -> Option<i64> {
    let tz = dt.timezone();
    let date = dt.date_naive();

    let (date, hms) = match unit {
        TimeUnit::Year => (NaiveDate::from_ymd_opt(date.year(), 1, 1)?, (0, 0, 0)),
        TimeUnit::Quarter => {
            let month = (date.month0() / 3) * 3 + 1;
            (NaiveDate::from_ymd_opt(date.year(), month, 1)?, (0, 0, 0))
        }
        TimeUnit::Month => (NaiveDate::from_ymd_opt(date.year(), date.month(), 1)?, (0, 0, 0)),
        TimeUnit::Week => {
            let back = i64::from(date.weekday().num_days_from_monday());
            (date.checked_sub_signed(Duration::days(back))?, (0, 0, 0))
        }
        TimeUnit::Day | TimeUnit::Weekday => (date, (0, 0, 0)),
        TimeUnit::Hour => (date, (dt.hour(), 0, 0)),
        TimeUnit::Minute => (date, (dt.hour(), dt.minute(), 0)),
        TimeUnit::Second => (date, (dt.hour(), dt.minute(), dt.second())),
    };

    let naive = date.and_hms_opt(hms.0, hms.1, hms.2)?;
    tz.from_local_datetime(&naive)
        .single()
        .map(|t| t.timestamp_millis())
}

/// Extracts a calendar component
pub fn feature(dt: &DateTime<FixedOffset>, unit: TimeUnit) -> i64 {
    match unit {
        TimeUnit::Year => i64::from(dt.year()),
        TimeUnit::Quarter => i64::from(dt.month0() / 3 + 1),
        TimeUnit::Month => i64::from(dt.month()),
        TimeUnit::Week => i64::from(dt.iso_week().week()),
        TimeUnit::Day => i64::from(dt.day()),
        TimeUnit::Weekday => i64::from(dt.weekday().number_from_monday()),
        TimeUnit::Hour => i64::from(dt.hour()),
        TimeUnit::Minute => i64::from(dt.minute()),
        TimeUnit::Second => i64::from(dt.second()),
    }
}
