//! Time utilities.
//!
//! Timestamps are Unix seconds (UTC). Streaks and daily tasks work on
//! whole UTC days; the leaderboard rollup works on ISO weeks and calendar
//! months.

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Utc};

/// Returns the current Unix timestamp in seconds.
pub fn now_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Number of whole UTC days since the Unix epoch for a timestamp.
pub fn day_number(ts: i64) -> i64 {
    ts.div_euclid(86_400)
}

/// Start (inclusive) of the ISO week (Monday 00:00 UTC) containing `ts`.
pub fn week_start(ts: i64) -> i64 {
    let date = to_date(ts);
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    midnight(monday)
}

/// Start (inclusive) of the calendar month (1st 00:00 UTC) containing `ts`.
pub fn month_start(ts: i64) -> i64 {
    let date = to_date(ts);
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    midnight(first)
}

fn to_date(ts: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .unwrap_or_default()
        .date_naive()
}

fn midnight(date: NaiveDate) -> i64 {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| Utc.from_utc_datetime(&dt).timestamp())
        .unwrap_or_default()
}
