//! Human-readable order numbers: `CMD-YYYYMMDD-NNNN`.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};
use uuid::Uuid;

/// Numbers the `sequence`-th order of `date`.
pub fn sequential_order_number(date: NaiveDate, sequence: u64) -> String {
    format!("CMD-{}-{:04}", date.format("%Y%m%d"), sequence)
}

/// Collision fallback: epoch millis plus four hex characters of `salt`.
pub fn fallback_order_number(now: DateTime<Utc>, salt: Uuid) -> String {
    let hex = salt.simple().to_string();
    format!(
        "CMD-{}-{}{}",
        now.format("%Y%m%d"),
        now.timestamp_millis(),
        hex[..4].to_ascii_uppercase()
    )
}

/// `[midnight, next midnight)` of `date`, in UTC.
pub fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = date.and_time(NaiveTime::MIN).and_utc();
    (start, start + TimeDelta::days(1))
}
