//! Time and timestamp helpers.
//!
//! Samples are keyed by wall-clock milliseconds since the Unix epoch; the
//! helpers here convert between that key and `chrono` date-times.

use chrono::{DateTime, TimeZone, Utc};

/// UTC timestamp used for jobcodes and exports.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Return the current wall-clock time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert epoch milliseconds into a date-time in the given timezone.
///
/// Returns `None` when the value is outside the range `chrono` can represent.
#[must_use]
pub fn from_millis<Tz: TimeZone>(millis: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(tz))
}
