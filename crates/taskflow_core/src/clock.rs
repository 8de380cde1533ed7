//! Wall-clock access for services.
//!
//! Services take a [`Clock`] so tests can pin "now" without sleeping.

use chrono::Utc;

/// Returns the current time in Unix epoch milliseconds.
pub type Clock = fn() -> i64;

/// Current UTC time in epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    Utc::now().timestamp_millis()
}
