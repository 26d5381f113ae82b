//! Minute-aligned aggregation windows.

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

pub const WINDOW_MS: i64 = 60_000;

/// Half-open time window `[start_ms, end_ms)` in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start_ms: i64,
    pub end_ms: i64,
}

impl Window {
    /// The one-minute window that ends at `end_ms`
    pub fn ending_at(end_ms: i64) -> Self {
        Self { start_ms: end_ms - WINDOW_MS, end_ms }
    }

    /// The most recently closed full minute as of `now`
    pub fn closing_at(now: DateTime<Utc>) -> Self {
        Self::ending_at(floor_to_minute(now.timestamp_millis()))
    }

    pub fn start(&self) -> DateTime<Utc> {
        to_datetime(self.start_ms)
    }

    pub fn end(&self) -> DateTime<Utc> {
        to_datetime(self.end_ms)
    }
}

fn to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub fn floor_to_minute(ms: i64) -> i64 {
    ms.div_euclid(WINDOW_MS) * WINDOW_MS
}

/// The first minute boundary strictly after `now`, in epoch milliseconds
pub fn next_minute_boundary(now: DateTime<Utc>) -> i64 {
    floor_to_minute(now.timestamp_millis()) + WINDOW_MS
}

/// Time left from `now` until `boundary_ms`, zero if already past
pub fn delay_until(boundary_ms: i64, now: DateTime<Utc>) -> Duration {
    let remaining = boundary_ms - now.timestamp_millis();
    Duration::from_millis(remaining.max(0) as u64)
}

pub fn delay_until_next_minute(now: DateTime<Utc>) -> Duration {
    delay_until(next_minute_boundary(now), now)
}
