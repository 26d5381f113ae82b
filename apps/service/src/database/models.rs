use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request or response headers, kept sorted so stored JSON is stable.
pub type Headers = BTreeMap<String, String>;

pub const DEFAULT_METHOD: &str = "GET";
pub const DEFAULT_INTERVAL_SECONDS: u64 = 60;

/// Milliseconds since the Unix epoch, UTC.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Monitor model - an HTTP endpoint probed on a fixed interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub interval_seconds: u64,
}

impl Monitor {
    /// Polling interval with the configured floor applied.
    pub fn effective_interval(&self, min_interval: Duration) -> Duration {
        Duration::from_secs(self.interval_seconds).max(min_interval)
    }
}

/// A monitor definition that has not been persisted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMonitor {
    pub name: String,
    pub url: String,
    pub method: String,
    pub headers: Headers,
    pub body: Option<String>,
    pub interval_seconds: u64,
}

impl NewMonitor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            method: DEFAULT_METHOD.to_string(),
            headers: Headers::new(),
            body: None,
            interval_seconds: DEFAULT_INTERVAL_SECONDS,
        }
    }
}

/// Aggregate model - per-minute rollup of one monitor's measurements
///
/// The window is half-open: `[window_start_ms, window_end_ms)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub id: Option<i64>,
    pub monitor_id: i64,
    pub window_start_ms: i64,
    pub window_end_ms: i64,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub error_rate: Option<f64>,
    pub requests: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor(interval_seconds: u64) -> Monitor {
        Monitor {
            id: 1,
            name: "api".to_string(),
            url: "https://example.com".to_string(),
            method: DEFAULT_METHOD.to_string(),
            headers: Headers::new(),
            body: None,
            interval_seconds,
        }
    }

    #[test]
    fn interval_below_floor_is_raised() {
        let floor = Duration::from_secs(5);
        assert_eq!(monitor(1).effective_interval(floor), floor);
        assert_eq!(monitor(0).effective_interval(floor), floor);
        assert_eq!(monitor(30).effective_interval(floor), Duration::from_secs(30));
    }

    #[test]
    fn new_monitor_defaults() {
        let monitor = NewMonitor::new("api", "https://example.com/health");
        assert_eq!(monitor.method, "GET");
        assert_eq!(monitor.interval_seconds, 60);
        assert!(monitor.headers.is_empty());
        assert!(monitor.body.is_none());
    }
}
