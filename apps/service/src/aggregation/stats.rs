//! Summary statistics over one window of measurements.

use super::window::Window;
use crate::database::models::Aggregate;
use crate::monitoring::types::Measurement;

/// Percentile reported for every window
pub const AGGREGATE_PERCENTILE: f64 = 95.0;

/// Percentile `p` (0-100) of `values` by linear interpolation between the
/// closest ranks (the R-7 method used by numpy and spreadsheets).
///
/// Returns `None` for an empty sample. `p` is clamped into `[0, 100]`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let k = (sorted.len() - 1) as f64 * (p.clamp(0.0, 100.0) / 100.0);
    let f = k.floor();
    let c = k.ceil();

    if f == c {
        return Some(sorted[k as usize]);
    }

    Some(sorted[f as usize] * (c - k) + sorted[c as usize] * (k - f))
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Statistics for one monitor over one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowStats {
    pub requests: u64,
    pub errors: u64,
    pub avg_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
}

impl WindowStats {
    /// Fraction of requests that failed or returned 5xx; `None` with no requests.
    pub fn error_rate(&self) -> Option<f64> {
        (self.requests > 0).then(|| self.errors as f64 / self.requests as f64)
    }

    pub fn into_aggregate(self, monitor_id: i64, window: Window) -> Aggregate {
        Aggregate {
            id: None,
            monitor_id,
            window_start_ms: window.start_ms,
            window_end_ms: window.end_ms,
            avg_latency_ms: self.avg_latency_ms,
            p95_latency_ms: self.p95_latency_ms,
            error_rate: self.error_rate(),
            requests: self.requests,
        }
    }
}

/// Summarize the measurements of one window
pub fn summarize(measurements: &[Measurement]) -> WindowStats {
    let latencies: Vec<f64> = measurements.iter().filter_map(Measurement::latency_ms).collect();

    WindowStats {
        requests: measurements.len() as u64,
        errors: measurements.iter().filter(|m| m.is_error()).count() as u64,
        avg_latency_ms: mean(&latencies),
        p95_latency_ms: percentile(&latencies, AGGREGATE_PERCENTILE),
    }
}
