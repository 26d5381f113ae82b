use serde::{Deserialize, Serialize};

use crate::database::models::Headers;

/// What a single probe attempt observed.
///
/// Exactly one variant is ever recorded, so latency and an error
/// description can never appear together on the same measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum Outcome {
    /// The endpoint answered, with any status code
    Success {
        status_code: u16,
        latency_ms: f64,
        response_size: u64,
        response_headers: Headers,
        body_snippet: String,
    },
    /// The request never produced a response
    Failure { error: String },
}

impl Outcome {
    pub fn failure(error: impl Into<String>) -> Self {
        Outcome::Failure { error: error.into() }
    }
}

/// Recorded outcome of one probe attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Row id, set once the measurement has been stored
    pub id: Option<i64>,

    /// Monitor the probe was issued for
    pub monitor_id: i64,

    /// When the probe started, in epoch milliseconds
    pub timestamp_ms: i64,

    #[serde(flatten)]
    pub outcome: Outcome,
}

impl Measurement {
    pub fn new(monitor_id: i64, timestamp_ms: i64, outcome: Outcome) -> Self {
        Self { id: None, monitor_id, timestamp_ms, outcome }
    }

    pub fn latency_ms(&self) -> Option<f64> {
        match &self.outcome {
            Outcome::Success { latency_ms, .. } => Some(*latency_ms),
            Outcome::Failure { .. } => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match &self.outcome {
            Outcome::Success { status_code, .. } => Some(*status_code),
            Outcome::Failure { .. } => None,
        }
    }

    /// Failures and server errors (5xx) both count against the error rate.
    pub fn is_error(&self) -> bool {
        match &self.outcome {
            Outcome::Success { status_code, .. } => *status_code >= 500,
            Outcome::Failure { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn success(status_code: u16) -> Outcome {
        Outcome::Success {
            status_code,
            latency_ms: 12.5,
            response_size: 2,
            response_headers: Headers::new(),
            body_snippet: "ok".to_string(),
        }
    }

    #[test]
    fn test_error_classification() {
        assert!(!Measurement::new(1, 0, success(200)).is_error());
        assert!(!Measurement::new(1, 0, success(404)).is_error());
        assert!(!Measurement::new(1, 0, success(499)).is_error());
        assert!(Measurement::new(1, 0, success(500)).is_error());
        assert!(Measurement::new(1, 0, success(503)).is_error());
        assert!(Measurement::new(1, 0, Outcome::failure("connection refused")).is_error());
    }

    #[test]
    fn test_latency_only_on_success() {
        let ok = Measurement::new(1, 0, success(200));
        assert_eq!(ok.latency_ms(), Some(12.5));
        assert_eq!(ok.status_code(), Some(200));

        let failed = Measurement::new(1, 0, Outcome::failure("timeout"));
        assert_eq!(failed.latency_ms(), None);
        assert_eq!(failed.status_code(), None);
    }

    #[test]
    fn test_serialized_shape() {
        let failed = Measurement::new(7, 1_700_000_000_000, Outcome::failure("dns error"));
        let json = serde_json::to_value(&failed).unwrap();
        assert_eq!(json["outcome"], "failure");
        assert_eq!(json["error"], "dns error");
        assert!(json.get("latency_ms").is_none());
    }
}
