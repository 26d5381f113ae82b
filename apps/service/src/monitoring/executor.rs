use std::sync::Arc;

use tracing::{debug, error};

use super::checker::Prober;
use super::types::{Measurement, Outcome};
use crate::database::MeasurementStore;
use crate::database::models::{Monitor, now_millis};

/// Monitoring executor - probes one monitor and records the measurement
pub struct ProbeExecutor {
    prober: Arc<dyn Prober>,
    store: Arc<dyn MeasurementStore>,
}

impl ProbeExecutor {
    pub fn new(prober: Arc<dyn Prober>, store: Arc<dyn MeasurementStore>) -> Self {
        Self { prober, store }
    }

    /// Probe the monitor once and append the result to the store.
    ///
    /// The measurement is stamped when the probe completes, so a row always
    /// lands in a window that is still open when it is written. Always returns
    /// the measurement, even if it could not be stored; a failed write is
    /// logged and the row is lost.
    pub async fn execute(&self, monitor: &Monitor) -> Measurement {
        let outcome = self.prober.probe(monitor).await;
        let mut measurement = Measurement::new(monitor.id, now_millis(), outcome);

        match &measurement.outcome {
            Outcome::Success { status_code, latency_ms, .. } => debug!(
                monitor_id = monitor.id,
                status_code = *status_code,
                latency_ms = *latency_ms,
                "Probe completed"
            ),
            Outcome::Failure { error } => {
                debug!(monitor_id = monitor.id, %error, "Probe failed")
            }
        }

        match self.store.append_measurement(&measurement).await {
            Ok(id) => measurement.id = Some(id),
            Err(e) => error!("Failed to store measurement for monitor {}: {}", monitor.id, e),
        }

        measurement
    }
}
