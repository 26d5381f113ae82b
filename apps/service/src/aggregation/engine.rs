use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::stats::summarize;
use super::window::{Window, delay_until_next_minute};
use crate::database::{AggregateStore, MeasurementStore, MonitorSource};
use crate::shutdown::sleep_or_cancelled;

/// Outcome of one aggregation tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub monitors: usize,
    pub written: usize,
    pub skipped: usize,
    pub failed_writes: usize,
}

/// Pause after a minute boundary before reading the closed window, so appends
/// stamped just before the boundary have reached the store.
pub const SETTLE_DELAY: Duration = Duration::from_secs(2);

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Rolls the previous minute of measurements into one aggregate per monitor
pub struct AggregationEngine {
    measurements: Arc<dyn MeasurementStore>,
    aggregates: Arc<dyn AggregateStore>,
    monitors: Arc<dyn MonitorSource>,
    clock: Clock,
}

impl AggregationEngine {
    pub fn new(
        measurements: Arc<dyn MeasurementStore>,
        aggregates: Arc<dyn AggregateStore>,
        monitors: Arc<dyn MonitorSource>,
    ) -> Self {
        Self { measurements, aggregates, monitors, clock: Arc::new(Utc::now) }
    }

    #[cfg(test)]
    fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Aggregate `window` for every known monitor.
    ///
    /// A monitor whose measurements cannot be read is skipped, and a failed
    /// write only loses that monitor's row; the rest of the tick proceeds.
    pub async fn aggregate_window(&self, window: Window) -> TickReport {
        let mut report = TickReport::default();

        let monitors = match self.monitors.list_monitors().await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!("Failed to list monitors, skipping window {}: {}", window.start(), e);
                return report;
            }
        };
        report.monitors = monitors.len();

        for monitor in &monitors {
            let rows = match self
                .measurements
                .measurements_in_range(monitor.id, window.start_ms, window.end_ms)
                .await
            {
                Ok(rows) => rows,
                Err(e) => {
                    warn!("Failed to read measurements for monitor {}: {}", monitor.id, e);
                    report.skipped += 1;
                    continue;
                }
            };

            let aggregate = summarize(&rows).into_aggregate(monitor.id, window);

            match self.aggregates.append_aggregate(&aggregate).await {
                Ok(_) => {
                    debug!(
                        monitor_id = monitor.id,
                        requests = aggregate.requests,
                        "Stored aggregate"
                    );
                    report.written += 1;
                }
                Err(e) => {
                    error!("Failed to store aggregate for monitor {}: {}", monitor.id, e);
                    report.failed_writes += 1;
                }
            }
        }

        report
    }

    /// Run until `token` is cancelled, aggregating once per minute boundary.
    ///
    /// The first tick happens at the next boundary after start, so windows
    /// line up with whole UTC minutes rather than with process start. Each
    /// tick waits [`SETTLE_DELAY`] past its boundary before reading.
    pub async fn run(&self, token: CancellationToken) {
        info!("Aggregation engine started, waiting for the next minute boundary");

        loop {
            let now = (self.clock)();
            let delay = delay_until_next_minute(now);
            let window =
                Window::closing_at(now + chrono::Duration::milliseconds(delay.as_millis() as i64));

            if !sleep_or_cancelled(&token, delay + SETTLE_DELAY).await {
                break;
            }

            let report = self.aggregate_window(window).await;
            info!(
                "Aggregated {} to {}: {} written, {} skipped, {} failed",
                window.start().format("%H:%M"),
                window.end().format("%H:%M"),
                report.written,
                report.skipped,
                report.failed_writes
            );
        }

        info!("Aggregation engine stopped");
    }

    /// Run the engine on its own task
    pub fn spawn(self, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move { self.run(token).await })
    }
}
