use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::executor::ProbeExecutor;
use crate::database::models::Monitor;
use crate::shutdown::sleep_or_cancelled;

/// Monitoring scheduler - runs one independent polling task per monitor
pub struct MonitorScheduler {
    executor: Arc<ProbeExecutor>,
    min_interval: Duration,
}

impl MonitorScheduler {
    /// Create a new monitoring scheduler
    ///
    /// Monitors configured below `min_interval` are polled at `min_interval`.
    pub fn new(executor: Arc<ProbeExecutor>, min_interval: Duration) -> Self {
        Self { executor, min_interval }
    }

    /// Schedule a single monitor for periodic checking
    ///
    /// The first probe runs immediately. Each following probe starts
    /// `interval` after the previous one finished, so probes for one monitor
    /// never overlap. The task exits as soon as `token` is cancelled, whether
    /// it is waiting or probing.
    pub fn schedule_monitor(&self, monitor: Monitor, token: CancellationToken) -> JoinHandle<()> {
        let executor = self.executor.clone();
        let interval = monitor.effective_interval(self.min_interval);

        tokio::spawn(async move {
            info!(
                "Started monitor {} ({} {}) every {}s",
                monitor.id,
                monitor.method,
                monitor.url,
                interval.as_secs()
            );

            while !token.is_cancelled() {
                tokio::select! {
                    _ = token.cancelled() => break,
                    measurement = executor.execute(&monitor) => {
                        debug!(
                            monitor_id = monitor.id,
                            error = measurement.is_error(),
                            "Tick finished"
                        );
                    }
                }

                if !sleep_or_cancelled(&token, interval).await {
                    break;
                }
            }

            info!("Stopped monitor {}", monitor.id);
        })
    }

    /// Schedule multiple monitors
    pub fn schedule_monitors(
        &self,
        monitors: Vec<Monitor>,
        token: &CancellationToken,
    ) -> Vec<JoinHandle<()>> {
        monitors.into_iter().map(|monitor| self.schedule_monitor(monitor, token.clone())).collect()
    }
}
