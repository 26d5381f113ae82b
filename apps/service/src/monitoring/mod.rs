/// Monitoring engine module - probes HTTP endpoints on a schedule
///
/// This module is responsible for:
/// - Executing single HTTP probes and recording them (`executor`)
/// - Running one polling task per monitor (`scheduler`)
/// - Validating monitor definitions before they are stored
pub mod checker;
pub mod executor;
pub mod scheduler;
pub mod types;
pub mod validation;

pub use checker::{HttpProber, Prober};
pub use executor::ProbeExecutor;
pub use scheduler::MonitorScheduler;
pub use types::{Measurement, Outcome};
