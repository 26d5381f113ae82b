//! Per-minute rollups of raw measurements.
pub mod engine;
pub mod stats;
pub mod window;

pub use engine::{AggregationEngine, TickReport};
pub use stats::{WindowStats, percentile, summarize};
pub use window::{Window, delay_until_next_minute};
