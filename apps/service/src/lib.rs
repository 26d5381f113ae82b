//! apimon - periodic HTTP endpoint probing with per-minute rollups.
//!
//! Each configured monitor is polled by its own task (`monitoring`). Every
//! probe is stored as a measurement, and an independent task (`aggregation`)
//! summarizes the previous minute for each monitor once per minute boundary.
//! The two sides only meet in the store (`database`).

pub mod aggregation;
pub mod config;
pub mod database;
pub mod error;
pub mod monitoring;
pub mod pool;
pub mod shutdown;
