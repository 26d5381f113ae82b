//! In-memory store used by unit tests, with switchable failure injection.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::models::{Aggregate, Monitor};
use super::repository::{AggregateStore, MeasurementStore, MonitorSource, StoreResult};
use crate::error::StoreError;
use crate::monitoring::types::Measurement;

#[derive(Default)]
pub struct MemoryStore {
    monitors: Mutex<Vec<Monitor>>,
    measurements: Mutex<Vec<Measurement>>,
    aggregates: Mutex<Vec<Aggregate>>,
    failing_reads: Mutex<HashSet<i64>>,
    failing_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with_monitors(monitors: Vec<Monitor>) -> Self {
        Self { monitors: Mutex::new(monitors), ..Self::default() }
    }

    pub fn fail_reads_for(&self, monitor_id: i64) {
        self.failing_reads.lock().unwrap().insert(monitor_id);
    }

    pub fn fail_writes(&self, failing: bool) {
        self.failing_writes.store(failing, Ordering::SeqCst);
    }

    pub fn measurements(&self) -> Vec<Measurement> {
        self.measurements.lock().unwrap().clone()
    }

    pub fn measurements_for(&self, monitor_id: i64) -> usize {
        self.measurements.lock().unwrap().iter().filter(|m| m.monitor_id == monitor_id).count()
    }

    pub fn aggregates(&self) -> Vec<Aggregate> {
        self.aggregates.lock().unwrap().clone()
    }

    fn injected_failure() -> StoreError {
        StoreError::Query(libsql::Error::QueryReturnedNoRows)
    }
}

#[async_trait]
impl MeasurementStore for MemoryStore {
    async fn append_measurement(&self, measurement: &Measurement) -> StoreResult<i64> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        let mut rows = self.measurements.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(Measurement { id: Some(id), ..measurement.clone() });
        Ok(id)
    }

    async fn measurements_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Measurement>> {
        if self.failing_reads.lock().unwrap().contains(&monitor_id) {
            return Err(Self::injected_failure());
        }
        let mut rows: Vec<Measurement> = self
            .measurements
            .lock()
            .unwrap()
            .iter()
            .filter(|m| {
                m.monitor_id == monitor_id && m.timestamp_ms >= start_ms && m.timestamp_ms < end_ms
            })
            .cloned()
            .collect();
        rows.sort_by_key(|m| m.timestamp_ms);
        Ok(rows)
    }
}

#[async_trait]
impl AggregateStore for MemoryStore {
    async fn append_aggregate(&self, aggregate: &Aggregate) -> StoreResult<i64> {
        if self.failing_writes.load(Ordering::SeqCst) {
            return Err(Self::injected_failure());
        }
        let mut rows = self.aggregates.lock().unwrap();
        let id = rows.len() as i64 + 1;
        rows.push(Aggregate { id: Some(id), ..aggregate.clone() });
        Ok(id)
    }

    async fn aggregates_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Aggregate>> {
        let mut rows: Vec<Aggregate> = self
            .aggregates
            .lock()
            .unwrap()
            .iter()
            .filter(|a| {
                a.monitor_id == monitor_id
                    && a.window_start_ms >= start_ms
                    && a.window_start_ms < end_ms
            })
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.window_start_ms);
        Ok(rows)
    }
}

#[async_trait]
impl MonitorSource for MemoryStore {
    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>> {
        Ok(self.monitors.lock().unwrap().clone())
    }
}
