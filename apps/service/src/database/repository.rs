use async_trait::async_trait;
use libsql::{Connection, Row, params};

use super::models::{Aggregate, Headers, Monitor, NewMonitor, now_millis};
use crate::error::StoreError;
use crate::monitoring::types::{Measurement, Outcome};
use crate::pool::LibsqlPool;

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only storage for raw probe results
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Persist one measurement, returning its row id
    async fn append_measurement(&self, measurement: &Measurement) -> StoreResult<i64>;

    /// Measurements for a monitor with `start_ms <= ts < end_ms`, oldest first
    async fn measurements_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Measurement>>;
}

/// Append-only storage for per-minute rollups
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Persist one aggregate, returning its row id
    async fn append_aggregate(&self, aggregate: &Aggregate) -> StoreResult<i64>;

    /// Aggregates for a monitor whose window starts in `[start_ms, end_ms)`,
    /// ordered by window start
    async fn aggregates_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Aggregate>>;
}

/// Source of monitor definitions
#[async_trait]
pub trait MonitorSource: Send + Sync {
    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>>;
}

/// Write side of monitor definitions, used by bootstrap tooling
#[async_trait]
pub trait MonitorRegistry: Send + Sync {
    async fn add_monitor(&self, monitor: &NewMonitor) -> StoreResult<i64>;
}

/// LibSQL implementation of every store contract
pub struct LibsqlStore {
    pool: LibsqlPool,
}

impl LibsqlStore {
    pub fn new(pool: LibsqlPool) -> Self {
        Self { pool }
    }

    async fn get_conn(&self) -> StoreResult<deadpool::managed::Object<crate::pool::LibsqlManager>> {
        Ok(self.pool.get().await?)
    }
}

const MEASUREMENT_COLUMNS: &str = "id, monitor_id, ts, status_code, latency_ms, error, response_size, response_headers, response_body_snippet";
const AGGREGATE_COLUMNS: &str = "id, monitor_id, window_start, window_end, avg_latency_ms, p95_latency_ms, error_rate, requests";
const MONITOR_COLUMNS: &str = "id, name, url, method, headers, body, interval_sec";

#[async_trait]
impl MeasurementStore for LibsqlStore {
    async fn append_measurement(&self, measurement: &Measurement) -> StoreResult<i64> {
        let conn = self.get_conn().await?;

        let (status_code, latency_ms, error, response_size, response_headers, snippet) =
            match &measurement.outcome {
                Outcome::Success {
                    status_code,
                    latency_ms,
                    response_size,
                    response_headers,
                    body_snippet,
                } => (
                    Some(*status_code as i64),
                    Some(*latency_ms),
                    None,
                    Some(*response_size as i64),
                    Some(serde_json::to_string(response_headers)?),
                    Some(body_snippet.clone()),
                ),
                Outcome::Failure { error } => (None, None, Some(error.clone()), None, None, None),
            };

        conn.execute(
            "INSERT INTO measurements (monitor_id, ts, status_code, latency_ms, error, response_size, response_headers, response_body_snippet) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                measurement.monitor_id,
                measurement.timestamp_ms,
                status_code,
                latency_ms,
                error,
                response_size,
                response_headers,
                snippet
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn measurements_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Measurement>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {MEASUREMENT_COLUMNS} FROM measurements WHERE monitor_id = ? AND ts >= ? AND ts < ? ORDER BY ts ASC, id ASC"
        );
        let mut rows = conn.query(&sql, params![monitor_id, start_ms, end_ms]).await?;

        let mut measurements = Vec::new();
        while let Some(row) = rows.next().await? {
            measurements.push(measurement_from_row(&row)?);
        }

        Ok(measurements)
    }
}

/// Decode a measurements row, enforcing that exactly one of latency or
/// error is present.
fn measurement_from_row(row: &Row) -> StoreResult<Measurement> {
    let id: i64 = row.get(0)?;
    let status_code: Option<i64> = row.get(3)?;
    let latency_ms: Option<f64> = row.get(4)?;
    let error: Option<String> = row.get(5)?;

    let outcome = match (latency_ms, error) {
        (Some(latency_ms), None) => {
            let status_code =
                status_code.ok_or_else(|| decode_error(id, "latency without status code"))?;
            let headers: Option<String> = row.get(7)?;
            let response_headers = match headers {
                Some(json) if !json.is_empty() => serde_json::from_str::<Headers>(&json)?,
                _ => Headers::new(),
            };

            Outcome::Success {
                status_code: u16::try_from(status_code)
                    .map_err(|_| decode_error(id, "status code out of range"))?,
                latency_ms,
                response_size: row.get::<Option<i64>>(6)?.unwrap_or(0).max(0) as u64,
                response_headers,
                body_snippet: row.get::<Option<String>>(8)?.unwrap_or_default(),
            }
        }
        (None, Some(error)) => Outcome::Failure { error },
        (Some(_), Some(_)) => return Err(decode_error(id, "both latency and error are set")),
        (None, None) => return Err(decode_error(id, "neither latency nor error is set")),
    };

    Ok(Measurement { id: Some(id), monitor_id: row.get(1)?, timestamp_ms: row.get(2)?, outcome })
}

fn decode_error(id: i64, reason: &str) -> StoreError {
    StoreError::Decode { table: "measurements", id, reason: reason.to_string() }
}

#[async_trait]
impl AggregateStore for LibsqlStore {
    async fn append_aggregate(&self, aggregate: &Aggregate) -> StoreResult<i64> {
        let conn = self.get_conn().await?;

        conn.execute(
            "INSERT INTO aggregates (monitor_id, window_start, window_end, avg_latency_ms, p95_latency_ms, error_rate, requests) VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                aggregate.monitor_id,
                aggregate.window_start_ms,
                aggregate.window_end_ms,
                aggregate.avg_latency_ms,
                aggregate.p95_latency_ms,
                aggregate.error_rate,
                aggregate.requests as i64
            ],
        )
        .await?;

        Ok(conn.last_insert_rowid())
    }

    async fn aggregates_in_range(
        &self,
        monitor_id: i64,
        start_ms: i64,
        end_ms: i64,
    ) -> StoreResult<Vec<Aggregate>> {
        let conn = self.get_conn().await?;
        let sql = format!(
            "SELECT {AGGREGATE_COLUMNS} FROM aggregates WHERE monitor_id = ? AND window_start >= ? AND window_start < ? ORDER BY window_start ASC"
        );
        let mut rows = conn.query(&sql, params![monitor_id, start_ms, end_ms]).await?;

        let mut aggregates = Vec::new();
        while let Some(row) = rows.next().await? {
            aggregates.push(Aggregate {
                id: Some(row.get(0)?),
                monitor_id: row.get(1)?,
                window_start_ms: row.get(2)?,
                window_end_ms: row.get(3)?,
                avg_latency_ms: row.get(4)?,
                p95_latency_ms: row.get(5)?,
                error_rate: row.get(6)?,
                requests: row.get::<i64>(7)?.max(0) as u64,
            });
        }

        Ok(aggregates)
    }
}

#[async_trait]
impl MonitorSource for LibsqlStore {
    async fn list_monitors(&self) -> StoreResult<Vec<Monitor>> {
        let conn = self.get_conn().await?;
        let sql = format!("SELECT {MONITOR_COLUMNS} FROM monitors ORDER BY id ASC");
        let mut rows = conn.query(&sql, ()).await?;

        let mut monitors = Vec::new();
        while let Some(row) = rows.next().await? {
            let headers: Option<String> = row.get(4)?;
            let headers = match headers {
                Some(json) if !json.is_empty() => serde_json::from_str::<Headers>(&json)?,
                _ => Headers::new(),
            };

            monitors.push(Monitor {
                id: row.get(0)?,
                name: row.get(1)?,
                url: row.get(2)?,
                method: row.get(3)?,
                headers,
                body: row.get(5)?,
                interval_seconds: row.get::<i64>(6)?.max(0) as u64,
            });
        }

        Ok(monitors)
    }
}

#[async_trait]
impl MonitorRegistry for LibsqlStore {
    async fn add_monitor(&self, monitor: &NewMonitor) -> StoreResult<i64> {
        let conn = self.get_conn().await?;
        insert_monitor(&conn, monitor).await
    }
}

async fn insert_monitor(conn: &Connection, monitor: &NewMonitor) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO monitors (name, url, method, headers, body, interval_sec, created_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
        params![
            monitor.name.clone(),
            monitor.url.clone(),
            monitor.method.to_uppercase(),
            serde_json::to_string(&monitor.headers)?,
            monitor.body.clone(),
            monitor.interval_seconds as i64,
            now_millis()
        ],
    )
    .await?;

    Ok(conn.last_insert_rowid())
}
