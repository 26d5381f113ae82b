use thiserror::Error;

/// Errors raised by the persistence layer.
///
/// None of these are fatal to a running service: probe writes that fail are
/// logged and dropped, and aggregation skips the affected monitor for the tick.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to acquire database connection: {0}")]
    Pool(#[from] deadpool::managed::PoolError<libsql::Error>),

    #[error("Database query failed: {0}")]
    Query(#[from] libsql::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Malformed {table} row {id}: {reason}")]
    Decode { table: &'static str, id: i64, reason: String },
}
