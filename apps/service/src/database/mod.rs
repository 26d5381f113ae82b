/// Database layer
///
/// Store contracts live in `repository` as traits; `LibsqlStore` is the
/// SQLite-backed implementation shared by the scheduler and the aggregation
/// engine.
pub mod migrations;
pub mod models;
pub mod repository;

#[cfg(test)]
pub mod memory;

pub use repository::{
    AggregateStore, LibsqlStore, MeasurementStore, MonitorRegistry, MonitorSource, StoreResult,
};

use std::sync::Arc;

use anyhow::Result;

use crate::config::DatabaseConfig;
use crate::pool::open_pool;

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

/// Open the configured database, apply migrations and return the store.
pub async fn connect(config: &DatabaseConfig) -> Result<Arc<LibsqlStore>> {
    let pool = open_pool(&config.path, config.pool_size).await?;

    {
        let conn = pool.get().await?;
        initialize_database(&conn).await?;
    }

    tracing::info!("Database ready at {}", config.path.display());
    Ok(Arc::new(LibsqlStore::new(pool)))
}
