// rust/lifeline-store/src/pool.rs
// Pool construction and the startup connectivity check

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use lifeline_core::DbConnectionConfig;

/// Open a connection pool against the shared store.
///
/// `acquire_timeout` bounds how long a caller may wait for a connection;
/// the worker derives it from the poll interval so a stuck pool cannot
/// starve the loop.
pub async fn connect(
    config: &DbConnectionConfig,
    acquire_timeout: Duration,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.pool_size)
        .acquire_timeout(acquire_timeout)
        .connect(&config.connection_url())
        .await
}

/// Sanity check the connection before entering any loop.
pub async fn check_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
