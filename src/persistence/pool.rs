//! Connection pool construction.

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;

use crate::config::ServiceConfig;
use crate::error::StartupError;

/// Opens the shared connection pool described by `config`.
///
/// The driver is chosen from the URL scheme (`postgres://`, `sqlite://`).
/// At least one connection is established before returning, so an
/// unreachable database fails startup here.
///
/// # Errors
///
/// Returns [`StartupError::Connect`] if the pool size is zero or the first
/// connection cannot be opened.
pub async fn connect(config: &ServiceConfig) -> Result<AnyPool, StartupError> {
    if config.max_pool_size == 0 {
        return Err(StartupError::Connect(sqlx::Error::Configuration(
            "max_pool_size must be at least 1".into(),
        )));
    }

    sqlx::any::install_default_drivers();

    tracing::info!(
        max_connections = config.max_pool_size,
        acquire_timeout = ?config.acquire_timeout,
        "connecting to database"
    );

    AnyPoolOptions::new()
        .max_connections(config.max_pool_size)
        .acquire_timeout(config.acquire_timeout)
        .connect(&config.database_url)
        .await
        .map_err(|err| {
            tracing::error!(error = %err, "could not open a database connection");
            StartupError::Connect(err)
        })
}
