//! PostgreSQL backend: unit of work, catalog reads and schema bootstrap.

mod catalog;
mod rows;
pub mod schema;
mod session;

pub use catalog::PostgresCatalog;
pub use session::{PostgresUnitOfWork, PostgresUnitOfWorkSession};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::StoreResult;

/// Opens a connection pool sized by the configuration.
pub async fn connect(config: &DatabaseConfig) -> StoreResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url())
        .await?;
    tracing::info!(
        host = %config.host,
        database = %config.name,
        max_connections = config.max_connections,
        "Connected to database"
    );
    Ok(pool)
}
