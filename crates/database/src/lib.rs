//! DreamInk Database Crate
//!
//! Connection management and embedded migrations for the `users` store.

use sqlx::SqlitePool;
use dreamink_config::DatabaseConfig;

pub mod connection;
pub mod migrations;
pub mod types;

pub use connection::prepare_database;
pub use migrations::{run_migrations, MIGRATOR};
pub use types::{errors::DatabaseError, DatabaseResult};

/// Prepare the pool and bring the schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(format!("{e:#}")))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(format!("{e:#}")))?;

    Ok(pool)
}
