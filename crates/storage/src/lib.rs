//! Storage layer for the room allocation service.

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub mod error;
pub mod repository;
pub mod schema;

pub use error::StorageError;
pub use repository::RoomRepository;
pub use schema::{SyntheticSeedConfig, init_schema, seed_synthetic_data};

/// Create a SQLite connection pool, creating the database file if absent.
pub async fn create_pool(database_path: &str) -> Result<SqlitePool, StorageError> {
    let options = SqliteConnectOptions::new()
        .filename(database_path)
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal);

    SqlitePoolOptions::new()
        .max_connections(8)
        .connect_with(options)
        .await
        .map_err(StorageError::Connection)
}

/// Check database connectivity.
pub async fn check_connection(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(StorageError::Query)?;
    Ok(())
}
