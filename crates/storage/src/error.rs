//! Storage errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection error: {0}")]
    Connection(#[source] sqlx::Error),

    #[error("Schema initialization error: {0}")]
    Schema(#[source] sqlx::Error),

    #[error("Query error: {0}")]
    Query(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Query(err)
    }
}
