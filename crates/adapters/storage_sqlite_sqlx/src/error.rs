//! Storage-specific error type wrapping sqlx errors.

use uhilog_app::ports::{RegistryError, StorageError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl From<SqliteError> for StorageError {
    fn from(err: SqliteError) -> Self {
        Self::new(err)
    }
}

impl From<SqliteError> for RegistryError {
    fn from(err: SqliteError) -> Self {
        Self::new(err)
    }
}
