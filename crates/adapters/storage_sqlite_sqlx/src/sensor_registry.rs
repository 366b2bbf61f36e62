//! `SQLite` implementation of [`SensorRegistry`] over the `settings` table.

use std::sync::Arc;

use uhilog_app::ports::{RegistryError, RegistryKey, SensorRegistry};

use crate::error::SqliteError;
use crate::pool::SharedPool;

const SELECT_BY_KEY: &str = "SELECT value FROM settings WHERE key = ?";
const UPSERT: &str = "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value";

/// `SQLite`-backed key-value registry.
///
/// Shares its pool with the sample store, so it follows the store when a
/// failure forces a reopen.
pub struct SqliteSensorRegistry {
    pool: Arc<SharedPool>,
}

impl SqliteSensorRegistry {
    /// Create a registry over the shared database handle.
    #[must_use]
    pub fn new(pool: Arc<SharedPool>) -> Self {
        Self { pool }
    }
}

impl SensorRegistry for SqliteSensorRegistry {
    async fn get(&self, key: RegistryKey) -> Result<Option<String>, RegistryError> {
        let pool = self.pool.get().await?;
        let row: Option<(String,)> = sqlx::query_as(SELECT_BY_KEY)
            .bind(key.as_str())
            .fetch_optional(&pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(row.map(|(value,)| value))
    }

    async fn set(&self, key: RegistryKey, value: &str) -> Result<(), RegistryError> {
        let pool = self.pool.get().await?;
        sqlx::query(UPSERT)
            .bind(key.as_str())
            .bind(value)
            .execute(&pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(())
    }
}
