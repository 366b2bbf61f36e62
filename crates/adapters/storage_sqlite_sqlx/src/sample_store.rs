//! `SQLite` implementation of [`SampleStore`].
//!
//! [`SampleStore::invalidate`] closes the shared pool, so the next call after a
//! storage failure reconnects from scratch.

use std::sync::Arc;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use uhilog_app::ports::{SampleStore, StorageError};
use uhilog_domain::sample::{NumberedSample, Sample};

use crate::error::SqliteError;
use crate::pool::SharedPool;

/// Wrapper for converting database rows into domain [`Sample`].
struct Wrapper(Sample);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self(Sample {
            timestamp_millis: row.try_get("timestamp")?,
            temperature_centi: row.try_get("temperature")?,
            humidity: row.try_get("humidity")?,
            latitude_e7: row.try_get("latitude")?,
            longitude_e7: row.try_get("longitude")?,
            altitude_centi: row.try_get("altitude")?,
            accuracy_centi: row.try_get("accuracy")?,
            speed_centi: row.try_get("speed")?,
        }))
    }
}

/// Wrapper for rows carrying their export row number.
struct NumberedWrapper(NumberedSample);

impl<'r> FromRow<'r, SqliteRow> for NumberedWrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let row_number: i64 = row.try_get("rownumber")?;
        let Wrapper(sample) = Wrapper::from_row(row)?;
        Ok(Self(NumberedSample { row_number, sample }))
    }
}

const INSERT: &str = "INSERT INTO samples (timestamp, temperature, humidity, latitude, longitude, altitude, accuracy, speed) VALUES (?, ?, ?, ?, ?, ?, ?, ?)";
const DELETE_ALL: &str = "DELETE FROM samples";
const SELECT_ALL: &str = "SELECT * FROM samples ORDER BY timestamp";
const SELECT_NUMBERED: &str = "SELECT rowid - (SELECT MIN(rowid) FROM samples) + 1 AS rownumber, * FROM samples ORDER BY rowid";

/// `SQLite`-backed sample table.
pub struct SqliteSampleStore {
    pool: Arc<SharedPool>,
}

impl SqliteSampleStore {
    /// Create a store over the shared database handle.
    #[must_use]
    pub fn new(pool: Arc<SharedPool>) -> Self {
        Self { pool }
    }
}

impl SampleStore for SqliteSampleStore {
    async fn append(&self, sample: Sample) -> Result<(), StorageError> {
        let pool = self.pool.get().await?;
        sqlx::query(INSERT)
            .bind(sample.timestamp_millis)
            .bind(sample.temperature_centi)
            .bind(sample.humidity)
            .bind(sample.latitude_e7)
            .bind(sample.longitude_e7)
            .bind(sample.altitude_centi)
            .bind(sample.accuracy_centi)
            .bind(sample.speed_centi)
            .execute(&pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(())
    }

    async fn delete_all(&self) -> Result<(), StorageError> {
        let pool = self.pool.get().await?;
        let result = sqlx::query(DELETE_ALL)
            .execute(&pool)
            .await
            .map_err(SqliteError::from)?;

        tracing::info!(deleted = result.rows_affected(), "samples deleted");
        Ok(())
    }

    async fn all(&self) -> Result<Vec<Sample>, StorageError> {
        let pool = self.pool.get().await?;
        let rows: Vec<Wrapper> = sqlx::query_as(SELECT_ALL)
            .fetch_all(&pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn numbered(&self) -> Result<Vec<NumberedSample>, StorageError> {
        let pool = self.pool.get().await?;
        let rows: Vec<NumberedWrapper> = sqlx::query_as(SELECT_NUMBERED)
            .fetch_all(&pool)
            .await
            .map_err(SqliteError::from)?;

        Ok(rows.into_iter().map(|w| w.0).collect())
    }

    async fn invalidate(&self) {
        self.pool.invalidate().await;
    }
}
