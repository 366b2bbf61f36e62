//! `SQLite` connection pool setup and migration runner.

use std::str::FromStr;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::Mutex;

use crate::error::SqliteError;

/// Environment variable read by [`Config::from_env`].
pub const DATABASE_URL_ENV: &str = "UHILOG_DATABASE_URL";

/// Configuration for the `SQLite` storage adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:uhilog.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Read configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `UHILOG_DATABASE_URL` is not set.
    pub fn from_env() -> Result<Self, std::env::VarError> {
        Ok(Self {
            database_url: std::env::var(DATABASE_URL_ENV)?,
        })
    }

    /// Build a [`Database`] from this configuration.
    ///
    /// Creates the connection pool, creates the database file if missing,
    /// and runs all pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError`] if the connection or migrations fail.
    pub async fn build(&self) -> Result<Database, SqliteError> {
        Database::initialize(self).await
    }

    fn is_memory(&self) -> bool {
        self.database_url.contains(":memory:")
    }
}

/// Holds the `SQLite` connection pool and provides access to it.
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connect to the database and run migrations.
    ///
    /// An in-memory database lives as long as its connection, so the pool is
    /// capped to a single connection that is never recycled.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError`] if the connection or migrations fail.
    async fn initialize(config: &Config) -> Result<Self, SqliteError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);

        let pool = if config.is_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        } else {
            SqlitePool::connect_with(options).await?
        };

        sqlx::migrate!("./migrations").run(&pool).await?;

        tracing::debug!(url = %config.database_url, "database ready");
        Ok(Self { pool })
    }

    /// Borrow the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Take ownership of the underlying connection pool.
    #[must_use]
    pub fn into_pool(self) -> SqlitePool {
        self.pool
    }
}

/// Connection pool shared by the adapters of one database.
///
/// The pool is opened on first use. [`invalidate`](Self::invalidate) closes
/// it for every holder, and the next [`get`](Self::get) reopens it, so the
/// sample store and the registry always talk to the same database.
pub struct SharedPool {
    config: Config,
    pool: Mutex<Option<SqlitePool>>,
}

impl SharedPool {
    /// Create a handle that opens `config` on first use.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            pool: Mutex::new(None),
        }
    }

    /// Create a handle around an already opened database.
    ///
    /// `config` is used to reopen it after [`invalidate`](Self::invalidate).
    #[must_use]
    pub fn with_database(config: Config, database: Database) -> Self {
        Self {
            config,
            pool: Mutex::new(Some(database.into_pool())),
        }
    }

    /// Return the open pool, reopening the database when needed.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteError`] if reopening fails.
    pub async fn get(&self) -> Result<SqlitePool, SqliteError> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref()
            && !pool.is_closed()
        {
            return Ok(pool.clone());
        }
        let pool = self.config.build().await?.into_pool();
        *guard = Some(pool.clone());
        Ok(pool)
    }

    /// Close the current pool. A no-op when it was never opened.
    pub async fn invalidate(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            tracing::warn!("closing database after failure");
            pool.close().await;
        }
    }
}
