//! # uhilog-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Implement [`SampleStore`](uhilog_app::ports::SampleStore) over the `samples` table
//! - Implement [`SensorRegistry`](uhilog_app::ports::SensorRegistry) over the `settings` table
//! - Manage `SQLite` connection pool lifecycle, including reopening after a failure
//! - Run database migrations (using sqlx embedded migrations)
//!
//! ## Dependency rule
//! Depends on `uhilog-app` (for port traits) and `uhilog-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod error;
pub mod pool;
pub mod sample_store;
pub mod sensor_registry;

pub use pool::{Config, Database, SharedPool};
pub use sample_store::SqliteSampleStore;
pub use sensor_registry::SqliteSensorRegistry;
