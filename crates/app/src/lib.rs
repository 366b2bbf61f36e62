//! # uhilog-app
//!
//! Application layer: the sampling session, use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `BleTransport` / `BleConnection`: scan, connect, read the temperature characteristic
//!   - `LocationTransport`: one-shot fix and periodic position stream
//!   - `SampleStore`: append, list and delete samples
//!   - `SensorRegistry`: small key/value settings store
//!   - `PermissionGate`, `NotificationSink`, `Clock`: platform services
//! - Define **driving/inbound ports** as use-case structs:
//!   - `SessionController`: start, stop, clear, pair
//!   - `SettingsService`: paired sensor and campaign settings
//!   - `ExportService`: CSV export of the stored samples
//! - Provide **in-process infrastructure** (status bus, event queue) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `uhilog-domain` only (plus `tokio` for channels, timers and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod error;
pub mod ports;
pub mod retry;
pub mod services;
pub mod session;
pub mod status_bus;
