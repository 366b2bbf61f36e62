//! # uhilog-adapter-ble
//!
//! Active BLE adapter: finds the paired sensor by its advertised name,
//! connects over GATT and reads the temperature characteristic.
//!
//! ## How it works
//!
//! The sensor firmware exposes the current temperature as ASCII text on a
//! readable characteristic. The session reads it once per location fix;
//! nothing is pushed by the sensor.
//!
//! | Item | Default |
//! |------|---------|
//! | Service | `4fafc201-1fb5-459b-8fc2-0bfd3ba9f5c9` |
//! | Characteristic | `beb5483e-36e1-4688-b7f5-ea07361b26a8` |
//! | Read timeout | 10 s |
//!
//! Disconnects are watched on the adapter event stream and pushed into the
//! session's event queue.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `uhilog-app` and `uhilog-domain`.

mod config;
mod connection;
mod error;
mod transport;

pub use config::BleConfig;
pub use connection::BtleplugConnection;
pub use error::AdapterError;
pub use transport::BtleplugTransport;
