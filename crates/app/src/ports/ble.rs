//! BLE port: scanning, connecting and reading the temperature characteristic.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use uhilog_domain::sensor::{GattTarget, NameFilter};

use crate::ports::events::{EventSink, Subscription};

type BoxError = Box<dyn Error + Send + Sync>;

/// Failure of a BLE operation, with the sub-reason the controller reports.
#[derive(Debug, thiserror::Error)]
pub enum BleError {
    /// The adapter is missing, powered off, or never reported ready.
    #[error("bluetooth adapter is off or unavailable")]
    AdapterOff,

    /// The operation did not complete in time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Starting or stopping a scan failed.
    #[error("scan failed")]
    ScanFailed(#[source] BoxError),

    /// Connecting or discovering services failed.
    #[error("connect failed")]
    ConnectFailed(#[source] BoxError),

    /// Reading the characteristic failed.
    #[error("characteristic read failed")]
    ReadFailed(#[source] BoxError),

    /// Disconnecting failed.
    #[error("disconnect failed")]
    DisconnectFailed(#[source] BoxError),
}

/// A peripheral seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    /// Platform identifier of the peripheral (address or opaque id).
    pub id: String,
    /// Advertised local name.
    pub name: String,
    /// Signal strength, when reported.
    pub rssi: Option<i16>,
}

/// Platform BLE capabilities needed by the session.
pub trait BleTransport: Send + Sync {
    /// Live connection handle produced by [`connect`](Self::connect).
    type Connection: BleConnection;

    /// Wait until the adapter reports it is powered on.
    fn await_powered_on(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), BleError>> + Send;

    /// Scan until an advertisement passes `filter`, or `timeout` elapses.
    ///
    /// Returns `Ok(None)` when nothing matched in time.
    fn scan(
        &self,
        filter: &NameFilter,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Advertisement>, BleError>> + Send;

    /// Connect to a previously scanned peripheral.
    fn connect(
        &self,
        advertisement: &Advertisement,
    ) -> impl Future<Output = Result<Self::Connection, BleError>> + Send;
}

/// An open connection to one peripheral.
pub trait BleConnection: Send + Sync + 'static {
    /// Handle to a discovered characteristic.
    type Characteristic: Clone + Send + Sync + 'static;

    /// Discover services and look up the target characteristic.
    ///
    /// Returns `Ok(None)` when the peripheral does not expose it.
    fn discover(
        &self,
        target: &GattTarget,
    ) -> impl Future<Output = Result<Option<Self::Characteristic>, BleError>> + Send;

    /// Read the current value of a characteristic.
    fn read(
        &self,
        characteristic: &Self::Characteristic,
    ) -> impl Future<Output = Result<Vec<u8>, BleError>> + Send;

    /// Whether the platform still reports the link as up.
    fn is_connected(&self) -> impl Future<Output = bool> + Send;

    /// Close the link.
    fn disconnect(&self) -> impl Future<Output = Result<(), BleError>> + Send;

    /// Push a disconnect event into `sink` when the link drops.
    fn watch_disconnect(&self, sink: EventSink) -> Subscription;
}
