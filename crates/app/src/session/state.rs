//! The single live session and its connection state.

use std::fmt;
use std::time::Duration;

use uhilog_domain::sensor::GattTarget;

use crate::ports::{BleConnection, Subscription};
use crate::retry::RetryPolicy;

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Idle,
    Scanning,
    Connected,
    Sampling,
    Disconnecting,
}

impl ConnectionState {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Scanning => "scanning",
            Self::Connected => "connected",
            Self::Sampling => "sampling",
            Self::Disconnecting => "disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Timings and matching rules of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long `start` scans for the paired sensor.
    pub scan_timeout: Duration,
    /// Pause between connecting and starting the location stream.
    pub settle_delay: Duration,
    /// Requested interval of the location stream.
    pub sample_interval: Duration,
    /// Samples closer than this to the last written one are dropped.
    pub duplicate_window_ms: i64,
    /// How long `pair` scans for a candidate sensor.
    pub pair_scan_timeout: Duration,
    /// Advertised-name prefix accepted by `pair`, case-insensitive.
    pub pair_name_prefix: String,
    /// How long to wait for the adapter to power on.
    pub power_on_timeout: Duration,
    /// Service and characteristic the sensor must expose.
    pub gatt: GattTarget,
    /// Retry policy of registry writes.
    pub retry: RetryPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scan_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(500),
            sample_interval: Duration::from_millis(1000),
            duplicate_window_ms: 50,
            pair_scan_timeout: Duration::from_secs(10),
            pair_name_prefix: "quest".to_owned(),
            power_on_timeout: Duration::from_secs(5),
            gatt: GattTarget::default(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Runtime state of the one live session. Owned by the controller.
///
/// `characteristic` is only set while `device` is, and
/// `location_subscription` only while sampling.
pub(crate) struct Session<C: BleConnection> {
    pub state: ConnectionState,
    /// Bumped on every start and teardown. Events stamped with an older value
    /// are discarded.
    pub generation: u64,
    pub sensor: Option<String>,
    pub device: Option<C>,
    pub characteristic: Option<C::Characteristic>,
    pub location_subscription: Option<Subscription>,
    pub disconnect_watch: Option<Subscription>,
    pub intentional_disconnect: bool,
    pub sample_count: u64,
    pub last_written_millis: Option<i64>,
}

impl<C: BleConnection> Session<C> {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Idle,
            generation: 0,
            sensor: None,
            device: None,
            characteristic: None,
            location_subscription: None,
            disconnect_watch: None,
            intentional_disconnect: false,
            sample_count: 0,
            last_written_millis: None,
        }
    }

    /// Reset per-session fields and enter `Scanning`. Returns the new generation.
    pub fn begin(&mut self, sensor: &str) -> u64 {
        self.generation += 1;
        self.state = ConnectionState::Scanning;
        self.sensor = Some(sensor.to_owned());
        self.intentional_disconnect = false;
        self.sample_count = 0;
        self.last_written_millis = None;
        self.generation
    }

    /// Nothing to tear down.
    pub fn is_released(&self) -> bool {
        self.state == ConnectionState::Idle
            && self.device.is_none()
            && self.characteristic.is_none()
            && self.location_subscription.is_none()
            && self.disconnect_watch.is_none()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            sensor: self.sensor.clone(),
            sample_count: self.sample_count,
            has_device: self.device.is_some(),
            has_characteristic: self.characteristic.is_some(),
            has_location_subscription: self.location_subscription.is_some(),
        }
    }
}

/// Read-only view of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub state: ConnectionState,
    /// Sensor of the current or last session.
    pub sensor: Option<String>,
    pub sample_count: u64,
    pub has_device: bool,
    pub has_characteristic: bool,
    pub has_location_subscription: bool,
}

impl SessionSnapshot {
    /// Idle with every handle released.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.state == ConnectionState::Idle
            && !self.has_device
            && !self.has_characteristic
            && !self.has_location_subscription
    }
}
