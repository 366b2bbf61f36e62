//! Status events emitted by the sampling session, and how they render as
//! transient user notifications.

use serde::{Deserialize, Serialize};

/// Severity of a user notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NotificationKind {
    /// Return the `snake_case` string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// A transient message for the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub duration_ms: u32,
}

const SHORT_MS: u32 = 2000;
const LONG_MS: u32 = 3000;

/// Something observable happened in the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatusEvent {
    /// A scan for the named sensor has begun.
    Scanning { sensor: String },
    /// The sensor was found and exposes the expected characteristic.
    Connected { sensor: String },
    /// The location stream is running and samples are being recorded.
    SamplingStarted { sensor: String },
    /// One sample was persisted.
    SampleRecorded {
        count: u64,
        temperature_celsius: f64,
        accuracy_m: Option<f64>,
    },
    /// The session was stopped by the operator (or after a fatal error).
    Stopped,
    /// The sensor link dropped without the operator asking for it.
    Disconnected,
    /// All stored samples were deleted.
    Cleared,
    /// A new sensor was paired.
    Paired { sensor: String },
    /// No advertisement matched within the scan window.
    SensorNotFound { sensor: String },
    /// The sensor connected but lacks the temperature characteristic.
    SensorIncompatible { sensor: String },
    /// Sampling was requested without a live connection.
    NotConnected,
    /// Reading the characteristic failed; the session is torn down.
    SensorReadError { reason: String },
    /// A characteristic value could not be decoded; the sample was skipped.
    PayloadRejected { reason: String },
    /// Writing a sample failed; the session is stopped.
    StorageError { reason: String },
    /// The location stream ended unexpectedly; the session is torn down.
    LocationLost { reason: String },
    /// Pairing a new sensor failed.
    PairingFailed { reason: String },
}

impl StatusEvent {
    /// Render this event as a user notification.
    #[must_use]
    pub fn notification(&self) -> Notification {
        let (kind, message, duration_ms) = match self {
            Self::Scanning { sensor } => (
                NotificationKind::Info,
                format!("Starting scan for {sensor}"),
                SHORT_MS,
            ),
            Self::Connected { sensor } => (
                NotificationKind::Success,
                format!("Sensor {sensor} found, starting sampling"),
                SHORT_MS,
            ),
            Self::SamplingStarted { sensor } => (
                NotificationKind::Success,
                format!("Sampling {sensor}"),
                SHORT_MS,
            ),
            Self::SampleRecorded {
                count,
                temperature_celsius,
                ..
            } => (
                NotificationKind::Success,
                format!("Sample {count}: {temperature_celsius:.2}\u{b0}C"),
                SHORT_MS,
            ),
            Self::Stopped => (
                NotificationKind::Info,
                "Stopped sampling temperature data".to_owned(),
                LONG_MS,
            ),
            Self::Disconnected => (
                NotificationKind::Warning,
                "Sensor disconnected! Press start to reconnect.".to_owned(),
                SHORT_MS,
            ),
            Self::Cleared => (NotificationKind::Info, "Data deleted".to_owned(), SHORT_MS),
            Self::Paired { sensor } => (
                NotificationKind::Success,
                format!("New sensor {sensor} paired successfully"),
                LONG_MS,
            ),
            Self::SensorNotFound { sensor } => (
                NotificationKind::Error,
                format!("Sensor {sensor} not found! Check the sensor and try again."),
                SHORT_MS,
            ),
            Self::SensorIncompatible { sensor } => (
                NotificationKind::Error,
                format!("Sensor {sensor} connected but no temperature characteristic found"),
                SHORT_MS,
            ),
            Self::NotConnected => (
                NotificationKind::Error,
                "Cannot start sampling. BLE device is not connected!".to_owned(),
                LONG_MS,
            ),
            Self::SensorReadError { reason } => (
                NotificationKind::Error,
                format!("Sensor read failed: {reason}"),
                LONG_MS,
            ),
            Self::PayloadRejected { reason } => (
                NotificationKind::Warning,
                format!("Skipped unreadable sensor value: {reason}"),
                SHORT_MS,
            ),
            Self::StorageError { reason } => (
                NotificationKind::Error,
                format!("ERROR - data stopped recording ({reason}). Stop, submit current data and restart."),
                LONG_MS,
            ),
            Self::LocationLost { reason } => (
                NotificationKind::Error,
                format!("Location updates stopped: {reason}"),
                LONG_MS,
            ),
            Self::PairingFailed { reason } => (
                NotificationKind::Error,
                format!("Failed to pair with a new sensor: {reason}"),
                SHORT_MS,
            ),
        };

        Notification {
            kind,
            message,
            duration_ms,
        }
    }
}
