//! Use-case errors.
//!
//! Mid-session failures never surface here: they are handled by the session
//! and reported through the status stream. These are the synchronous
//! failures of `start`, `clear`, `pair`, settings and export.

use std::error::Error;

use uhilog_domain::error::ValidationError;

use crate::ports::{BleError, LocationError, RegistryError, RegistryKey, StorageError};
use crate::session::ConnectionState;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Location or Bluetooth permission is missing.
    #[error("location and bluetooth permissions are required")]
    PermissionDenied,

    /// No advertisement matched within the scan window.
    #[error("sensor {0} not found")]
    SensorNotFound(String),

    /// The sensor connected but lacks the temperature characteristic.
    #[error("sensor {0} does not expose the temperature characteristic")]
    SensorIncompatible(String),

    /// Sampling was requested without a live connection.
    #[error("sensor is not connected")]
    NotConnected,

    /// The operation is not allowed while sampling.
    #[error("operation not allowed while sampling")]
    SamplingInProgress,

    /// Another session operation is in progress.
    #[error("session is busy ({0})")]
    Busy(ConnectionState),

    /// The start was aborted by a concurrent stop or disconnect.
    #[error("start was cancelled")]
    Cancelled,

    /// No sensor has been paired yet.
    #[error("no sensor paired")]
    NotPaired,

    #[error(transparent)]
    Ble(#[from] BleError),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Failure to read or save settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A stored or submitted value breaks a domain rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The write could not be verified by reading it back.
    #[error("could not save {0}")]
    NotVerified(RegistryKey),
}

/// Failure to produce a CSV export.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("cannot export while sampling")]
    SamplingInProgress,

    #[error("missing campaign info, set campaign name and sensor number first")]
    MissingCampaign,

    #[error("no data to export")]
    NoData,

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Render an error and its chain of sources on one line.
#[must_use]
pub fn describe(err: &dyn Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
