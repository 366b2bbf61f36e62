//! Sensor identity, name matching and payload decoding.
//!
//! The sensor is a BLE peripheral advertising a name such as `quest_007`
//! and exposing one readable characteristic whose value is the current
//! temperature as plain text (e.g. `b"23.45"`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PayloadError, ValidationError};

/// Default GATT service exposing the temperature characteristic.
pub const DEFAULT_SERVICE_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0x4faf_c201_1fb5_459b_8fc2_0bfd_3ba9_f5c9);

/// Default readable characteristic carrying the temperature text.
pub const DEFAULT_CHARACTERISTIC_UUID: uuid::Uuid =
    uuid::Uuid::from_u128(0xbeb5_483e_36e1_4688_b7f5_ea07_361b_26a8);

/// The advertised name of the sensor this device is paired with.
///
/// At most one is stored at a time; pairing overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairedSensor {
    name: String,
}

impl PairedSensor {
    /// Wrap an advertised name.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::EmptySensorName`] if the name is blank.
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySensorName);
        }
        Ok(Self {
            name: trimmed.to_owned(),
        })
    }

    /// The advertised name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for PairedSensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The service/characteristic pair the sensor must expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GattTarget {
    /// Service UUID. `None` accepts the characteristic on any service.
    pub service: Option<uuid::Uuid>,
    /// Readable characteristic UUID.
    pub characteristic: uuid::Uuid,
}

impl Default for GattTarget {
    fn default() -> Self {
        Self {
            service: Some(DEFAULT_SERVICE_UUID),
            characteristic: DEFAULT_CHARACTERISTIC_UUID,
        }
    }
}

/// How advertised names are matched during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    /// Accept exactly this name (session start).
    Exact(String),
    /// Accept any name starting with this prefix, ASCII case-insensitive
    /// (pairing).
    Prefix(String),
}

impl NameFilter {
    /// Check whether an advertised name passes this filter.
    #[must_use]
    pub fn matches(&self, advertised: &str) -> bool {
        match self {
            Self::Exact(name) => advertised == name,
            Self::Prefix(prefix) => advertised
                .get(..prefix.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(prefix)),
        }
    }
}

impl fmt::Display for NameFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(name) => write!(f, "{name}"),
            Self::Prefix(prefix) => write!(f, "{prefix}*"),
        }
    }
}

/// Decode the characteristic value into degrees Celsius.
///
/// The firmware sends the temperature as ASCII text. Surrounding whitespace
/// and trailing NUL padding are ignored.
///
/// # Errors
///
/// Returns [`PayloadError`] when the payload is empty, not UTF-8, or not a
/// finite number.
pub fn decode_temperature(payload: &[u8]) -> Result<f64, PayloadError> {
    let text = std::str::from_utf8(payload).map_err(|_| PayloadError::NotUtf8)?;
    let text = text.trim_end_matches('\0').trim();
    if text.is_empty() {
        return Err(PayloadError::Empty);
    }
    match text.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(PayloadError::NotANumber(text.to_owned())),
    }
}
