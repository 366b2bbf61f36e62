//! Sample: one sensor reading joined with a GPS fix.
//!
//! Samples are created by the sampling loop on every successful
//! characteristic read and are immutable once written. All measurements are
//! held as fixed-point integers (see [`crate::fixed_point`]); the accessor
//! methods rescale them.

use serde::{Deserialize, Serialize};

use crate::fixed_point;
use crate::position::Position;

/// A persisted row: sensor temperature plus the position it was taken at.
///
/// `timestamp_millis` is the primary key and is strictly increasing within a
/// table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Wall-clock time of the read, in milliseconds since the Unix epoch.
    pub timestamp_millis: i64,
    /// Temperature in hundredths of a degree Celsius.
    pub temperature_centi: i64,
    /// Relative humidity. Always `0` until the sensor exposes a humidity channel.
    pub humidity: i64,
    /// Latitude in 10^-7 degrees.
    pub latitude_e7: i64,
    /// Longitude in 10^-7 degrees.
    pub longitude_e7: i64,
    /// Altitude in centimetres.
    pub altitude_centi: i64,
    /// Horizontal accuracy in centimetres.
    pub accuracy_centi: i64,
    /// Ground speed in hundredths of a metre per second.
    pub speed_centi: i64,
}

impl Sample {
    /// Encode a temperature and a position taken at `timestamp_millis`.
    ///
    /// Missing optional position fields are stored as `0`.
    #[must_use]
    pub fn from_reading(timestamp_millis: i64, temperature_celsius: f64, position: &Position) -> Self {
        Self {
            timestamp_millis,
            temperature_centi: fixed_point::encode_centi(temperature_celsius),
            humidity: 0,
            latitude_e7: fixed_point::encode_e7(position.latitude),
            longitude_e7: fixed_point::encode_e7(position.longitude),
            altitude_centi: fixed_point::encode_centi(position.altitude.unwrap_or_default()),
            accuracy_centi: fixed_point::encode_centi(position.accuracy.unwrap_or_default()),
            speed_centi: fixed_point::encode_centi(position.speed.unwrap_or_default()),
        }
    }

    /// Temperature in degrees Celsius.
    #[must_use]
    pub fn temperature_celsius(&self) -> f64 {
        fixed_point::decode_centi(self.temperature_centi)
    }

    /// Latitude in decimal degrees.
    #[must_use]
    pub fn latitude(&self) -> f64 {
        fixed_point::decode_e7(self.latitude_e7)
    }

    /// Longitude in decimal degrees.
    #[must_use]
    pub fn longitude(&self) -> f64 {
        fixed_point::decode_e7(self.longitude_e7)
    }

    /// Altitude in metres.
    #[must_use]
    pub fn altitude_m(&self) -> f64 {
        fixed_point::decode_centi(self.altitude_centi)
    }

    /// Horizontal accuracy in metres.
    #[must_use]
    pub fn accuracy_m(&self) -> f64 {
        fixed_point::decode_centi(self.accuracy_centi)
    }

    /// Ground speed in miles per hour.
    #[must_use]
    pub fn speed_mph(&self) -> f64 {
        fixed_point::centi_mps_to_mph(self.speed_centi)
    }
}

/// A stored sample with its export row number.
///
/// Row numbers are 1-based and relative to the oldest row still in the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberedSample {
    /// 1-based row number.
    pub row_number: i64,
    /// The stored sample.
    pub sample: Sample,
}
