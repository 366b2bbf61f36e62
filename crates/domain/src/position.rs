//! Position: one fix delivered by a location source.

use serde::{Deserialize, Serialize};

/// A GPS fix as reported by the platform location service.
///
/// Latitude and longitude are always present; the remaining fields depend on
/// the receiver and fix quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in metres.
    pub altitude: Option<f64>,
    /// Horizontal accuracy (radius) in metres.
    pub accuracy: Option<f64>,
    /// Ground speed in metres per second.
    pub speed: Option<f64>,
}

impl Position {
    /// Build a fix with only a horizontal coordinate.
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude: None,
            accuracy: None,
            speed: None,
        }
    }

    /// Set the altitude in metres.
    #[must_use]
    pub fn with_altitude(mut self, altitude: f64) -> Self {
        self.altitude = Some(altitude);
        self
    }

    /// Set the horizontal accuracy in metres.
    #[must_use]
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Set the ground speed in metres per second.
    #[must_use]
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }
}
