//! Campaign settings, device labels and jobcodes.
//!
//! A campaign groups the field operators of one measurement run. Each
//! operator is given a sensor number; together they form the device label
//! (`heatwave_007`) that prefixes every jobcode stamped onto exported rows.

use std::fmt;

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Separator between campaign name and sensor number in a device label.
pub const LABEL_SEPARATOR: char = '_';

const SENSOR_NUMBER_WIDTH: usize = 3;

/// Validated campaign identity of this field device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    name: String,
    sensor_number: String,
}

impl Campaign {
    /// Validate and normalise campaign settings.
    ///
    /// The sensor number is left-padded with zeros to three digits.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if the name is empty or contains `_`, or
    /// the sensor number is not 1 to 3 ASCII digits.
    pub fn new(name: &str, sensor_number: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ValidationError::EmptyCampaignName);
        }
        if name.contains(LABEL_SEPARATOR) {
            return Err(ValidationError::CampaignNameUnderscore);
        }

        let number = sensor_number.trim();
        if number.is_empty()
            || number.len() > SENSOR_NUMBER_WIDTH
            || !number.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(ValidationError::InvalidSensorNumber(sensor_number.to_owned()));
        }

        Ok(Self {
            name: name.to_owned(),
            sensor_number: format!("{number:0>width$}", width = SENSOR_NUMBER_WIDTH),
        })
    }

    /// Campaign name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Zero-padded three digit sensor number.
    #[must_use]
    pub fn sensor_number(&self) -> &str {
        &self.sensor_number
    }

    /// Device label, e.g. `heatwave_007`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{LABEL_SEPARATOR}{}", self.name, self.sensor_number)
    }

    /// Build the jobcode for an export or session prepared at `at`.
    #[must_use]
    pub fn jobcode_at<Tz>(&self, at: &DateTime<Tz>) -> Jobcode
    where
        Tz: TimeZone,
        Tz::Offset: fmt::Display,
    {
        Jobcode(format!("{}-{}", self.label(), at.format("%Y%m%d%H%M%S")))
    }
}

/// Per-session identifier stamped onto exported rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jobcode(String);

impl Jobcode {
    /// The jobcode text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Jobcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
