//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts via `#[from]`. The
//! domain only knows about invariant violations and payload decoding.

/// A domain invariant was violated while building a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The campaign name is empty or whitespace.
    #[error("campaign name must not be empty")]
    EmptyCampaignName,

    /// The campaign name contains the label separator.
    #[error("campaign name must not contain '_'")]
    CampaignNameUnderscore,

    /// The campaign sensor number is not 1 to 3 ASCII digits.
    #[error("campaign sensor number must be 1 to 3 digits, got {0:?}")]
    InvalidSensorNumber(String),

    /// The paired sensor name is empty.
    #[error("sensor name must not be empty")]
    EmptySensorName,
}

/// The sensor characteristic value could not be decoded into a temperature.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PayloadError {
    /// The payload was empty (or only padding).
    #[error("empty temperature payload")]
    Empty,

    /// The payload was not valid UTF-8 text.
    #[error("temperature payload is not UTF-8")]
    NotUtf8,

    /// The text could not be parsed as a finite number.
    #[error("temperature payload {0:?} is not a number")]
    NotANumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_underscore_error() {
        let err = ValidationError::CampaignNameUnderscore;
        assert_eq!(err.to_string(), "campaign name must not contain '_'");
    }

    #[test]
    fn should_display_invalid_sensor_number() {
        let err = ValidationError::InvalidSensorNumber("12a".to_owned());
        assert_eq!(
            err.to_string(),
            "campaign sensor number must be 1 to 3 digits, got \"12a\""
        );
    }

    #[test]
    fn should_display_payload_error_with_text() {
        let err = PayloadError::NotANumber("hot".to_owned());
        assert_eq!(err.to_string(), "temperature payload \"hot\" is not a number");
    }
}
