//! Fixed-point integer encoding for stored measurements.
//!
//! Every measurement is stored as an integer scaled by a power of ten:
//!
//! | Quantity | Unit | Scale |
//! |----------|------|-------|
//! | Temperature | °C | ×100 |
//! | Latitude / longitude | degrees | ×10^7 |
//! | Altitude / accuracy | m | ×100 |
//! | Speed | m/s | ×100 |
//!
//! Encoding rounds half away from zero (`f64::round`). Non-finite inputs
//! encode as `0`.

/// Scale factor for centi-unit quantities (temperature, altitude, accuracy, speed).
pub const CENTI: f64 = 100.0;

/// Scale factor for latitude and longitude.
pub const E7: f64 = 10_000_000.0;

/// Metres per second to miles per hour.
pub const MPS_TO_MPH: f64 = 2.236_94;

/// Scale `value` by `scale` and round half away from zero.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn encode(value: f64, scale: f64) -> i64 {
    let scaled = value * scale;
    if scaled.is_finite() {
        scaled.round() as i64
    } else {
        0
    }
}

/// Undo [`encode`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn decode(raw: i64, scale: f64) -> f64 {
    raw as f64 / scale
}

/// Encode a centi-unit quantity.
#[must_use]
pub fn encode_centi(value: f64) -> i64 {
    encode(value, CENTI)
}

/// Decode a centi-unit quantity.
#[must_use]
pub fn decode_centi(raw: i64) -> f64 {
    decode(raw, CENTI)
}

/// Encode a coordinate in degrees.
#[must_use]
pub fn encode_e7(degrees: f64) -> i64 {
    encode(degrees, E7)
}

/// Decode a coordinate in degrees.
#[must_use]
pub fn decode_e7(raw: i64) -> f64 {
    decode(raw, E7)
}

/// Convert a stored centi-m/s speed into miles per hour.
#[must_use]
pub fn centi_mps_to_mph(raw: i64) -> f64 {
    decode_centi(raw) * MPS_TO_MPH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_roundtrip_latitude_within_one_e7() {
        let raw = encode_e7(37.681_900_0);
        assert_eq!(raw, 376_819_000);
        assert!((decode_e7(raw) - 37.681_900_0).abs() < 1e-7);
    }

    #[test]
    fn should_roundtrip_negative_longitude() {
        let raw = encode_e7(-122.419_4);
        assert_eq!(raw, -1_224_194_000);
        assert!((decode_e7(raw) + 122.419_4).abs() < 1e-7);
    }

    #[test]
    fn should_roundtrip_temperature_at_two_decimals() {
        let raw = encode_centi(23.45);
        assert_eq!(raw, 2345);
        assert!((decode_centi(raw) - 23.45).abs() < 1e-9);
    }

    #[test]
    fn should_round_half_away_from_zero() {
        assert_eq!(encode_centi(0.125), 13);
        assert_eq!(encode_centi(-0.125), -13);
        assert_eq!(encode_centi(0.124), 12);
    }

    #[test]
    fn should_encode_non_finite_as_zero() {
        assert_eq!(encode_centi(f64::NAN), 0);
        assert_eq!(encode_e7(f64::INFINITY), 0);
    }

    #[test]
    fn should_convert_speed_to_mph() {
        // 10 m/s
        let mph = centi_mps_to_mph(1000);
        assert!((mph - 22.3694).abs() < 1e-9);
    }
}
