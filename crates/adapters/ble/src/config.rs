//! BLE adapter configuration.

use std::time::Duration;

use serde::Deserialize;
use uhilog_domain::sensor::{DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID, GattTarget};

/// Configuration for the btleplug transport.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BleConfig {
    /// Service carrying the temperature characteristic. `None` accepts any.
    pub service_uuid: Option<uuid::Uuid>,
    /// Readable characteristic carrying the temperature text.
    pub characteristic_uuid: uuid::Uuid,
    /// Bound on a single characteristic read, in seconds.
    pub read_timeout_secs: u16,
    /// Bound on establishing the link, in seconds.
    pub connect_timeout_secs: u16,
    /// How long to wait for the adapter to power on, in seconds.
    pub power_on_timeout_secs: u16,
}

impl Default for BleConfig {
    fn default() -> Self {
        Self {
            service_uuid: Some(DEFAULT_SERVICE_UUID),
            characteristic_uuid: DEFAULT_CHARACTERISTIC_UUID,
            read_timeout_secs: 10,
            connect_timeout_secs: 15,
            power_on_timeout_secs: 5,
        }
    }
}

impl BleConfig {
    /// The GATT location of the temperature value.
    #[must_use]
    pub fn gatt(&self) -> GattTarget {
        GattTarget {
            service: self.service_uuid,
            characteristic: self.characteristic_uuid,
        }
    }

    #[must_use]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.read_timeout_secs))
    }

    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.connect_timeout_secs))
    }

    #[must_use]
    pub fn power_on_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.power_on_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_known_sensor_layout() {
        let config = BleConfig::default();
        assert_eq!(config.gatt(), GattTarget::default());
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn should_parse_partial_toml() {
        let config: BleConfig = toml::from_str(
            r#"
            characteristic_uuid = "0000abcd-0000-1000-8000-00805f9b34fb"
            read_timeout_secs = 3
            "#,
        )
        .unwrap();

        assert_eq!(
            config.characteristic_uuid,
            uuid::Uuid::from_u128(0x0000_abcd_0000_1000_8000_0080_5f9b_34fb)
        );
        assert_eq!(config.read_timeout_secs, 3);
        assert_eq!(config.service_uuid, Some(DEFAULT_SERVICE_UUID));
        assert_eq!(config.power_on_timeout_secs, 5);
    }
}
