//! Configuration loading: TOML file with environment variable overrides.
//!
//! Looks for `uhilog.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.
//!
//! Operator settings (campaign, paired sensor) are not configuration: they
//! live in the settings table of the database.

use std::time::Duration;

use serde::Deserialize;

use uhilog_adapter_ble::BleConfig;
use uhilog_adapter_gpsd::GpsdConfig;
use uhilog_adapter_virtual::{VirtualSensorConfig, VirtualTrack};
use uhilog_app::retry::RetryPolicy;
use uhilog_app::session::SessionConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Database settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Session timings.
    pub session: SessionSection,
    /// Sensor GATT layout and BLE timeouts.
    pub ble: BleConfig,
    /// gpsd connection.
    pub gpsd: GpsdConfig,
    /// Simulated sensor and GPS.
    pub simulation: SimulationConfig,
}

/// `SQLite` database configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `SQLite` connection URL or file path.
    pub url: String,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

/// Timings of the sampling session.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub scan_timeout_secs: u16,
    pub settle_delay_ms: u32,
    pub sample_interval_ms: u32,
    pub duplicate_window_ms: u32,
    pub pair_scan_timeout_secs: u16,
    /// Advertised-name prefix accepted when pairing.
    pub pair_name_prefix: String,
}

/// Simulated hardware, for demos and field training.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Use the virtual sensor and GPS instead of the real ones.
    pub enabled: bool,
    pub sensor_name: String,
    pub base_temperature: f64,
    pub start_latitude: f64,
    pub start_longitude: f64,
}

impl Config {
    /// Load configuration from `uhilog.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or a value
    /// is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("uhilog.toml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("UHILOG_DATABASE_URL") {
            self.database.url = val;
        }
        if let Ok(val) = std::env::var("UHILOG_LOG") {
            self.logging.filter = val;
        }
        if let Ok(val) = std::env::var("RUST_LOG") {
            self.logging.filter = val;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let session = &self.session;
        let ble = &self.ble;
        let zero = [
            ("session.scan_timeout_secs", session.scan_timeout_secs == 0),
            ("session.sample_interval_ms", session.sample_interval_ms == 0),
            ("session.pair_scan_timeout_secs", session.pair_scan_timeout_secs == 0),
            ("ble.read_timeout_secs", ble.read_timeout_secs == 0),
            ("ble.connect_timeout_secs", ble.connect_timeout_secs == 0),
            ("ble.power_on_timeout_secs", ble.power_on_timeout_secs == 0),
            ("gpsd.fix_timeout_secs", self.gpsd.fix_timeout_secs == 0),
        ];
        if let Some((name, _)) = zero.iter().find(|(_, is_zero)| *is_zero) {
            return Err(ConfigError::Validation(format!("{name} must be non-zero")));
        }
        if session.pair_name_prefix.trim().is_empty() {
            return Err(ConfigError::Validation(
                "session.pair_name_prefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Return the database URL in `sqlx`-compatible format.
    #[must_use]
    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    /// Session timings and sensor layout for the controller.
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        let session = &self.session;
        SessionConfig {
            scan_timeout: Duration::from_secs(u64::from(session.scan_timeout_secs)),
            settle_delay: Duration::from_millis(u64::from(session.settle_delay_ms)),
            sample_interval: Duration::from_millis(u64::from(session.sample_interval_ms)),
            duplicate_window_ms: i64::from(session.duplicate_window_ms),
            pair_scan_timeout: Duration::from_secs(u64::from(session.pair_scan_timeout_secs)),
            pair_name_prefix: session.pair_name_prefix.trim().to_owned(),
            power_on_timeout: self.ble.power_on_timeout(),
            gatt: self.ble.gatt(),
            retry: RetryPolicy::default(),
        }
    }

    /// The simulated sensor, advertising the configured characteristic.
    #[must_use]
    pub fn virtual_sensor(&self) -> VirtualSensorConfig {
        VirtualSensorConfig {
            name: self.simulation.sensor_name.clone(),
            base_temperature: self.simulation.base_temperature,
            characteristic: self.ble.characteristic_uuid,
            ..VirtualSensorConfig::default()
        }
    }

    /// The simulated GPS walk.
    #[must_use]
    pub fn virtual_track(&self) -> VirtualTrack {
        VirtualTrack {
            start_latitude: self.simulation.start_latitude,
            start_longitude: self.simulation.start_longitude,
            ..VirtualTrack::default()
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:uhilog.db?mode=rwc".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "uhilog=info,uhilog_app=info,uhilog_adapter_ble=info".to_string(),
        }
    }
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            scan_timeout_secs: 10,
            settle_delay_ms: 500,
            sample_interval_ms: 1000,
            duplicate_window_ms: 50,
            pair_scan_timeout_secs: 10,
            pair_name_prefix: defaults.pair_name_prefix,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        let sensor = VirtualSensorConfig::default();
        let track = VirtualTrack::default();
        Self {
            enabled: false,
            sensor_name: sensor.name,
            base_temperature: sensor.base_temperature,
            start_latitude: track.start_latitude,
            start_longitude: track.start_longitude,
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert_eq!(config.database.url, "sqlite:uhilog.db?mode=rwc");
        assert_eq!(
            config.logging.filter,
            "uhilog=info,uhilog_app=info,uhilog_adapter_ble=info"
        );
        assert_eq!(config.gpsd.port, 2947);
        assert!(!config.simulation.enabled);
        assert_eq!(config.simulation.sensor_name, "quest_001");
    }

    #[test]
    fn should_map_defaults_onto_session_config() {
        let config = Config::default();
        assert_eq!(config.session_config(), SessionConfig::default());
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.session.scan_timeout_secs, 10);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [database]
            url = 'sqlite:test.db'

            [logging]
            filter = 'debug'

            [session]
            scan_timeout_secs = 15
            settle_delay_ms = 250
            sample_interval_ms = 2000
            duplicate_window_ms = 100
            pair_scan_timeout_secs = 20
            pair_name_prefix = 'thermo'

            [ble]
            read_timeout_secs = 5

            [gpsd]
            host = 'gps.local'
            port = 3000

            [simulation]
            enabled = true
            sensor_name = 'quest_042'
            base_temperature = 30.0
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.url, "sqlite:test.db");
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.gpsd.host, "gps.local");
        assert!(config.simulation.enabled);
        assert_eq!(config.virtual_sensor().name, "quest_042");

        let session = config.session_config();
        assert_eq!(session.scan_timeout, Duration::from_secs(15));
        assert_eq!(session.settle_delay, Duration::from_millis(250));
        assert_eq!(session.sample_interval, Duration::from_secs(2));
        assert_eq!(session.duplicate_window_ms, 100);
        assert_eq!(session.pair_scan_timeout, Duration::from_secs(20));
        assert_eq!(session.pair_name_prefix, "thermo");
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.session.sample_interval_ms, 1000);
    }

    #[test]
    fn should_reject_zero_interval() {
        let mut config = Config::default();
        config.session.sample_interval_ms = 0;
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid configuration: session.sample_interval_ms must be non-zero"
        );
    }

    #[test]
    fn should_reject_empty_pair_prefix() {
        let mut config = Config::default();
        config.session.pair_name_prefix = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_accept_defaults() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
