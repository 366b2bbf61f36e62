//! gpsd connection configuration.

use std::time::Duration;

use serde::Deserialize;

/// Where to reach gpsd and how long to wait for a fix.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GpsdConfig {
    pub host: String,
    pub port: u16,
    /// Bound on a one-shot fix, in seconds.
    pub fix_timeout_secs: u16,
}

impl Default for GpsdConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 2947,
            fix_timeout_secs: 10,
        }
    }
}

impl GpsdConfig {
    #[must_use]
    pub fn fix_timeout(&self) -> Duration {
        Duration::from_secs(u64::from(self.fix_timeout_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_local_daemon() {
        let config = GpsdConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 2947);
        assert_eq!(config.fix_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn should_parse_partial_toml() {
        let config: GpsdConfig = toml::from_str("port = 3000").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, "127.0.0.1");
    }
}
