//! Registry port: durable key-value settings of the field device.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Keys understood by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKey {
    PairedSensorName,
    CampaignName,
    CampaignSensorNumber,
}

impl RegistryKey {
    /// Stored key name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PairedSensorName => "pairedSensorName",
            Self::CampaignName => "campaignName",
            Self::CampaignSensorNumber => "campaignSensorNumber",
        }
    }
}

impl fmt::Display for RegistryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registry read or write failed.
#[derive(Debug, thiserror::Error)]
#[error("registry failure")]
pub struct RegistryError(#[source] Box<dyn Error + Send + Sync>);

impl RegistryError {
    pub fn new(source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self(source.into())
    }
}

/// Durable store for the paired sensor and campaign identity.
pub trait SensorRegistry: Send + Sync {
    /// Read a value, `None` when never written.
    fn get(
        &self,
        key: RegistryKey,
    ) -> impl Future<Output = Result<Option<String>, RegistryError>> + Send;

    /// Overwrite a value.
    fn set(
        &self,
        key: RegistryKey,
        value: &str,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send;
}

impl<T: SensorRegistry> SensorRegistry for Arc<T> {
    fn get(
        &self,
        key: RegistryKey,
    ) -> impl Future<Output = Result<Option<String>, RegistryError>> + Send {
        (**self).get(key)
    }

    fn set(
        &self,
        key: RegistryKey,
        value: &str,
    ) -> impl Future<Output = Result<(), RegistryError>> + Send {
        (**self).set(key, value)
    }
}
