//! Settings service: paired sensor and campaign identity in the registry.

use uhilog_domain::campaign::Campaign;
use uhilog_domain::sensor::PairedSensor;

use crate::error::SettingsError;
use crate::ports::{RegistryKey, SensorRegistry};
use crate::retry::{RetryPolicy, write_with_retry};

/// Reads and writes the operator settings kept in the [`SensorRegistry`].
///
/// Every write goes through [`write_with_retry`].
pub struct SettingsService<R> {
    registry: R,
    retry: RetryPolicy,
}

impl<R: SensorRegistry> SettingsService<R> {
    pub fn new(registry: R, retry: RetryPolicy) -> Self {
        Self { registry, retry }
    }

    /// The paired sensor, if any.
    ///
    /// # Errors
    ///
    /// Returns a registry error, or [`SettingsError::Validation`] when the
    /// stored name is blank.
    pub async fn paired_sensor(&self) -> Result<Option<PairedSensor>, SettingsError> {
        match self.registry.get(RegistryKey::PairedSensorName).await? {
            Some(name) => Ok(Some(PairedSensor::new(name)?)),
            None => Ok(None),
        }
    }

    /// Overwrite the paired sensor.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotVerified`] when the write could not be
    /// confirmed.
    #[tracing::instrument(skip(self, sensor), fields(sensor = %sensor))]
    pub async fn save_paired_sensor(&self, sensor: &PairedSensor) -> Result<(), SettingsError> {
        self.write(RegistryKey::PairedSensorName, sensor.name()).await
    }

    /// The campaign settings, if both values were saved.
    ///
    /// # Errors
    ///
    /// Returns a registry error, or [`SettingsError::Validation`] when the
    /// stored values no longer validate.
    pub async fn campaign(&self) -> Result<Option<Campaign>, SettingsError> {
        let name = self.registry.get(RegistryKey::CampaignName).await?;
        let number = self.registry.get(RegistryKey::CampaignSensorNumber).await?;
        match (name, number) {
            (Some(name), Some(number)) => Ok(Some(Campaign::new(&name, &number)?)),
            _ => Ok(None),
        }
    }

    /// Save campaign settings.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::NotVerified`] naming the first key that could
    /// not be confirmed.
    #[tracing::instrument(skip(self, campaign), fields(label = %campaign.label()))]
    pub async fn save_campaign(&self, campaign: &Campaign) -> Result<(), SettingsError> {
        self.write(RegistryKey::CampaignName, campaign.name()).await?;
        self.write(RegistryKey::CampaignSensorNumber, campaign.sensor_number())
            .await
    }

    async fn write(&self, key: RegistryKey, value: &str) -> Result<(), SettingsError> {
        if write_with_retry(&self.registry, key, value, self.retry).await {
            Ok(())
        } else {
            Err(SettingsError::NotVerified(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;
    use std::time::Duration;

    use super::*;
    use crate::ports::RegistryError;
    use uhilog_domain::error::ValidationError;

    #[derive(Default)]
    struct InMemoryRegistry {
        store: Mutex<HashMap<RegistryKey, String>>,
        read_only: bool,
    }

    impl SensorRegistry for InMemoryRegistry {
        fn get(
            &self,
            key: RegistryKey,
        ) -> impl Future<Output = Result<Option<String>, RegistryError>> + Send {
            let value = self.store.lock().unwrap().get(&key).cloned();
            async { Ok(value) }
        }

        fn set(
            &self,
            key: RegistryKey,
            value: &str,
        ) -> impl Future<Output = Result<(), RegistryError>> + Send {
            if !self.read_only {
                self.store.lock().unwrap().insert(key, value.to_owned());
            }
            async { Ok(()) }
        }
    }

    fn make_service(registry: InMemoryRegistry) -> SettingsService<InMemoryRegistry> {
        SettingsService::new(
            registry,
            RetryPolicy {
                attempts: 2,
                backoff: Duration::from_millis(10),
            },
        )
    }

    #[tokio::test]
    async fn should_return_none_when_nothing_saved() {
        let svc = make_service(InMemoryRegistry::default());
        assert!(svc.paired_sensor().await.unwrap().is_none());
        assert!(svc.campaign().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_save_and_load_paired_sensor() {
        let svc = make_service(InMemoryRegistry::default());
        let sensor = PairedSensor::new("quest_007").unwrap();

        svc.save_paired_sensor(&sensor).await.unwrap();

        assert_eq!(svc.paired_sensor().await.unwrap(), Some(sensor));
    }

    #[tokio::test]
    async fn should_save_campaign_with_padded_number() {
        let svc = make_service(InMemoryRegistry::default());
        let campaign = Campaign::new("heatwave", "7").unwrap();

        svc.save_campaign(&campaign).await.unwrap();

        let stored = svc.registry.store.lock().unwrap().clone();
        assert_eq!(stored[&RegistryKey::CampaignSensorNumber], "007");
        assert_eq!(svc.campaign().await.unwrap(), Some(campaign));
    }

    #[tokio::test]
    async fn should_ignore_half_saved_campaign() {
        let registry = InMemoryRegistry::default();
        registry
            .store
            .lock()
            .unwrap()
            .insert(RegistryKey::CampaignName, "heatwave".to_owned());
        let svc = make_service(registry);

        assert!(svc.campaign().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_stored_campaign_that_no_longer_validates() {
        let registry = InMemoryRegistry::default();
        {
            let mut store = registry.store.lock().unwrap();
            store.insert(RegistryKey::CampaignName, "heat_wave".to_owned());
            store.insert(RegistryKey::CampaignSensorNumber, "001".to_owned());
        }
        let svc = make_service(registry);

        assert!(matches!(
            svc.campaign().await,
            Err(SettingsError::Validation(
                ValidationError::CampaignNameUnderscore
            ))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_unverified_write() {
        let svc = make_service(InMemoryRegistry {
            read_only: true,
            ..Default::default()
        });
        let sensor = PairedSensor::new("quest_007").unwrap();

        assert!(matches!(
            svc.save_paired_sensor(&sensor).await,
            Err(SettingsError::NotVerified(RegistryKey::PairedSensorName))
        ));
    }
}
