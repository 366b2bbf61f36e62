//! Bounded retry-with-verify for registry writes.

use std::time::Duration;

use crate::ports::{RegistryKey, SensorRegistry};

/// How often and how patiently a write is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(300),
        }
    }
}

/// Write `value` under `key`, read it back and compare, retrying on any
/// mismatch or error.
///
/// Returns `true` once the read-back matches, `false` when every attempt
/// failed.
#[tracing::instrument(skip(registry, key, value), fields(key = %key))]
pub async fn write_with_retry<R: SensorRegistry>(
    registry: &R,
    key: RegistryKey,
    value: &str,
    policy: RetryPolicy,
) -> bool {
    for attempt in 1..=policy.attempts {
        match registry.set(key, value).await {
            Ok(()) => match registry.get(key).await {
                Ok(Some(stored)) if stored == value => return true,
                Ok(_) => tracing::warn!(attempt, "read-back does not match written value"),
                Err(err) => tracing::warn!(attempt, error = %err, "read-back failed"),
            },
            Err(err) => tracing::warn!(attempt, error = %err, "write failed"),
        }

        if attempt < policy.attempts {
            tokio::time::sleep(policy.backoff).await;
        }
    }

    tracing::error!(attempts = policy.attempts, "giving up on registry write");
    false
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::future::Future;
    use std::sync::Mutex;

    use super::*;
    use crate::ports::RegistryError;

    /// Registry that fails (or silently drops) the first `failures` writes.
    #[derive(Default)]
    struct FlakyRegistry {
        failures: Mutex<u32>,
        drop_writes: bool,
        writes: Mutex<u32>,
        store: Mutex<HashMap<RegistryKey, String>>,
    }

    impl SensorRegistry for FlakyRegistry {
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
            *self.writes.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            let result = if *failures > 0 {
                *failures -= 1;
                if self.drop_writes {
                    Ok(())
                } else {
                    Err(RegistryError::new("keychain locked"))
                }
            } else {
                self.store.lock().unwrap().insert(key, value.to_owned());
                Ok(())
            };
            async { result }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn should_succeed_on_first_attempt() {
        let registry = FlakyRegistry::default();
        assert!(
            write_with_retry(
                &registry,
                RegistryKey::CampaignName,
                "heatwave",
                RetryPolicy::default()
            )
            .await
        );
        assert_eq!(*registry.writes.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_until_write_succeeds() {
        let registry = FlakyRegistry {
            failures: Mutex::new(2),
            ..Default::default()
        };
        assert!(
            write_with_retry(
                &registry,
                RegistryKey::CampaignName,
                "heatwave",
                RetryPolicy::default()
            )
            .await
        );
        assert_eq!(*registry.writes.lock().unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_when_read_back_does_not_match() {
        let registry = FlakyRegistry {
            failures: Mutex::new(1),
            drop_writes: true,
            ..Default::default()
        };
        assert!(
            write_with_retry(
                &registry,
                RegistryKey::PairedSensorName,
                "quest_007",
                RetryPolicy::default()
            )
            .await
        );
        assert_eq!(*registry.writes.lock().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_give_up_after_all_attempts() {
        let registry = FlakyRegistry {
            failures: Mutex::new(10),
            ..Default::default()
        };
        let started = tokio::time::Instant::now();
        assert!(
            !write_with_retry(
                &registry,
                RegistryKey::CampaignSensorNumber,
                "007",
                RetryPolicy::default()
            )
            .await
        );
        assert_eq!(*registry.writes.lock().unwrap(), 3);
        // two backoffs between three attempts
        assert_eq!(started.elapsed(), Duration::from_millis(600));
    }
}
