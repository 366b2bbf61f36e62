//! btleplug implementation of [`BleTransport`].

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use btleplug::api::{Central, CentralEvent, CentralState, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, Peripheral, PeripheralId};
use tokio::sync::{Mutex, OnceCell};
use tokio_stream::{Stream, StreamExt as _};

use uhilog_app::ports::{Advertisement, BleError, BleTransport};
use uhilog_domain::sensor::NameFilter;

use crate::config::BleConfig;
use crate::connection::BtleplugConnection;
use crate::error::{AdapterError, connect_failed, scan_failed};

const POWER_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// BLE transport backed by the first adapter of the host.
///
/// The adapter is opened on first use, so a host without Bluetooth only
/// fails when a session actually needs it.
pub struct BtleplugTransport {
    config: BleConfig,
    central: OnceCell<Adapter>,
    /// Peripherals returned by the last scans, by advertisement id.
    seen: Mutex<HashMap<String, Peripheral>>,
}

impl BtleplugTransport {
    #[must_use]
    pub fn new(config: BleConfig) -> Self {
        Self {
            config,
            central: OnceCell::new(),
            seen: Mutex::new(HashMap::new()),
        }
    }

    async fn central(&self) -> Result<&Adapter, AdapterError> {
        self.central
            .get_or_try_init(|| async {
                let manager = Manager::new().await?;
                let adapters = manager.adapters().await?;
                let central = adapters.into_iter().next().ok_or(AdapterError::NotAvailable)?;
                tracing::debug!("BLE adapter opened");
                Ok::<_, AdapterError>(central)
            })
            .await
    }

    /// Look up the advertised name of `id` and keep the peripheral when it
    /// passes `filter`.
    async fn inspect(
        &self,
        central: &Adapter,
        id: &PeripheralId,
        filter: &NameFilter,
    ) -> Option<Advertisement> {
        let peripheral = central.peripheral(id).await.ok()?;
        let properties = peripheral.properties().await.ok().flatten()?;
        let name = properties.local_name?;
        tracing::trace!(%name, rssi = ?properties.rssi, "BLE device detected");
        if !filter.matches(&name) {
            return None;
        }

        let advertisement = Advertisement {
            id: peripheral.address().to_string(),
            name,
            rssi: properties.rssi,
        };
        self.seen
            .lock()
            .await
            .insert(advertisement.id.clone(), peripheral);
        Some(advertisement)
    }

    async fn await_match(
        &self,
        central: &Adapter,
        filter: &NameFilter,
        timeout: Duration,
    ) -> Result<Option<Advertisement>, BleError> {
        let events = central.events().await.map_err(scan_failed)?;
        central
            .start_scan(ScanFilter::default())
            .await
            .map_err(scan_failed)?;

        // only peripherals heard during this scan count, the platform cache
        // keeps devices that are long out of range
        let advertised = events.filter_map(advertised_id);
        Ok(first_accepted(advertised, timeout, |id| async move {
            self.inspect(central, &id, filter).await
        })
        .await)
    }
}

/// Peripheral that just sent an advertisement, if `event` is one.
fn advertised_id(event: CentralEvent) -> Option<PeripheralId> {
    match event {
        CentralEvent::DeviceDiscovered(id)
        | CentralEvent::DeviceUpdated(id)
        | CentralEvent::ManufacturerDataAdvertisement { id, .. }
        | CentralEvent::ServiceDataAdvertisement { id, .. }
        | CentralEvent::ServicesAdvertisement { id, .. } => Some(id),
        _ => None,
    }
}

/// Wait for the first advertisement `accept` keeps, for at most `timeout`.
async fn first_accepted<S, F, Fut>(
    mut advertised: S,
    timeout: Duration,
    mut accept: F,
) -> Option<Advertisement>
where
    S: Stream + Unpin,
    F: FnMut(S::Item) -> Fut,
    Fut: Future<Output = Option<Advertisement>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let item = tokio::time::timeout_at(deadline, advertised.next())
            .await
            .ok()
            .flatten()?;
        if let Some(found) = accept(item).await {
            return Some(found);
        }
    }
}

impl BleTransport for BtleplugTransport {
    type Connection = BtleplugConnection;

    async fn await_powered_on(&self, timeout: Duration) -> Result<(), BleError> {
        let central = self.central().await?;
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match central.adapter_state().await {
                Ok(CentralState::PoweredOn) => return Ok(()),
                Ok(state) => tracing::debug!(?state, "waiting for BLE adapter"),
                Err(err) => tracing::debug!(%err, "BLE adapter state unavailable"),
            }
            if tokio::time::Instant::now() + POWER_POLL_INTERVAL > deadline {
                return Err(BleError::AdapterOff);
            }
            tokio::time::sleep(POWER_POLL_INTERVAL).await;
        }
    }

    #[tracing::instrument(skip(self, filter), fields(filter = %filter))]
    async fn scan(
        &self,
        filter: &NameFilter,
        timeout: Duration,
    ) -> Result<Option<Advertisement>, BleError> {
        let central = self.central().await?;
        let found = self.await_match(central, filter, timeout).await;

        if let Err(err) = central.stop_scan().await {
            tracing::warn!(%err, "failed to stop BLE scan");
        }
        match &found {
            Ok(Some(advertisement)) => {
                tracing::info!(name = %advertisement.name, id = %advertisement.id, "sensor found");
            }
            Ok(None) => tracing::info!("no matching sensor advertised"),
            Err(err) => tracing::warn!(%err, "BLE scan failed"),
        }
        found
    }

    #[tracing::instrument(skip(self, advertisement), fields(sensor = %advertisement.name))]
    async fn connect(&self, advertisement: &Advertisement) -> Result<BtleplugConnection, BleError> {
        let central = self.central().await?.clone();
        let peripheral = self
            .seen
            .lock()
            .await
            .get(&advertisement.id)
            .cloned()
            .ok_or_else(|| AdapterError::UnknownPeripheral(advertisement.id.clone()))?;

        let after = self.config.connect_timeout();
        tokio::time::timeout(after, peripheral.connect())
            .await
            .map_err(|_| BleError::Timeout {
                operation: "connect",
                after,
            })?
            .map_err(connect_failed)?;

        tracing::info!("sensor connected");
        Ok(BtleplugConnection::new(
            central,
            peripheral,
            self.config.read_timeout(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertisement(name: &str) -> Advertisement {
        Advertisement {
            id: name.to_owned(),
            name: name.to_owned(),
            rssi: Some(-60),
        }
    }

    fn accept_prefix(name: &'static str) -> Option<Advertisement> {
        NameFilter::Prefix("quest".to_owned())
            .matches(name)
            .then(|| advertisement(name))
    }

    #[tokio::test(start_paused = true)]
    async fn should_return_first_matching_advertisement() {
        let heard = tokio_stream::iter(["other", "quest_007", "quest_008"]);

        let found = first_accepted(heard, Duration::from_secs(10), |name| async move {
            accept_prefix(name)
        })
        .await;

        assert_eq!(found.map(|a| a.name), Some("quest_007".to_owned()));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_nothing_when_no_match_is_heard_in_time() {
        let heard = Box::pin(tokio_stream::iter(["other"]).chain(tokio_stream::pending()));
        let started = tokio::time::Instant::now();

        let found = first_accepted(heard, Duration::from_secs(10), |name| async move {
            accept_prefix(name)
        })
        .await;

        assert!(found.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_when_event_stream_ends() {
        let heard = tokio_stream::iter(Vec::<&'static str>::new());

        let found = first_accepted(heard, Duration::from_secs(10), |name| async move {
            accept_prefix(name)
        })
        .await;

        assert!(found.is_none());
    }

    #[test]
    fn should_ignore_events_that_are_not_advertisements() {
        let event = CentralEvent::StateUpdate(CentralState::PoweredOn);

        assert!(advertised_id(event).is_none());
    }
}
