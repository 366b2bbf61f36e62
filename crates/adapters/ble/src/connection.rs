//! GATT access to a connected sensor.

use std::time::Duration;

use btleplug::api::{Central as _, CentralEvent, CharPropFlags, Characteristic, Peripheral as _};
use btleplug::platform::{Adapter, Peripheral};
use tokio_stream::StreamExt as _;

use uhilog_app::ports::{BleConnection, BleError, EventSink, Subscription};
use uhilog_domain::sensor::GattTarget;

use crate::error::{connect_failed, disconnect_failed, read_failed};

/// Find the readable characteristic matching `target`.
pub(crate) fn find_characteristic(
    characteristics: impl IntoIterator<Item = Characteristic>,
    target: &GattTarget,
) -> Option<Characteristic> {
    characteristics.into_iter().find(|c| {
        c.uuid == target.characteristic
            && target.service.is_none_or(|service| c.service_uuid == service)
            && c.properties.contains(CharPropFlags::READ)
    })
}

/// Live link to the paired sensor.
pub struct BtleplugConnection {
    central: Adapter,
    peripheral: Peripheral,
    read_timeout: Duration,
}

impl BtleplugConnection {
    pub(crate) fn new(central: Adapter, peripheral: Peripheral, read_timeout: Duration) -> Self {
        Self {
            central,
            peripheral,
            read_timeout,
        }
    }
}

impl BleConnection for BtleplugConnection {
    type Characteristic = Characteristic;

    async fn discover(&self, target: &GattTarget) -> Result<Option<Characteristic>, BleError> {
        self.peripheral
            .discover_services()
            .await
            .map_err(connect_failed)?;

        let found = find_characteristic(self.peripheral.characteristics(), target);
        if found.is_none() {
            tracing::warn!(
                characteristic = %target.characteristic,
                "sensor does not expose the temperature characteristic"
            );
        }
        Ok(found)
    }

    async fn read(&self, characteristic: &Characteristic) -> Result<Vec<u8>, BleError> {
        let after = self.read_timeout;
        tokio::time::timeout(after, self.peripheral.read(characteristic))
            .await
            .map_err(|_| BleError::Timeout {
                operation: "read",
                after,
            })?
            .map_err(read_failed)
    }

    async fn is_connected(&self) -> bool {
        self.peripheral.is_connected().await.unwrap_or(false)
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.peripheral.disconnect().await.map_err(disconnect_failed)
    }

    fn watch_disconnect(&self, sink: EventSink) -> Subscription {
        let central = self.central.clone();
        let peripheral = self.peripheral.clone();
        let task = tokio::spawn(async move {
            let mut events = match central.events().await {
                Ok(events) => events,
                Err(err) => {
                    tracing::warn!(%err, "cannot watch BLE disconnects");
                    return;
                }
            };
            // the link may have dropped before the stream was open
            if !peripheral.is_connected().await.unwrap_or(false) {
                sink.disconnected();
                return;
            }
            let id = peripheral.id();
            while let Some(event) = events.next().await {
                if let CentralEvent::DeviceDisconnected(gone) = event
                    && gone == id
                {
                    tracing::info!("sensor disconnected");
                    sink.disconnected();
                    return;
                }
            }
        });
        Subscription::from_task(task)
    }
}
