//! Virtual temperature sensor behind a simulated BLE adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;

use uhilog_app::ports::{
    Advertisement, BleConnection, BleError, BleTransport, EventSink, Subscription,
};
use uhilog_domain::sensor::{DEFAULT_CHARACTERISTIC_UUID, GattTarget, NameFilter};

/// Identity and behaviour of the simulated sensor.
#[derive(Debug, Clone, PartialEq)]
pub struct VirtualSensorConfig {
    /// Advertised name.
    pub name: String,
    /// Centre of the simulated temperature drift, in °C.
    pub base_temperature: f64,
    /// Characteristic the sensor exposes.
    pub characteristic: uuid::Uuid,
    /// Time before the sensor shows up in a scan.
    pub advertise_delay: Duration,
}

impl Default for VirtualSensorConfig {
    fn default() -> Self {
        Self {
            name: "quest_001".to_owned(),
            base_temperature: 21.5,
            characteristic: DEFAULT_CHARACTERISTIC_UUID,
            advertise_delay: Duration::from_millis(200),
        }
    }
}

struct Shared {
    config: VirtualSensorConfig,
    powered: AtomicBool,
    reads: AtomicU64,
    link: watch::Sender<bool>,
}

impl Shared {
    fn link_up(&self) -> bool {
        *self.link.borrow()
    }

    /// Triangle wave of ±0.5 °C around the base, one period every 40 reads.
    #[allow(clippy::cast_precision_loss)]
    fn temperature(&self, read: u64) -> f64 {
        let phase = (read % 40) as f64;
        self.config.base_temperature + ((phase - 20.0).abs() - 10.0) * 0.05
    }
}

/// Simulated adapter advertising one sensor.
///
/// Clones share the same adapter, so a test can keep a handle to power the
/// adapter off or drop the link while the session owns another clone.
#[derive(Clone)]
pub struct VirtualBle {
    shared: Arc<Shared>,
}

impl VirtualBle {
    #[must_use]
    pub fn new(config: VirtualSensorConfig) -> Self {
        let (link, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                config,
                powered: AtomicBool::new(true),
                reads: AtomicU64::new(0),
                link,
            }),
        }
    }

    /// Advertised name of the simulated sensor.
    #[must_use]
    pub fn sensor_name(&self) -> &str {
        &self.shared.config.name
    }

    pub fn set_powered(&self, powered: bool) {
        self.shared.powered.store(powered, Ordering::SeqCst);
    }

    /// Simulate the sensor going out of range.
    pub fn drop_link(&self) {
        tracing::debug!(sensor = %self.shared.config.name, "virtual link dropped");
        self.shared.link.send_replace(false);
    }

    /// Number of characteristic reads served so far.
    #[must_use]
    pub fn reads(&self) -> u64 {
        self.shared.reads.load(Ordering::SeqCst)
    }

    fn powered(&self) -> bool {
        self.shared.powered.load(Ordering::SeqCst)
    }
}

impl Default for VirtualBle {
    fn default() -> Self {
        Self::new(VirtualSensorConfig::default())
    }
}

impl BleTransport for VirtualBle {
    type Connection = VirtualConnection;

    async fn await_powered_on(&self, _timeout: Duration) -> Result<(), BleError> {
        if self.powered() {
            Ok(())
        } else {
            Err(BleError::AdapterOff)
        }
    }

    async fn scan(
        &self,
        filter: &NameFilter,
        timeout: Duration,
    ) -> Result<Option<Advertisement>, BleError> {
        if !self.powered() {
            return Err(BleError::AdapterOff);
        }
        let config = &self.shared.config;
        if !filter.matches(&config.name) {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        if config.advertise_delay > timeout {
            tokio::time::sleep(timeout).await;
            return Ok(None);
        }
        tokio::time::sleep(config.advertise_delay).await;
        Ok(Some(Advertisement {
            id: format!("virtual:{}", config.name),
            name: config.name.clone(),
            rssi: Some(-60),
        }))
    }

    async fn connect(&self, advertisement: &Advertisement) -> Result<VirtualConnection, BleError> {
        if !self.powered() {
            return Err(BleError::AdapterOff);
        }
        if advertisement.name != self.shared.config.name {
            return Err(BleError::ConnectFailed(
                format!("unknown peripheral {}", advertisement.id).into(),
            ));
        }
        self.shared.link.send_replace(true);
        tracing::debug!(sensor = %advertisement.name, "virtual sensor connected");
        Ok(VirtualConnection {
            shared: Arc::clone(&self.shared),
        })
    }
}

/// Open link to the virtual sensor.
pub struct VirtualConnection {
    shared: Arc<Shared>,
}

/// The one characteristic of the virtual sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualCharacteristic {
    pub uuid: uuid::Uuid,
}

impl BleConnection for VirtualConnection {
    type Characteristic = VirtualCharacteristic;

    async fn discover(&self, target: &GattTarget) -> Result<Option<VirtualCharacteristic>, BleError> {
        if !self.shared.link_up() {
            return Err(BleError::ConnectFailed("link down".into()));
        }
        let uuid = self.shared.config.characteristic;
        Ok((target.characteristic == uuid).then_some(VirtualCharacteristic { uuid }))
    }

    async fn read(&self, _characteristic: &VirtualCharacteristic) -> Result<Vec<u8>, BleError> {
        if !self.shared.link_up() {
            return Err(BleError::ReadFailed("link down".into()));
        }
        let read = self.shared.reads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{:.2}", self.shared.temperature(read)).into_bytes())
    }

    async fn is_connected(&self) -> bool {
        self.shared.link_up()
    }

    async fn disconnect(&self) -> Result<(), BleError> {
        self.shared.link.send_replace(false);
        Ok(())
    }

    fn watch_disconnect(&self, sink: EventSink) -> Subscription {
        let mut link = self.shared.link.subscribe();
        Subscription::from_task(tokio::spawn(async move {
            if link.wait_for(|up| !*up).await.is_ok() {
                sink.disconnected();
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use uhilog_app::ports::{SessionEventKind, event_channel};
    use uhilog_domain::sensor::decode_temperature;

    use super::*;

    async fn connect(ble: &VirtualBle) -> VirtualConnection {
        let filter = NameFilter::Exact("quest_001".to_owned());
        let advertisement = ble
            .scan(&filter, Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        ble.connect(&advertisement).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn should_advertise_matching_name() {
        let ble = VirtualBle::default();

        let found = ble
            .scan(&NameFilter::Prefix("QUEST".to_owned()), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(found.map(|a| a.name).as_deref(), Some("quest_001"));
    }

    #[tokio::test(start_paused = true)]
    async fn should_time_out_scan_when_name_differs() {
        let ble = VirtualBle::default();
        let started = tokio::time::Instant::now();

        let found = ble
            .scan(&NameFilter::Exact("other".to_owned()), Duration::from_secs(3))
            .await
            .unwrap();

        assert!(found.is_none());
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn should_refuse_scan_when_powered_off() {
        let ble = VirtualBle::default();
        ble.set_powered(false);

        let result = ble
            .scan(&NameFilter::Exact("quest_001".to_owned()), Duration::from_secs(1))
            .await;

        assert!(matches!(result, Err(BleError::AdapterOff)));
        assert!(matches!(
            ble.await_powered_on(Duration::from_secs(1)).await,
            Err(BleError::AdapterOff)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_serve_decodable_temperatures_around_base() {
        let ble = VirtualBle::default();
        let connection = connect(&ble).await;
        let characteristic = connection
            .discover(&GattTarget::default())
            .await
            .unwrap()
            .unwrap();

        for _ in 0..50 {
            let payload = connection.read(&characteristic).await.unwrap();
            let value = decode_temperature(&payload).unwrap();
            assert!((21.0..=22.0).contains(&value), "{value}");
        }
        assert_eq!(ble.reads(), 50);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_expose_unknown_characteristic() {
        let ble = VirtualBle::default();
        let connection = connect(&ble).await;
        let target = GattTarget {
            service: None,
            characteristic: uuid::Uuid::nil(),
        };

        assert!(connection.discover(&target).await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_link_drop_to_watcher() {
        let ble = VirtualBle::default();
        let connection = connect(&ble).await;
        let (queue, mut events) = event_channel();
        let _watch = connection.watch_disconnect(queue.sink(3));

        ble.drop_link();

        let event = events.recv().await.unwrap();
        assert_eq!(event.generation, 3);
        assert_eq!(event.kind, SessionEventKind::Disconnected);
        assert!(!connection.is_connected().await);
        assert!(matches!(
            connection.read(&VirtualCharacteristic { uuid: DEFAULT_CHARACTERISTIC_UUID }).await,
            Err(BleError::ReadFailed(_))
        ));
    }
}
