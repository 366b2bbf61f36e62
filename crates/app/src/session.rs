//! Session controller: the BLE pairing and sampling state machine.
//!
//! ```text
//! Idle ──start──▶ Scanning ──match──▶ Connected ──settle──▶ Sampling
//!  ▲                 │                    │                     │
//!  └──── timeout ────┘                    └──── Disconnecting ◀─┘
//! ```
//!
//! The controller owns the single [`Session`]. User operations (`start`,
//! `stop`, `clear`, `pair`) and adapter callbacks (drained by
//! [`SessionController::run`]) serialise on one lock, so a read-join-persist
//! cycle never overlaps another one or a teardown.

mod state;

use std::time::Duration;

use tokio::sync::Mutex;

use uhilog_domain::campaign::Campaign;
use uhilog_domain::notification::StatusEvent;
use uhilog_domain::position::Position;
use uhilog_domain::sample::Sample;
use uhilog_domain::sensor::{NameFilter, PairedSensor, decode_temperature};

use crate::error::{SessionError, describe};
use crate::ports::{
    Advertisement, BleConnection, BleTransport, Clock, EventQueue, LocationTransport,
    NotificationSink, PermissionGate, SampleStore, SensorRegistry, SessionEvent,
    SessionEventKind, SessionEvents, WatchOptions, event_channel,
};
use crate::services::settings_service::SettingsService;

use state::Session;
pub use state::{ConnectionState, SessionConfig, SessionSnapshot};

type Connection<B> = <B as BleTransport>::Connection;
type Characteristic<B> = <Connection<B> as BleConnection>::Characteristic;

/// The adapters a [`SessionController`] drives.
pub struct SessionPorts<B, L, S, R, P, N, K> {
    pub ble: B,
    pub location: L,
    pub store: S,
    pub registry: R,
    pub permissions: P,
    pub notifier: N,
    pub clock: K,
}

/// Owns the session state machine and exposes its four operations.
pub struct SessionController<B: BleTransport, L, S, R, P, N, K> {
    ble: B,
    location: L,
    store: S,
    settings: SettingsService<R>,
    permissions: P,
    notifier: N,
    clock: K,
    config: SessionConfig,
    queue: EventQueue,
    session: Mutex<Session<B::Connection>>,
}

impl<B, L, S, R, P, N, K> SessionController<B, L, S, R, P, N, K>
where
    B: BleTransport,
    L: LocationTransport,
    S: SampleStore,
    R: SensorRegistry,
    P: PermissionGate,
    N: NotificationSink,
    K: Clock,
{
    /// Build a controller and the event queue its [`run`](Self::run) loop drains.
    pub fn new(
        ports: SessionPorts<B, L, S, R, P, N, K>,
        config: SessionConfig,
    ) -> (Self, SessionEvents) {
        let (queue, events) = event_channel();
        let controller = Self {
            ble: ports.ble,
            location: ports.location,
            store: ports.store,
            settings: SettingsService::new(ports.registry, config.retry),
            permissions: ports.permissions,
            notifier: ports.notifier,
            clock: ports.clock,
            config,
            queue,
            session: Mutex::new(Session::new()),
        };
        (controller, events)
    }

    /// Operator settings backing this controller.
    pub fn settings(&self) -> &SettingsService<R> {
        &self.settings
    }

    /// Sample store backing this controller.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current state of the session.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.session.lock().await.snapshot()
    }

    /// Drain adapter callbacks one at a time until the queue closes.
    pub async fn run(&self, mut events: SessionEvents) {
        while let Some(event) = events.recv().await {
            self.dispatch(event).await;
        }
        tracing::debug!("session event queue closed");
    }

    /// Handle one adapter callback.
    pub async fn dispatch(&self, event: SessionEvent) {
        let mut session = self.session.lock().await;
        if event.generation != session.generation {
            tracing::trace!(
                stale = event.generation,
                current = session.generation,
                "discarding event from a previous session"
            );
            return;
        }

        match event.kind {
            SessionEventKind::Location(position) => self.record(&mut session, &position).await,
            SessionEventKind::Disconnected => self.recover(&mut session).await,
            SessionEventKind::LocationFailed(reason) => {
                tracing::error!(%reason, "location stream failed");
                self.notifier.notify(StatusEvent::LocationLost { reason });
                session.intentional_disconnect = true;
                self.teardown(&mut session).await;
            }
        }
    }

    /// Start a session with the paired sensor from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NotPaired`] when no sensor is paired, otherwise
    /// the same errors as [`start`](Self::start).
    pub async fn start_paired(&self) -> Result<PairedSensor, SessionError> {
        let sensor = self
            .settings
            .paired_sensor()
            .await?
            .ok_or(SessionError::NotPaired)?;
        self.start(&sensor).await?;
        Ok(sensor)
    }

    /// Scan for `sensor`, connect, and begin sampling.
    ///
    /// Returns once sampling has started. Samples are then recorded as the
    /// [`run`](Self::run) loop receives location fixes.
    ///
    /// # Errors
    ///
    /// - [`SessionError::Busy`] when not idle
    /// - [`SessionError::PermissionDenied`] when a permission is missing
    /// - [`SessionError::SensorNotFound`] / [`SessionError::SensorIncompatible`]
    /// - [`SessionError::Cancelled`] when `stop` ran while connecting
    /// - BLE and location failures
    #[tracing::instrument(skip(self, sensor), fields(sensor = %sensor))]
    pub async fn start(&self, sensor: &PairedSensor) -> Result<(), SessionError> {
        let generation = {
            let mut session = self.session.lock().await;
            if session.state != ConnectionState::Idle {
                return Err(SessionError::Busy(session.state));
            }
            if !self.permissions_granted().await {
                tracing::warn!("location or bluetooth permission missing");
                return Err(SessionError::PermissionDenied);
            }
            self.release_stale(&mut session).await;
            session.begin(sensor.name())
        };
        self.notifier.notify(StatusEvent::Scanning {
            sensor: sensor.name().to_owned(),
        });

        let filter = NameFilter::Exact(sensor.name().to_owned());
        let (_, device, characteristic) =
            match self.find_sensor(&filter, self.config.scan_timeout).await {
                Ok(found) => found,
                Err(err) => {
                    self.abandon_start(generation, &err).await;
                    return Err(err);
                }
            };

        {
            let mut session = self.session.lock().await;
            if session.generation != generation || session.state != ConnectionState::Scanning {
                drop(session);
                tracing::info!("start cancelled while connecting");
                disconnect_quietly(&device).await;
                return Err(SessionError::Cancelled);
            }
            session.disconnect_watch = Some(device.watch_disconnect(self.queue.sink(generation)));
            session.device = Some(device);
            session.characteristic = Some(characteristic);
            session.state = ConnectionState::Connected;
        }
        tracing::info!("sensor connected");
        self.notifier.notify(StatusEvent::Connected {
            sensor: sensor.name().to_owned(),
        });

        tokio::time::sleep(self.config.settle_delay).await;

        let mut session = self.session.lock().await;
        if session.generation != generation || session.state != ConnectionState::Connected {
            tracing::info!(state = %session.state, "start cancelled while settling");
            return Err(SessionError::Cancelled);
        }
        self.begin_sampling(&mut session).await
    }

    /// Tear the session down. A no-op when already stopped.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) {
        let mut session = self.session.lock().await;
        if session.is_released() {
            tracing::debug!("already stopped");
            return;
        }
        session.intentional_disconnect = true;
        self.teardown(&mut session).await;
        tracing::info!(samples = session.sample_count, "session stopped");
        self.notifier.notify(StatusEvent::Stopped);
    }

    /// Delete every stored sample.
    ///
    /// The caller is responsible for obtaining the operator's confirmation.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SamplingInProgress`] while sampling, or the
    /// storage error of the delete.
    #[tracing::instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), SessionError> {
        let mut session = self.session.lock().await;
        self.clear_samples(&mut session).await
    }

    /// Validate and save campaign settings, then clear the samples of the
    /// previous campaign.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Validation`] for invalid input,
    /// [`SessionError::SamplingInProgress`] while sampling, or the settings
    /// and storage errors.
    #[tracing::instrument(skip(self))]
    pub async fn configure_campaign(
        &self,
        name: &str,
        sensor_number: &str,
    ) -> Result<Campaign, SessionError> {
        let campaign = Campaign::new(name, sensor_number)?;
        let mut session = self.session.lock().await;
        if session.state == ConnectionState::Sampling {
            return Err(SessionError::SamplingInProgress);
        }
        self.settings.save_campaign(&campaign).await?;
        self.clear_samples(&mut session).await?;
        tracing::info!(label = %campaign.label(), "campaign saved");
        Ok(campaign)
    }

    /// Pair with the first sensor advertising the configured name prefix.
    ///
    /// Any running session is stopped first. The sensor is disconnected
    /// again whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SensorNotFound`] when nothing matched,
    /// [`SessionError::SensorIncompatible`] when the match lacks the
    /// characteristic, or the BLE and settings errors.
    #[tracing::instrument(skip(self))]
    pub async fn pair(&self) -> Result<PairedSensor, SessionError> {
        self.stop().await;

        let mut session = self.session.lock().await;
        if session.state != ConnectionState::Idle {
            return Err(SessionError::Busy(session.state));
        }
        if !self.permissions.bluetooth().await {
            return Err(SessionError::PermissionDenied);
        }
        self.release_stale(&mut session).await;

        let result = self.pair_first_match().await;
        match &result {
            Ok(sensor) => {
                tracing::info!(%sensor, "sensor paired");
                self.notifier.notify(StatusEvent::Paired {
                    sensor: sensor.name().to_owned(),
                });
            }
            Err(err) => {
                tracing::warn!(error = %err, "pairing failed");
                self.notifier.notify(StatusEvent::PairingFailed {
                    reason: describe(err),
                });
            }
        }
        result
    }

    async fn pair_first_match(&self) -> Result<PairedSensor, SessionError> {
        let filter = NameFilter::Prefix(self.config.pair_name_prefix.clone());
        let (advertisement, device, _) = self
            .find_sensor(&filter, self.config.pair_scan_timeout)
            .await?;

        let saved = async {
            let sensor = PairedSensor::new(advertisement.name.clone())?;
            self.settings.save_paired_sensor(&sensor).await?;
            Ok::<_, SessionError>(sensor)
        }
        .await;

        disconnect_quietly(&device).await;
        saved
    }

    async fn permissions_granted(&self) -> bool {
        self.permissions.location().await && self.permissions.bluetooth().await
    }

    /// Drop handles left over from an earlier session.
    async fn release_stale(&self, session: &mut Session<B::Connection>) {
        session.location_subscription = None;
        session.disconnect_watch = None;
        session.characteristic = None;
        if let Some(stale) = session.device.take() {
            tracing::info!("disconnecting stale device");
            disconnect_quietly(&stale).await;
        }
    }

    /// Power-on wait, scan, connect, and look up the target characteristic.
    async fn find_sensor(
        &self,
        filter: &NameFilter,
        timeout: Duration,
    ) -> Result<(Advertisement, B::Connection, Characteristic<B>), SessionError> {
        self.ble.await_powered_on(self.config.power_on_timeout).await?;

        tracing::info!(%filter, ?timeout, "scanning");
        let Some(advertisement) = self.ble.scan(filter, timeout).await? else {
            tracing::warn!(%filter, "no matching sensor in range");
            return Err(SessionError::SensorNotFound(filter.to_string()));
        };

        tracing::debug!(name = %advertisement.name, id = %advertisement.id, "connecting");
        let device = self.ble.connect(&advertisement).await?;
        match device.discover(&self.config.gatt).await {
            Ok(Some(characteristic)) => Ok((advertisement, device, characteristic)),
            Ok(None) => {
                tracing::warn!(name = %advertisement.name, "temperature characteristic missing");
                disconnect_quietly(&device).await;
                Err(SessionError::SensorIncompatible(advertisement.name))
            }
            Err(err) => {
                disconnect_quietly(&device).await;
                Err(err.into())
            }
        }
    }

    /// Return to `Idle` after a failed scan or connect, unless `stop` already did.
    async fn abandon_start(&self, generation: u64, err: &SessionError) {
        match err {
            SessionError::SensorNotFound(sensor) => {
                self.notifier.notify(StatusEvent::SensorNotFound {
                    sensor: sensor.clone(),
                });
            }
            SessionError::SensorIncompatible(sensor) => {
                self.notifier.notify(StatusEvent::SensorIncompatible {
                    sensor: sensor.clone(),
                });
            }
            _ => tracing::warn!(error = %err, "start failed"),
        }

        let mut session = self.session.lock().await;
        if session.generation == generation && session.state == ConnectionState::Scanning {
            session.state = ConnectionState::Idle;
            session.generation += 1;
        }
    }

    async fn begin_sampling(&self, session: &mut Session<B::Connection>) -> Result<(), SessionError> {
        let connected = match &session.device {
            Some(device) => device.is_connected().await,
            None => false,
        };
        if !connected || session.characteristic.is_none() {
            tracing::warn!("cannot start sampling without a live connection");
            self.notifier.notify(StatusEvent::NotConnected);
            return Err(SessionError::NotConnected);
        }

        let sink = self.queue.sink(session.generation);
        let options = WatchOptions {
            interval: self.config.sample_interval,
            high_accuracy: true,
        };
        let watch = async {
            let probe = self.location.current_position().await?;
            tracing::debug!(latitude = probe.latitude, longitude = probe.longitude, "location probe");
            self.location.watch_position(options, sink).await
        }
        .await;

        match watch {
            Ok(subscription) => {
                session.location_subscription = Some(subscription);
                session.state = ConnectionState::Sampling;
                tracing::info!("sampling started");
                self.notifier.notify(StatusEvent::SamplingStarted {
                    sensor: session.sensor.clone().unwrap_or_default(),
                });
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "location unavailable");
                self.notifier.notify(StatusEvent::LocationLost {
                    reason: describe(&err),
                });
                session.intentional_disconnect = true;
                self.teardown(session).await;
                Err(err.into())
            }
        }
    }

    /// One read-join-persist cycle for a location fix.
    async fn record(&self, session: &mut Session<B::Connection>, position: &Position) {
        if session.state != ConnectionState::Sampling {
            tracing::debug!(state = %session.state, "location fix outside sampling");
            self.recover(session).await;
            return;
        }

        let read = match (session.device.as_ref(), session.characteristic.as_ref()) {
            (Some(device), Some(characteristic)) => Some(device.read(characteristic).await),
            _ => None,
        };
        let payload = match read {
            Some(Ok(payload)) => payload,
            Some(Err(err)) => {
                tracing::error!(error = %err, "sensor read failed");
                self.notifier.notify(StatusEvent::SensorReadError {
                    reason: describe(&err),
                });
                self.recover(session).await;
                return;
            }
            None => {
                self.recover(session).await;
                return;
            }
        };

        let temperature = match decode_temperature(&payload) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable sensor value");
                self.notifier.notify(StatusEvent::PayloadRejected {
                    reason: err.to_string(),
                });
                return;
            }
        };

        let now = self.clock.now_millis();
        if session
            .last_written_millis
            .is_some_and(|last| now - last < self.config.duplicate_window_ms)
        {
            tracing::debug!(now, "dropping duplicate location callback");
            return;
        }

        let sample = Sample::from_reading(now, temperature, position);
        if let Err(err) = self.store.append(sample).await {
            tracing::error!(error = %err, "failed to persist sample, stopping session");
            self.notifier.notify(StatusEvent::StorageError {
                reason: describe(&err),
            });
            session.intentional_disconnect = true;
            self.teardown(session).await;
            self.store.invalidate().await;
            self.notifier.notify(StatusEvent::Stopped);
            return;
        }

        session.last_written_millis = Some(now);
        session.sample_count += 1;
        tracing::debug!(count = session.sample_count, temperature, "sample recorded");
        self.notifier.notify(StatusEvent::SampleRecorded {
            count: session.sample_count,
            temperature_celsius: temperature,
            accuracy_m: position.accuracy,
        });
    }

    /// Disconnect recovery. Idempotent.
    async fn recover(&self, session: &mut Session<B::Connection>) {
        let intentional = session.intentional_disconnect;
        if !self.teardown(session).await {
            return;
        }
        if intentional {
            tracing::debug!("expected disconnect");
        } else {
            tracing::warn!("sensor disconnected unexpectedly");
            self.notifier.notify(StatusEvent::Disconnected);
        }
    }

    /// Release every handle and return to `Idle`. Returns `false` when there
    /// was nothing to release.
    async fn teardown(&self, session: &mut Session<B::Connection>) -> bool {
        if session.is_released() {
            return false;
        }

        session.state = ConnectionState::Disconnecting;
        if let Some(subscription) = session.location_subscription.take() {
            subscription.cancel();
        }
        if let Some(watch) = session.disconnect_watch.take() {
            watch.cancel();
        }
        session.characteristic = None;
        if let Some(device) = session.device.take()
            && device.is_connected().await
        {
            disconnect_quietly(&device).await;
        }
        session.state = ConnectionState::Idle;
        session.generation += 1;
        true
    }

    async fn clear_samples(&self, session: &mut Session<B::Connection>) -> Result<(), SessionError> {
        if session.state == ConnectionState::Sampling {
            tracing::warn!("refusing to clear while sampling");
            return Err(SessionError::SamplingInProgress);
        }
        if let Err(err) = self.store.delete_all().await {
            tracing::error!(error = %err, "failed to delete samples");
            self.store.invalidate().await;
            return Err(err.into());
        }
        session.sample_count = 0;
        session.last_written_millis = None;
        tracing::info!("samples deleted");
        self.notifier.notify(StatusEvent::Cleared);
        Ok(())
    }
}

async fn disconnect_quietly<C: BleConnection>(device: &C) {
    if let Err(err) = device.disconnect().await {
        tracing::warn!(error = %err, "disconnect failed");
    }
}
