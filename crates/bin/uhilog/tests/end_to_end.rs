//! End-to-end tests for the full uhilog stack.
//!
//! Each test wires the simulated sensor and GPS to the real session
//! controller, an in-memory `SQLite` database and the export service, then
//! drives a field workflow through the public operations.

use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, TimeZone};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use uhilog_adapter_storage_sqlite_sqlx::{
    Config, SharedPool, SqliteSampleStore, SqliteSensorRegistry,
};
use uhilog_adapter_virtual::{GrantAll, VirtualBle, VirtualLocation, VirtualSensorConfig};
use uhilog_app::error::{ExportError, SessionError};
use uhilog_app::ports::{SampleStore, SystemClock};
use uhilog_app::services::export_service::{CSV_HEADER, ExportService};
use uhilog_app::services::settings_service::SettingsService;
use uhilog_app::session::{ConnectionState, SessionConfig, SessionController, SessionPorts};
use uhilog_app::status_bus::StatusBus;
use uhilog_domain::notification::StatusEvent;

type Controller = SessionController<
    VirtualBle,
    VirtualLocation,
    Arc<SqliteSampleStore>,
    Arc<SqliteSensorRegistry>,
    GrantAll,
    Arc<StatusBus>,
    SystemClock,
>;

struct Stack {
    controller: Arc<Controller>,
    exporter: ExportService<Arc<SqliteSampleStore>, Arc<SqliteSensorRegistry>>,
    store: Arc<SqliteSampleStore>,
    ble: VirtualBle,
    location: VirtualLocation,
    status: broadcast::Receiver<StatusEvent>,
    runner: JoinHandle<()>,
}

/// Build the full stack backed by an in-memory `SQLite` database.
async fn stack() -> Stack {
    stack_on(Config {
        database_url: "sqlite::memory:".to_string(),
    })
    .await
}

async fn stack_on(config: Config) -> Stack {
    let db = config
        .build()
        .await
        .expect("database should initialise");
    let shared = Arc::new(SharedPool::with_database(config, db));
    let registry = Arc::new(SqliteSensorRegistry::new(Arc::clone(&shared)));
    let store = Arc::new(SqliteSampleStore::new(shared));

    let ble = VirtualBle::new(VirtualSensorConfig {
        advertise_delay: Duration::from_millis(10),
        ..VirtualSensorConfig::default()
    });
    let location = VirtualLocation::default();
    let bus = Arc::new(StatusBus::new(256));
    let status = bus.subscribe();

    let session_config = SessionConfig {
        scan_timeout: Duration::from_secs(2),
        settle_delay: Duration::ZERO,
        sample_interval: Duration::from_millis(100),
        pair_scan_timeout: Duration::from_secs(2),
        ..SessionConfig::default()
    };
    let retry = session_config.retry;
    let (controller, events) = SessionController::new(
        SessionPorts {
            ble: ble.clone(),
            location: location.clone(),
            store: Arc::clone(&store),
            registry: Arc::clone(&registry),
            permissions: GrantAll,
            notifier: bus,
            clock: SystemClock,
        },
        session_config,
    );
    let controller = Arc::new(controller);
    let runner = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.run(events).await })
    };

    Stack {
        exporter: ExportService::new(Arc::clone(&store), SettingsService::new(registry, retry)),
        controller,
        store,
        ble,
        location,
        status,
        runner,
    }
}

async fn wait_for_samples(controller: &Controller, count: u64) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.snapshot().await.sample_count < count {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("samples should be recorded");
}

async fn wait_for_event(
    status: &mut broadcast::Receiver<StatusEvent>,
    wanted: impl Fn(&StatusEvent) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = status.recv().await.expect("status bus should stay open");
            if wanted(&event) {
                return;
            }
        }
    })
    .await
    .expect("status event should be published");
}

fn export_time() -> chrono::DateTime<FixedOffset> {
    FixedOffset::west_opt(7 * 3600)
        .unwrap()
        .with_ymd_and_hms(2025, 7, 14, 15, 30, 0)
        .unwrap()
}

#[tokio::test]
async fn should_pair_sample_and_export_a_campaign() {
    let Stack {
        controller,
        exporter,
        store,
        runner,
        ..
    } = stack().await;

    controller
        .configure_campaign("heatwave", "007")
        .await
        .unwrap();
    let sensor = controller.pair().await.unwrap();
    assert_eq!(sensor.name(), "quest_001");

    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 3).await;
    controller.stop().await;

    let snapshot = controller.snapshot().await;
    assert!(snapshot.is_released());
    let stored = store.all().await.unwrap();
    assert!(stored.len() >= 3);
    assert!(stored.windows(2).all(|w| w[0].timestamp_millis < w[1].timestamp_millis));

    let csv = exporter.export(&snapshot, &export_time()).await.unwrap();
    assert_eq!(csv.jobcode.as_str(), "heatwave_007-20250714153000");
    assert_eq!(csv.file_name, "heatwave_007-20250714153000.csv");
    assert_eq!(csv.rows, stored.len());

    let mut lines = csv.contents.lines();
    assert_eq!(lines.next(), Some(CSV_HEADER));
    let first = lines.next().unwrap();
    assert!(first.starts_with("1,heatwave_007-20250714153000,"));
    assert_eq!(first.split(',').count(), 12);
    assert_eq!(lines.count(), stored.len() - 1);

    runner.abort();
}

#[tokio::test]
async fn should_refuse_export_while_sampling() {
    let Stack {
        controller,
        exporter,
        runner,
        ..
    } = stack().await;
    controller
        .configure_campaign("heatwave", "007")
        .await
        .unwrap();
    controller.pair().await.unwrap();
    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 1).await;

    let snapshot = controller.snapshot().await;
    assert_eq!(snapshot.state, ConnectionState::Sampling);
    let result = exporter.export(&snapshot, &export_time()).await;
    assert!(matches!(result, Err(ExportError::SamplingInProgress)));

    let cleared = controller.clear().await;
    assert!(matches!(cleared, Err(SessionError::SamplingInProgress)));

    controller.stop().await;
    runner.abort();
}

#[tokio::test]
async fn should_clear_samples_after_stop() {
    let Stack {
        controller,
        exporter,
        store,
        runner,
        ..
    } = stack().await;
    controller
        .configure_campaign("heatwave", "007")
        .await
        .unwrap();
    controller.pair().await.unwrap();
    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 2).await;
    controller.stop().await;

    controller.clear().await.unwrap();

    assert!(store.all().await.unwrap().is_empty());
    let result = exporter
        .export(&controller.snapshot().await, &export_time())
        .await;
    assert!(matches!(result, Err(ExportError::NoData)));
    runner.abort();
}

#[tokio::test]
async fn should_refuse_to_start_without_paired_sensor() {
    let Stack {
        controller, runner, ..
    } = stack().await;

    let result = controller.start_paired().await;

    assert!(matches!(result, Err(SessionError::NotPaired)));
    assert_eq!(controller.snapshot().await.state, ConnectionState::Idle);
    runner.abort();
}

#[tokio::test]
async fn should_release_session_when_sensor_drops() {
    let Stack {
        controller,
        ble,
        mut status,
        runner,
        ..
    } = stack().await;
    controller.pair().await.unwrap();
    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 1).await;

    ble.drop_link();
    wait_for_event(&mut status, |e| *e == StatusEvent::Disconnected).await;

    assert!(controller.snapshot().await.is_released());
    runner.abort();
}

#[tokio::test]
async fn should_stop_when_location_is_lost() {
    let Stack {
        controller,
        location,
        mut status,
        runner,
        ..
    } = stack().await;
    controller.pair().await.unwrap();
    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 1).await;

    location.set_available(false);
    wait_for_event(&mut status, |e| {
        matches!(e, StatusEvent::LocationLost { .. })
    })
    .await;

    assert!(controller.snapshot().await.is_released());
    runner.abort();
}

#[tokio::test]
async fn should_start_again_after_storage_reopen() {
    let path = std::env::temp_dir().join(format!("uhilog-e2e-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let Stack {
        controller,
        store,
        runner,
        ..
    } = stack_on(Config {
        database_url: format!("sqlite:{}?mode=rwc", path.display()),
    })
    .await;
    controller.pair().await.unwrap();
    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 1).await;
    controller.stop().await;

    store.invalidate().await;

    controller.start_paired().await.unwrap();
    wait_for_samples(&controller, 1).await;
    controller.stop().await;
    assert!(store.all().await.unwrap().len() >= 2);

    runner.abort();
    let _ = std::fs::remove_file(&path);
}
