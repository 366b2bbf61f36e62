//! # uhilog: field temperature logger
//!
//! Composition root that wires the adapters to the session controller and
//! exposes its operations as subcommands.
//!
//! ## Responsibilities
//! - Parse the command line and configuration (config file, env vars)
//! - Initialize logging
//! - Open the `SQLite` database and run migrations
//! - Pick the real (btleplug, gpsd) or simulated adapters
//! - Run the requested operation and render status events on the terminal
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod presenter;

use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing_subscriber::EnvFilter;

use uhilog_adapter_ble::BtleplugTransport;
use uhilog_adapter_gpsd::GpsdLocation;
use uhilog_adapter_storage_sqlite_sqlx::{
    Config as DatabaseConfig, SharedPool, SqliteSampleStore, SqliteSensorRegistry,
};
use uhilog_adapter_virtual::{GrantAll, VirtualBle, VirtualLocation};
use uhilog_app::ports::{BleTransport, LocationTransport, SampleStore as _, SystemClock};
use uhilog_app::services::export_service::ExportService;
use uhilog_app::services::settings_service::SettingsService;
use uhilog_app::session::{SessionController, SessionPorts};
use uhilog_app::status_bus::StatusBus;
use uhilog_domain::notification::StatusEvent;

use crate::config::Config;

const STATUS_CAPACITY: usize = 64;

#[derive(Debug, Parser)]
#[command(name = "uhilog", version, about = "Field logger for BLE temperature sensors")]
struct Cli {
    /// Use the simulated sensor and GPS instead of the real ones.
    #[arg(long, global = true)]
    simulate: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Pair with the first sensor advertising the configured name prefix.
    Pair,
    /// Inspect or change the operator settings.
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Sample the paired sensor until interrupted.
    Run {
        /// Stop after this many seconds.
        #[arg(long)]
        duration_secs: Option<u64>,
    },
    /// Delete every stored sample.
    Clear {
        /// Confirm the deletion.
        #[arg(long)]
        yes: bool,
    },
    /// Write the stored samples to `<jobcode>.csv`.
    Export {
        /// Directory receiving the file.
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsCommand {
    /// Show the paired sensor, the campaign and the number of stored samples.
    Show,
    /// Save the campaign settings. Deletes the samples of the previous campaign.
    Set {
        /// Campaign name, e.g. `heatwave`.
        #[arg(long)]
        campaign: String,
        /// Sensor number within the campaign, e.g. `7` or `007`.
        #[arg(long)]
        sensor_number: String,
    },
}

type Store = Arc<SqliteSampleStore>;
type Registry = Arc<SqliteSensorRegistry>;
type Controller<B, L> =
    SessionController<B, L, Store, Registry, GrantAll, Arc<StatusBus>, SystemClock>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("loading uhilog.toml")?;

    let filter = EnvFilter::try_new(&config.logging.filter)
        .with_context(|| format!("invalid log filter {:?}", config.logging.filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Database
    let db_config = DatabaseConfig {
        database_url: config.database_url().to_owned(),
    };
    let db = db_config.build().await.context("opening the database")?;
    let shared = Arc::new(SharedPool::with_database(db_config, db));
    let registry = Arc::new(SqliteSensorRegistry::new(Arc::clone(&shared)));
    let store = Arc::new(SqliteSampleStore::new(shared));

    if cli.simulate || config.simulation.enabled {
        tracing::info!("using the simulated sensor and GPS");
        let ble = VirtualBle::new(config.virtual_sensor());
        let location = VirtualLocation::new(config.virtual_track());
        execute(cli.command, &config, ble, location, store, registry).await
    } else {
        let ble = BtleplugTransport::new(config.ble.clone());
        let location = GpsdLocation::new(config.gpsd.clone());
        execute(cli.command, &config, ble, location, store, registry).await
    }
}

async fn execute<B, L>(
    command: Command,
    config: &Config,
    ble: B,
    location: L,
    store: Store,
    registry: Registry,
) -> anyhow::Result<()>
where
    B: BleTransport + 'static,
    L: LocationTransport + 'static,
{
    let bus = Arc::new(StatusBus::new(STATUS_CAPACITY));
    let printer = presenter::spawn(bus.subscribe());

    let ports = SessionPorts {
        ble,
        location,
        store: Arc::clone(&store),
        registry: Arc::clone(&registry),
        permissions: GrantAll,
        notifier: Arc::clone(&bus),
        clock: SystemClock,
    };
    let session_config = config.session_config();
    let retry = session_config.retry;
    let (controller, events) = SessionController::new(ports, session_config);
    let controller = Arc::new(controller);
    let runner = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move { controller.run(events).await })
    };

    let result = match command {
        Command::Pair => controller.pair().await.map(|_| ()).map_err(Into::into),
        Command::Settings {
            action: SettingsCommand::Show,
        } => show_settings(&controller).await,
        Command::Settings {
            action:
                SettingsCommand::Set {
                    campaign,
                    sensor_number,
                },
        } => configure_campaign(&controller, &campaign, &sensor_number).await,
        Command::Run { duration_secs } => {
            let status = bus.subscribe();
            run(&controller, status, duration_secs.map(Duration::from_secs)).await
        }
        Command::Clear { yes } => clear(&controller, yes).await,
        Command::Export { output } => {
            let exporter = ExportService::new(store, SettingsService::new(registry, retry));
            export(&controller, &exporter, &output).await
        }
    };

    // release every bus sender so the printer drains and exits
    runner.abort();
    let _ = runner.await;
    drop(controller);
    drop(bus);
    let _ = printer.await;
    result
}

async fn configure_campaign<B, L>(
    controller: &Controller<B, L>,
    name: &str,
    sensor_number: &str,
) -> anyhow::Result<()>
where
    B: BleTransport,
    L: LocationTransport,
{
    let campaign = controller.configure_campaign(name, sensor_number).await?;
    println!("campaign saved: {}", campaign.label());
    Ok(())
}

async fn show_settings<B, L>(controller: &Controller<B, L>) -> anyhow::Result<()>
where
    B: BleTransport,
    L: LocationTransport,
{
    let settings = controller.settings();
    match settings.paired_sensor().await? {
        Some(sensor) => println!("paired sensor: {sensor}"),
        None => println!("paired sensor: none"),
    }
    match settings.campaign().await? {
        Some(campaign) => println!("campaign: {}", campaign.label()),
        None => println!("campaign: not set"),
    }
    let samples = controller.store().all().await?;
    println!("stored samples: {}", samples.len());
    Ok(())
}

async fn run<B, L>(
    controller: &Controller<B, L>,
    mut status: broadcast::Receiver<StatusEvent>,
    duration: Option<Duration>,
) -> anyhow::Result<()>
where
    B: BleTransport,
    L: LocationTransport,
{
    let sensor = controller.start_paired().await?;
    tracing::info!(%sensor, "sampling, press Ctrl-C to stop");

    let limit = async {
        match duration {
            Some(duration) => tokio::time::sleep(duration).await,
            None => pending().await,
        }
    };
    tokio::select! {
        res = tokio::signal::ctrl_c() => {
            res.context("listening for Ctrl-C")?;
            tracing::info!("interrupted");
        }
        () = limit => tracing::info!("duration elapsed"),
        () = session_ended(&mut status) => {}
    }

    controller.stop().await;
    let snapshot = controller.snapshot().await;
    println!("{} samples recorded", snapshot.sample_count);
    Ok(())
}

/// Wait for an event that ends the running session.
async fn session_ended(status: &mut broadcast::Receiver<StatusEvent>) {
    loop {
        match status.recv().await {
            Ok(event) if presenter::is_terminal(&event) => return,
            Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

async fn clear<B, L>(controller: &Controller<B, L>, confirmed: bool) -> anyhow::Result<()>
where
    B: BleTransport,
    L: LocationTransport,
{
    if !confirmed {
        bail!("deleting every stored sample needs --yes");
    }
    controller.clear().await?;
    Ok(())
}

async fn export<B, L>(
    controller: &Controller<B, L>,
    exporter: &ExportService<Store, Registry>,
    output: &Path,
) -> anyhow::Result<()>
where
    B: BleTransport,
    L: LocationTransport,
{
    let snapshot = controller.snapshot().await;
    let csv = exporter.export(&snapshot, &chrono::Local::now()).await?;
    let path = output.join(&csv.file_name);
    std::fs::write(&path, csv.contents)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("{} rows written to {}", csv.rows, path.display());
    Ok(())
}
