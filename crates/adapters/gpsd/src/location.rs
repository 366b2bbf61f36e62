//! gpsd implementation of [`LocationTransport`].

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::time::Instant;

use uhilog_app::ports::{EventSink, LocationError, LocationTransport, Subscription, WatchOptions};
use uhilog_domain::position::Position;

use crate::config::GpsdConfig;
use crate::error::GpsdError;
use crate::protocol::{WATCH_COMMAND, parse_fix};

type Reports = Lines<BufReader<TcpStream>>;

/// Location source reading fixes from a gpsd daemon.
///
/// Every call opens its own connection, so a watch is independent of any
/// one-shot fix taken alongside it.
pub struct GpsdLocation {
    config: GpsdConfig,
}

impl GpsdLocation {
    #[must_use]
    pub fn new(config: GpsdConfig) -> Self {
        Self { config }
    }

    async fn open(&self) -> Result<Reports, GpsdError> {
        let address = format!("{}:{}", self.config.host, self.config.port);
        let mut stream = TcpStream::connect(&address)
            .await
            .map_err(|source| GpsdError::Connect {
                address: address.clone(),
                source,
            })?;
        stream.write_all(WATCH_COMMAND).await?;
        tracing::debug!(%address, "gpsd watch enabled");
        Ok(BufReader::new(stream).lines())
    }
}

/// Read reports until the next fix.
async fn next_fix(reports: &mut Reports) -> Result<Position, GpsdError> {
    loop {
        let line = reports.next_line().await?.ok_or(GpsdError::Closed)?;
        match parse_fix(&line) {
            Ok(Some(position)) => return Ok(position),
            Ok(None) => {}
            Err(err) => tracing::trace!(%err, "ignoring unparsable gpsd report"),
        }
    }
}

/// Forward fixes to `sink`, at most one per `options.interval`.
async fn forward(mut reports: Reports, options: WatchOptions, sink: EventSink) {
    let mut last_sent: Option<Instant> = None;
    loop {
        let position = match next_fix(&mut reports).await {
            Ok(position) => position,
            Err(err) => {
                tracing::warn!(%err, "gpsd stream ended");
                sink.location_failed(err.to_string());
                return;
            }
        };
        if last_sent.is_some_and(|at| at.elapsed() < options.interval) {
            continue;
        }
        last_sent = Some(Instant::now());
        if !sink.location(position) {
            return;
        }
    }
}

impl LocationTransport for GpsdLocation {
    async fn current_position(&self) -> Result<Position, LocationError> {
        let after = self.config.fix_timeout();
        let fix = async {
            let mut reports = self.open().await?;
            next_fix(&mut reports).await
        };
        let position = tokio::time::timeout(after, fix)
            .await
            .map_err(|_| LocationError::Timeout(after))??;
        Ok(position)
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
        sink: EventSink,
    ) -> Result<Subscription, LocationError> {
        if !options.high_accuracy {
            tracing::debug!("gpsd reports at receiver accuracy, ignoring accuracy hint");
        }
        let reports = self.open().await?;
        Ok(Subscription::from_task(tokio::spawn(forward(
            reports, options, sink,
        ))))
    }
}
