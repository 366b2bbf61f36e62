//! Location port: one-shot fixes and a continuous position stream.

use std::error::Error;
use std::future::Future;
use std::time::Duration;

use uhilog_domain::position::Position;

use crate::ports::events::{EventSink, Subscription};

/// Failure of the location source.
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    /// The location service could not be reached.
    #[error("location service unavailable")]
    Unavailable(#[source] Box<dyn Error + Send + Sync>),

    /// No fix arrived in time.
    #[error("no position fix within {0:?}")]
    Timeout(Duration),

    /// The position stream broke.
    #[error("position stream failed")]
    Stream(#[source] Box<dyn Error + Send + Sync>),
}

/// Parameters of a continuous watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Minimum time between two delivered fixes.
    pub interval: Duration,
    /// Ask the source for its best accuracy.
    pub high_accuracy: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(1000),
            high_accuracy: true,
        }
    }
}

/// Platform location capabilities needed by the session.
///
/// A watch delivers at most one fix at a time through its sink, and stops
/// delivering once the returned [`Subscription`] is cancelled or dropped.
pub trait LocationTransport: Send + Sync {
    /// Fetch a single fix. Used as a liveness probe before watching.
    fn current_position(&self) -> impl Future<Output = Result<Position, LocationError>> + Send;

    /// Start pushing fixes into `sink` at the requested interval.
    fn watch_position(
        &self,
        options: WatchOptions,
        sink: EventSink,
    ) -> impl Future<Output = Result<Subscription, LocationError>> + Send;
}
