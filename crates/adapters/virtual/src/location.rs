//! Virtual GPS receiver walking a straight track.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::time::MissedTickBehavior;

use uhilog_app::ports::{EventSink, LocationError, LocationTransport, Subscription, WatchOptions};
use uhilog_domain::position::Position;

/// Shape of the simulated walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VirtualTrack {
    pub start_latitude: f64,
    pub start_longitude: f64,
    /// Degrees added to latitude and longitude on every fix.
    pub step_degrees: f64,
    pub altitude: f64,
    pub accuracy: f64,
    /// Ground speed in m/s.
    pub speed: f64,
}

impl Default for VirtualTrack {
    fn default() -> Self {
        Self {
            start_latitude: 37.681_9,
            start_longitude: -121.768,
            step_degrees: 0.000_01,
            altitude: 145.0,
            accuracy: 4.5,
            speed: 1.2,
        }
    }
}

impl VirtualTrack {
    /// Position of the `fix`-th point of the walk.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn at(&self, fix: u64) -> Position {
        let offset = self.step_degrees * fix as f64;
        Position::new(self.start_latitude + offset, self.start_longitude + offset)
            .with_altitude(self.altitude)
            .with_accuracy(self.accuracy)
            .with_speed(self.speed)
    }
}

struct Shared {
    track: VirtualTrack,
    fixes: AtomicU64,
    available: AtomicBool,
}

impl Shared {
    fn next(&self) -> Position {
        self.track.at(self.fixes.fetch_add(1, Ordering::SeqCst))
    }
}

/// Simulated location source. Clones share the same walk.
#[derive(Clone)]
pub struct VirtualLocation {
    shared: Arc<Shared>,
}

impl VirtualLocation {
    #[must_use]
    pub fn new(track: VirtualTrack) -> Self {
        Self {
            shared: Arc::new(Shared {
                track,
                fixes: AtomicU64::new(0),
                available: AtomicBool::new(true),
            }),
        }
    }

    /// Simulate the receiver losing or regaining the service.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    /// Number of fixes produced so far.
    #[must_use]
    pub fn fixes(&self) -> u64 {
        self.shared.fixes.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), LocationError> {
        if self.shared.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LocationError::Unavailable("virtual receiver disabled".into()))
        }
    }
}

impl Default for VirtualLocation {
    fn default() -> Self {
        Self::new(VirtualTrack::default())
    }
}

impl LocationTransport for VirtualLocation {
    async fn current_position(&self) -> Result<Position, LocationError> {
        self.check()?;
        Ok(self.shared.track.at(self.fixes()))
    }

    async fn watch_position(
        &self,
        options: WatchOptions,
        sink: EventSink,
    ) -> Result<Subscription, LocationError> {
        self.check()?;
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(options.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !shared.available.load(Ordering::SeqCst) {
                    sink.location_failed("virtual receiver disabled");
                    break;
                }
                if !sink.location(shared.next()) {
                    break;
                }
            }
        });
        Ok(Subscription::from_task(task))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use uhilog_app::ports::{SessionEventKind, event_channel};

    use super::*;

    fn options() -> WatchOptions {
        WatchOptions {
            interval: Duration::from_millis(1000),
            high_accuracy: true,
        }
    }

    #[test]
    fn should_walk_from_start() {
        let track = VirtualTrack::default();
        let first = track.at(0);
        let tenth = track.at(10);

        assert!((first.latitude - 37.681_9).abs() < 1e-9);
        assert!((tenth.latitude - first.latitude - 0.000_1).abs() < 1e-9);
        assert_eq!(first.accuracy, Some(4.5));
    }

    #[tokio::test(start_paused = true)]
    async fn should_deliver_fixes_at_interval() {
        let location = VirtualLocation::default();
        let (queue, mut events) = event_channel();

        let subscription = location
            .watch_position(options(), queue.sink(1))
            .await
            .unwrap();
        for _ in 0..3 {
            let event = events.recv().await.unwrap();
            assert!(matches!(event.kind, SessionEventKind::Location(_)));
        }
        subscription.cancel();

        assert_eq!(location.fixes(), 3);
    }

    #[tokio::test]
    async fn should_refuse_when_unavailable() {
        let location = VirtualLocation::default();
        location.set_available(false);

        assert!(matches!(
            location.current_position().await,
            Err(LocationError::Unavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn should_report_failure_when_receiver_goes_away() {
        let location = VirtualLocation::default();
        let (queue, mut events) = event_channel();
        let _subscription = location
            .watch_position(options(), queue.sink(2))
            .await
            .unwrap();
        assert!(events.recv().await.is_some());

        location.set_available(false);

        let event = events.recv().await.unwrap();
        assert!(matches!(event.kind, SessionEventKind::LocationFailed(_)));
    }
}
