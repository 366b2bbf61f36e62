//! Event delivery from adapters back into the session.
//!
//! Adapters never call the controller directly. They push [`SessionEvent`]s
//! through an [`EventSink`] and the controller drains them one at a time.
//! Each sink is stamped with the session generation it was created for, so
//! events that outlive their session are recognisable and dropped.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use uhilog_domain::position::Position;

/// One callback delivered by an adapter.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionEvent {
    /// Generation of the session the producing subscription belongs to.
    pub generation: u64,
    pub kind: SessionEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEventKind {
    /// A new fix from the location stream.
    Location(Position),
    /// The BLE link dropped.
    Disconnected,
    /// The location stream failed and will not deliver further fixes.
    LocationFailed(String),
}

/// Create the session event queue.
#[must_use]
pub fn event_channel() -> (EventQueue, SessionEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventQueue { tx }, SessionEvents { rx })
}

/// Producer side of the queue; hands out generation-stamped sinks.
#[derive(Clone)]
pub struct EventQueue {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventQueue {
    /// Create a sink whose events carry `generation`.
    #[must_use]
    pub fn sink(&self, generation: u64) -> EventSink {
        EventSink {
            generation,
            tx: self.tx.clone(),
        }
    }
}

/// Consumer side of the queue, owned by whoever runs the controller loop.
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Wait for the next event. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<SessionEvent> {
        self.rx.recv().await
    }

    /// Take an already queued event without waiting.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.rx.try_recv().ok()
    }
}

/// Handle adapters use to deliver callbacks for one session.
#[derive(Clone, Debug)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl EventSink {
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Deliver a location fix. Returns `false` once the controller is gone.
    pub fn location(&self, position: Position) -> bool {
        self.send(SessionEventKind::Location(position))
    }

    /// Report that the BLE link dropped.
    pub fn disconnected(&self) -> bool {
        self.send(SessionEventKind::Disconnected)
    }

    /// Report that the location stream ended with an error.
    pub fn location_failed(&self, reason: impl Into<String>) -> bool {
        self.send(SessionEventKind::LocationFailed(reason.into()))
    }

    /// Whether the consuming side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, kind: SessionEventKind) -> bool {
        self.tx
            .send(SessionEvent {
                generation: self.generation,
                kind,
            })
            .is_ok()
    }
}

/// Ownership handle to an adapter's delivery task.
///
/// Cancelling or dropping the subscription aborts the task, so no further
/// events are produced once it is gone.
#[derive(Debug, Default)]
pub struct Subscription {
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Tie the subscription to a spawned delivery task.
    #[must_use]
    pub fn from_task(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// A subscription with no background task (events are pushed inline).
    #[must_use]
    pub fn detached() -> Self {
        Self::default()
    }

    /// Stop delivery.
    pub fn cancel(mut self) {
        self.abort();
    }

    fn abort(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn should_stamp_events_with_sink_generation() {
        let (queue, mut events) = event_channel();
        let sink = queue.sink(7);

        assert!(sink.location(Position::new(1.0, 2.0)));
        assert!(sink.disconnected());

        let first = events.try_recv().unwrap();
        assert_eq!(first.generation, 7);
        assert_eq!(
            first.kind,
            SessionEventKind::Location(Position::new(1.0, 2.0))
        );
        let second = events.try_recv().unwrap();
        assert_eq!(second.kind, SessionEventKind::Disconnected);
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn should_report_closed_when_consumer_dropped() {
        let (queue, events) = event_channel();
        let sink = queue.sink(1);
        drop(events);

        assert!(sink.is_closed());
        assert!(!sink.disconnected());
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_delivering_after_cancel() {
        let (queue, mut events) = event_channel();
        let sink = queue.sink(1);
        drop(queue);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_millis(100));
            loop {
                ticker.tick().await;
                if !sink.location(Position::new(0.0, 0.0)) {
                    break;
                }
            }
        });
        let subscription = Subscription::from_task(task);

        assert!(events.recv().await.is_some());
        subscription.cancel();

        // the aborted task drops the last sender, so the queue drains and closes
        while events.recv().await.is_some() {}
    }

    #[tokio::test]
    async fn should_allow_cancelling_detached_subscription() {
        Subscription::detached().cancel();
    }
}
