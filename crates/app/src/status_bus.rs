//! In-process status bus backed by a tokio broadcast channel.

use tokio::sync::broadcast;

use uhilog_domain::notification::StatusEvent;

use crate::ports::NotificationSink;

/// Fan-out of session status events to any number of presenters.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct StatusBus {
    sender: broadcast::Sender<StatusEvent>,
}

impl StatusBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to status events published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }
}

impl NotificationSink for StatusBus {
    fn notify(&self, event: StatusEvent) {
        tracing::debug!(?event, "status");
        // fails only when nobody listens
        let _ = self.sender.send(event);
    }
}
