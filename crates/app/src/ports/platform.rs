//! Small platform ports: permissions, notifications and the wall clock.

use std::future::Future;
use std::sync::Arc;

use uhilog_domain::notification::StatusEvent;

/// Runtime permission checks. Not stateful.
pub trait PermissionGate: Send + Sync {
    /// Whether location access is granted.
    fn location(&self) -> impl Future<Output = bool> + Send;

    /// Whether Bluetooth access is granted.
    fn bluetooth(&self) -> impl Future<Output = bool> + Send;
}

/// Presents status events to the operator.
///
/// The session emits and never waits for a response.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, event: StatusEvent);
}

impl<T: NotificationSink> NotificationSink for Arc<T> {
    fn notify(&self, event: StatusEvent) {
        (**self).notify(event);
    }
}

/// Source of wall-clock time for sample timestamps.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// [`Clock`] reading the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        uhilog_domain::time::now_millis()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_read_system_time() {
        let before = uhilog_domain::time::now_millis();
        let now = SystemClock.now_millis();
        assert!(now >= before);
    }
}
