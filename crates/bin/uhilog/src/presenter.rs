//! Terminal rendering of session status events.

use tokio::sync::broadcast::Receiver;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use uhilog_domain::notification::StatusEvent;

/// Print every event published on the bus until it closes.
pub fn spawn(mut events: Receiver<StatusEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => println!("{}", render(&event)),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "status output lagging behind");
                }
                Err(RecvError::Closed) => return,
            }
        }
    })
}

/// Whether the event ends a running session.
pub fn is_terminal(event: &StatusEvent) -> bool {
    matches!(
        event,
        StatusEvent::Stopped
            | StatusEvent::Disconnected
            | StatusEvent::SensorReadError { .. }
            | StatusEvent::StorageError { .. }
            | StatusEvent::LocationLost { .. }
    )
}

fn render(event: &StatusEvent) -> String {
    let notification = event.notification();
    let kind = notification.kind.as_str();
    match event {
        StatusEvent::SampleRecorded {
            count,
            temperature_celsius,
            accuracy_m,
        } => {
            let accuracy = accuracy_m.map_or_else(|| "unknown".to_owned(), |m| format!("{m:.1} m"));
            format!(
                "[{kind}] sample {count}: {temperature_celsius:.2}\u{b0}C / {:.2}\u{b0}F (accuracy {accuracy})",
                fahrenheit(*temperature_celsius)
            )
        }
        _ => format!("[{kind}] {}", notification.message),
    }
}

fn fahrenheit(celsius: f64) -> f64 {
    celsius * 9.0 / 5.0 + 32.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_render_sample_in_both_units() {
        let event = StatusEvent::SampleRecorded {
            count: 3,
            temperature_celsius: 25.0,
            accuracy_m: Some(4.5),
        };

        assert_eq!(
            render(&event),
            "[success] sample 3: 25.00\u{b0}C / 77.00\u{b0}F (accuracy 4.5 m)"
        );
    }

    #[test]
    fn should_render_unknown_accuracy() {
        let event = StatusEvent::SampleRecorded {
            count: 1,
            temperature_celsius: -40.0,
            accuracy_m: None,
        };

        assert_eq!(
            render(&event),
            "[success] sample 1: -40.00\u{b0}C / -40.00\u{b0}F (accuracy unknown)"
        );
    }

    #[test]
    fn should_render_other_events_as_notifications() {
        assert_eq!(render(&StatusEvent::Cleared), "[info] Data deleted");
    }

    #[test]
    fn should_end_run_on_failures_only() {
        assert!(is_terminal(&StatusEvent::Stopped));
        assert!(is_terminal(&StatusEvent::LocationLost {
            reason: "gone".to_owned()
        }));
        assert!(!is_terminal(&StatusEvent::PayloadRejected {
            reason: "bad".to_owned()
        }));
        assert!(!is_terminal(&StatusEvent::Cleared));
    }
}
