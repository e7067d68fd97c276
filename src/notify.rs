//! Toast sink for tour notifications.

use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::info;

/// Default broadcast channel capacity.
const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// A toast shown by the UI shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub message: String,
    pub duration_ms: u64,
}

/// Whole milliseconds, saturating for durations past `u64::MAX` ms.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Receives user-facing notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, duration: Duration);
}

/// Fans toasts out to every subscriber (e.g. a connected UI shell).
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Toast>,
}

impl BroadcastNotifier {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(DEFAULT_BROADCAST_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.tx.subscribe()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for BroadcastNotifier {
    fn notify(&self, message: &str, duration: Duration) {
        let toast = Toast {
            message: message.to_string(),
            duration_ms: duration_ms(duration),
        };
        info!(message = %toast.message, duration_ms = toast.duration_ms, "Toast");
        // Ok if nobody is listening
        let _ = self.tx.send(toast);
    }
}

/// Logs toasts instead of showing them.
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str, duration: Duration) {
        info!(message = %message, duration_ms = duration_ms(duration), "Toast");
    }
}
