//! Live notifications for connected clients.
//!
//! Every listener gets its own bounded queue. Publishing never waits: a
//! listener that is gone or cannot keep up is dropped from the registry, and
//! the remaining listeners are unaffected.

use crate::models::media::MediaRecord;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

/// Queue depth per listener before it is considered stalled.
pub const LISTENER_CAPACITY: usize = 256;

/// Payload of a `scan-status` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanStatus {
    pub is_scanning: bool,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorNotice {
    pub message: String,
}

/// Event pushed to listeners, serialized as `{"type": ..., "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum NotificationEvent {
    ScanStatus(ScanStatus),
    FileStatus(MediaRecord),
    Error(ErrorNotice),
}

impl NotificationEvent {
    /// Wire representation of the event.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","data":{{"message":"serialization failed: {}"}}}}"#,
                e
            )
        })
    }
}

struct Listener {
    id: u64,
    tx: mpsc::Sender<NotificationEvent>,
}

/// Fan-out of notification events to all registered listeners.
pub struct NotificationSink {
    listeners: Mutex<Vec<Listener>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for NotificationSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationSink")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl Default for NotificationSink {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new listener and return its receiving end.
    pub fn subscribe(&self) -> mpsc::Receiver<NotificationEvent> {
        let (tx, rx) = mpsc::channel(LISTENER_CAPACITY);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Listener { id, tx });
        tracing::debug!(listener = id, "Listener subscribed");
        rx
    }

    /// Number of live listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Deliver an event to every listener, dropping broken ones.
    pub fn publish(&self, event: NotificationEvent) {
        let mut listeners = self.listeners.lock();
        listeners.retain(|listener| match listener.tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!(listener = listener.id, "Listener disconnected, removing");
                false
            }
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(listener = listener.id, "Listener queue full, removing");
                false
            }
        });
    }

    pub fn publish_scan_status(&self, is_scanning: bool) {
        tracing::debug!("Publishing scan status: {}", is_scanning);
        self.publish(NotificationEvent::ScanStatus(ScanStatus { is_scanning }));
    }

    pub fn publish_file_status(&self, record: &MediaRecord) {
        self.publish(NotificationEvent::FileStatus(record.clone()));
    }

    pub fn publish_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("Publishing error notice: {}", message);
        self.publish(NotificationEvent::Error(ErrorNotice { message }));
    }
}
