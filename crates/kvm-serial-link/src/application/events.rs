//! Link notifications.
//!
//! Published on a `tokio::sync::broadcast` channel.  Publishing never blocks:
//! with no subscribers the event is dropped, and a subscriber that falls
//! behind sees `RecvError::Lagged` instead of slowing the worker down.

use kvm_serial_core::QueuedMessage;
use tokio::sync::broadcast;

/// Default buffer size per subscriber.
const EVENT_CAPACITY: usize = 1024;

/// A notification emitted by the link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// Human-readable status line, e.g. `"Connected to COM3"`.
    StatusChanged(String),
    /// `true` after a successful connect, `false` after disconnect or a failed connect.
    ConnectionChanged(bool),
    /// A frame was written to the transport.
    MessageSent(QueuedMessage),
    /// A transport write failed; the frame was dropped.
    SendError(String),
}

/// Fire-and-forget publisher for [`LinkEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LinkEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LinkEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: LinkEvent) {
        // Err only means there are no subscribers right now.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
