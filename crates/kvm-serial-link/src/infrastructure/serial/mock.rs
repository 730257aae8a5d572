//! In-memory transport for tests and `--dry-run`.
//!
//! [`MockTransport`] records every frame it is asked to write and can be told
//! to fail the next N writes or to stall each write.  [`MockConnector`] hands out a fresh
//! `MockTransport` per open and keeps a handle to each so tests can inspect
//! what reached the "wire".

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use kvm_serial_core::Frame;

use super::{SerialSettings, Transport, TransportConnector, TransportError};

#[derive(Debug, Default)]
struct MockTransportState {
    written: Mutex<Vec<Frame>>,
    fail_writes: AtomicUsize,
    write_attempts: AtomicUsize,
    write_delay_ms: AtomicU64,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

/// A recording transport.  Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockTransport {
    name: String,
    state: Arc<MockTransportState>,
}

impl MockTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(MockTransportState::default()),
        }
    }

    /// Frames successfully written so far, in order.
    pub fn written(&self) -> Vec<Frame> {
        self.state
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Makes the next `n` writes fail with an I/O error.
    pub fn fail_next_writes(&self, n: usize) {
        self.state.fail_writes.store(n, Ordering::SeqCst);
    }

    /// Makes every following write take `delay` before it completes.
    pub fn set_write_delay(&self, delay: Duration) {
        self.state
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Every `write_frame` call, successful or not.
    pub fn write_attempts(&self) -> usize {
        self.state.write_attempts.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.state.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn write_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        self.state.write_attempts.fetch_add(1, Ordering::SeqCst);
        let delay = self.state.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.is_closed() {
            return Err(TransportError::Closed(self.name.clone()));
        }
        let should_fail = self
            .state
            .fail_writes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Io {
                port: self.name.clone(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "simulated write failure"),
            });
        }
        self.state
            .written
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(*frame);
        Ok(())
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.state.close_calls.fetch_add(1, Ordering::SeqCst);
        self.state.closed.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

/// Connector that opens [`MockTransport`]s.
#[derive(Debug, Default)]
pub struct MockConnector {
    fail_opens: AtomicUsize,
    opened: Mutex<Vec<MockTransport>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `n` opens fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.fail_opens.store(n, Ordering::SeqCst);
    }

    /// Every transport opened so far, oldest first.
    pub fn transports(&self) -> Vec<MockTransport> {
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The most recently opened transport.
    pub fn last_transport(&self) -> Option<MockTransport> {
        self.transports().pop()
    }
}

#[async_trait]
impl TransportConnector for MockConnector {
    async fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Transport>, TransportError> {
        let should_fail = self
            .fail_opens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(TransportError::Unavailable {
                port: settings.port.clone(),
                reason: "simulated open failure".to_string(),
            });
        }

        let transport = MockTransport::new(settings.port.clone());
        self.opened
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(transport.clone());
        Ok(Box::new(transport))
    }
}
