//! Serial transport adapter.
//!
//! The worker only ever sees a [`Transport`]: a write-one-frame capability
//! with a bounded timeout.  Opening a transport goes through a
//! [`TransportConnector`] so the lifecycle manager can be tested without
//! hardware.
//!
//! # Line settings (for beginners)
//!
//! The receiving device expects `115200 8N1`: 115 200 baud, 8 data bits,
//! no parity bit, 1 stop bit.  There is no hardware or software flow
//! control, but RTS and DTR are both asserted after opening because some
//! USB-serial bridges do not start transmitting until they are.

use std::time::Duration;

use async_trait::async_trait;
use kvm_serial_core::Frame;
use serde::Serialize;
use thiserror::Error;

pub mod mock;
pub mod port;

pub use port::{list_ports, SerialPortConnector};

/// Default line speed.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Default read/write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(1000);

/// Error type for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("port {port} unavailable: {reason}")]
    Unavailable { port: String, reason: String },

    #[error("write to {port} timed out after {timeout:?}")]
    Timeout { port: String, timeout: Duration },

    #[error("I/O error on {port}: {source}")]
    Io {
        port: String,
        #[source]
        source: std::io::Error,
    },

    #[error("port {0} is closed")]
    Closed(String),

    #[error("failed to enumerate serial ports: {0}")]
    Enumerate(#[source] serialport::Error),

    #[error("blocking serial task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl TransportError {
    /// `true` for errors the worker should back off from and keep going.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Timeout { .. } | TransportError::Io { .. })
    }
}

/// Parameters for opening a serial transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialSettings {
    pub port: String,
    pub baud_rate: u32,
    /// Applied to both reads and writes.
    pub timeout: Duration,
}

impl SerialSettings {
    pub fn new(port: impl Into<String>) -> Self {
        Self {
            port: port.into(),
            baud_rate: DEFAULT_BAUD_RATE,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}

/// An open, writable link to the device.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Writes one frame, failing if it cannot be handed to the OS within the timeout.
    async fn write_frame(&self, frame: &Frame) -> Result<(), TransportError>;

    /// Closes the port.  Writes after this return [`TransportError::Closed`].
    async fn close(&self) -> Result<(), TransportError>;

    fn port_name(&self) -> &str;
}

/// Opens transports.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TransportConnector: Send + Sync {
    async fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Transport>, TransportError>;
}

/// One entry from [`list_ports`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortInfo {
    pub name: String,
    /// Product string or bus type, empty when unknown.
    pub description: String,
}
