//! `serialport`-backed transport.
//!
//! `serialport` is a blocking API, so every open/write/close runs on Tokio's
//! blocking pool.  Writes are additionally bounded by `tokio::time::timeout`,
//! which covers drivers that ignore the port's own write timeout.

use std::io::{ErrorKind, Write};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use kvm_serial_core::Frame;
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::{PortInfo, SerialSettings, Transport, TransportConnector, TransportError};

type SharedPort = Arc<Mutex<Option<Box<dyn SerialPort>>>>;

/// Opens real serial ports.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialPortConnector;

impl SerialPortConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TransportConnector for SerialPortConnector {
    async fn open(&self, settings: &SerialSettings) -> Result<Box<dyn Transport>, TransportError> {
        let s = settings.clone();
        let port = spawn_blocking(move || open_blocking(&s)).await??;

        info!(
            "opened {} at {} baud (8N1, RTS/DTR on)",
            settings.port, settings.baud_rate
        );
        Ok(Box::new(SerialPortTransport {
            name: settings.port.clone(),
            timeout: settings.timeout,
            port: Arc::new(Mutex::new(Some(port))),
        }))
    }
}

fn open_blocking(settings: &SerialSettings) -> Result<Box<dyn SerialPort>, TransportError> {
    let mut port = serialport::new(&settings.port, settings.baud_rate)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::One)
        .flow_control(FlowControl::None)
        .timeout(settings.timeout)
        .open()
        .map_err(|source| TransportError::Open {
            port: settings.port.clone(),
            source,
        })?;

    // Not every bridge exposes the modem lines; the port is usable without them.
    if let Err(e) = port.write_request_to_send(true) {
        warn!("{}: could not assert RTS: {e}", settings.port);
    }
    if let Err(e) = port.write_data_terminal_ready(true) {
        warn!("{}: could not assert DTR: {e}", settings.port);
    }
    Ok(port)
}

/// An open serial port.
pub struct SerialPortTransport {
    name: String,
    timeout: std::time::Duration,
    port: SharedPort,
}

#[async_trait]
impl Transport for SerialPortTransport {
    async fn write_frame(&self, frame: &Frame) -> Result<(), TransportError> {
        let port = Arc::clone(&self.port);
        let name = self.name.clone();
        let timeout = self.timeout;
        let bytes = *frame.as_bytes();

        let task = spawn_blocking(move || {
            let mut guard = port.lock().unwrap_or_else(PoisonError::into_inner);
            let Some(p) = guard.as_mut() else {
                return Err(TransportError::Closed(name));
            };
            p.write_all(&bytes)
                .and_then(|()| p.flush())
                .map_err(|source| match source.kind() {
                    ErrorKind::TimedOut => TransportError::Timeout {
                        port: name.clone(),
                        timeout,
                    },
                    _ => TransportError::Io {
                        port: name.clone(),
                        source,
                    },
                })
        });

        match tokio::time::timeout(timeout, task).await {
            Ok(joined) => joined?,
            Err(_) => Err(TransportError::Timeout {
                port: self.name.clone(),
                timeout,
            }),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let port = Arc::clone(&self.port);
        // Dropping the handle closes the OS port.
        let had_port = spawn_blocking(move || {
            port.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take()
                .is_some()
        })
        .await?;
        if had_port {
            debug!("closed {}", self.name);
        }
        Ok(())
    }

    fn port_name(&self) -> &str {
        &self.name
    }
}

/// Enumerates the serial ports present on this machine.
///
/// # Errors
///
/// Returns [`TransportError::Enumerate`] if the OS query fails.
pub fn list_ports() -> Result<Vec<PortInfo>, TransportError> {
    let ports = serialport::available_ports().map_err(TransportError::Enumerate)?;
    Ok(ports
        .into_iter()
        .map(|p| PortInfo {
            description: describe(&p.port_type),
            name: p.port_name,
        })
        .collect())
}

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => match &usb.product {
            Some(product) => product.clone(),
            None => format!("USB {:04x}:{:04x}", usb.vid, usb.pid),
        },
        SerialPortType::PciPort => "PCI".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth".to_string(),
        SerialPortType::Unknown => String::new(),
    }
}
