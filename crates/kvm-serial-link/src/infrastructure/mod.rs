//! Infrastructure layer for the serial link.
//!
//! Contains OS-facing adapters: the serial port transport, input capture
//! hooks, and file-system storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `kvm_serial_core`, but MUST NOT be imported by the domain layer.  The
//! application layer only reaches in for the trait seams (`Transport`,
//! `TransportConnector`, `CaptureHandle`).

pub mod input_capture;
pub mod serial;
pub mod storage;
