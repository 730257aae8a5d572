//! Input capture infrastructure.
//!
//! On Windows, this installs low-level keyboard and mouse hooks (WH_KEYBOARD_LL,
//! WH_MOUSE_LL) on a dedicated Win32 message loop thread.  Raw events are
//! placed into a channel and consumed by the forwarding use case.
//!
//! # Ownership
//!
//! [`InputSource::start`] returns a [`CaptureHandle`].  The handle owns the
//! receiving end of the event channel and the registration in the
//! [`HookRegistry`]; dropping it (or calling [`CaptureHandle::stop`])
//! unregisters the hook and tears the platform side down.  Hook callbacks
//! never hold a sender of their own: they look up the active one in the
//! registry by their [`HookId`].
//!
//! # Testability
//!
//! [`mock::MockInputSource`] produces the same handle type without any OS
//! hooks, so tests can inject synthetic events.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

pub mod mock;
pub mod registry;

#[cfg(target_os = "windows")]
pub mod windows;

pub use registry::{HookId, HookRegistry};

/// A raw input event produced by the capture infrastructure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInputEvent {
    /// A key changed state.
    Key {
        /// Windows Virtual Key code.
        vk_code: u8,
        is_down: bool,
        /// Reported through `WM_SYSKEY*` (Alt held, or F10).
        is_system: bool,
    },
    /// The pointer moved to an absolute screen position.
    PointerMove { x: i32, y: i32 },
    /// A pointer button changed state.
    PointerButton {
        button: PointerButton,
        is_down: bool,
        x: i32,
        y: i32,
    },
    /// The vertical wheel turned; positive = away from the user.
    Wheel { delta: i16, x: i32, y: i32 },
}

/// Pointer button identifier used in [`RawInputEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

/// Error type for input capture operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CaptureError {
    #[error("failed to install input hook: {0}")]
    HookInstallFailed(String),
    #[error("hook {0:?} is already registered")]
    AlreadyRegistered(HookId),
    #[error("platform not supported: {0}")]
    UnsupportedPlatform(String),
}

/// Trait abstracting input event production.
///
/// The production implementation uses Windows hooks; tests use [`mock::MockInputSource`].
pub trait InputSource: Send {
    /// Starts capturing and returns the handle that owns the capture.
    fn start(&self) -> Result<CaptureHandle, CaptureError>;
}

type StopHook = Box<dyn FnOnce() + Send>;

/// Owned handle to an active capture.
pub struct CaptureHandle {
    id: HookId,
    registry: HookRegistry,
    events: Receiver<RawInputEvent>,
    on_stop: Option<StopHook>,
    stopped: bool,
}

impl CaptureHandle {
    /// Wraps a capture already registered under `id`.
    pub fn new(id: HookId, registry: HookRegistry, events: Receiver<RawInputEvent>) -> Self {
        Self {
            id,
            registry,
            events,
            on_stop: None,
            stopped: false,
        }
    }

    /// Adds platform teardown to run after unregistering.
    pub fn with_stop_hook(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_stop = Some(Box::new(hook));
        self
    }

    pub fn id(&self) -> HookId {
        self.id
    }

    /// Returns the next event if one is already waiting.
    pub fn try_next(&self) -> Option<RawInputEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// # Errors
    ///
    /// [`RecvTimeoutError::Timeout`] if nothing arrived in time, and
    /// [`RecvTimeoutError::Disconnected`] once the capture has ended.
    pub fn next_timeout(&self, timeout: Duration) -> Result<RawInputEvent, RecvTimeoutError> {
        self.events.recv_timeout(timeout)
    }

    /// Unregisters the hook and runs platform teardown.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.registry.unregister(self.id);
        if let Some(hook) = self.on_stop.take() {
            hook();
        }
    }
}

impl Drop for CaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for CaptureHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHandle")
            .field("id", &self.id)
            .field("stopped", &self.stopped)
            .finish()
    }
}

/// Returns the input source for this platform.
///
/// # Errors
///
/// Returns [`CaptureError::UnsupportedPlatform`] where no hook implementation exists.
pub fn platform_source() -> Result<Box<dyn InputSource>, CaptureError> {
    #[cfg(target_os = "windows")]
    {
        Ok(Box::new(windows::WindowsInputSource::new()))
    }

    #[cfg(not(target_os = "windows"))]
    {
        Err(CaptureError::UnsupportedPlatform(
            std::env::consts::OS.to_string(),
        ))
    }
}
