//! Mock input source for unit testing.
//!
//! Allows tests to inject synthetic [`RawInputEvent`]s without a running
//! Windows message loop.  Injection goes through the [`HookRegistry`] exactly
//! like a real hook callback would.

use std::sync::{mpsc, Mutex, PoisonError};

use super::{CaptureError, CaptureHandle, HookId, HookRegistry, InputSource, RawInputEvent};

/// A mock implementation of [`InputSource`] that allows tests to inject events.
pub struct MockInputSource {
    registry: HookRegistry,
    active: Mutex<Option<HookId>>,
}

impl MockInputSource {
    /// Creates a source with its own private registry.
    pub fn new() -> Self {
        Self::with_registry(HookRegistry::new())
    }

    pub fn with_registry(registry: HookRegistry) -> Self {
        Self {
            registry,
            active: Mutex::new(None),
        }
    }

    /// Injects a synthetic event, as if captured from hardware.
    ///
    /// Returns `false` if no capture is active.
    pub fn inject_event(&self, event: RawInputEvent) -> bool {
        let active = *self.active.lock().unwrap_or_else(PoisonError::into_inner);
        match active {
            Some(id) => self.registry.dispatch(id, event),
            None => false,
        }
    }

    pub fn registry(&self) -> &HookRegistry {
        &self.registry
    }
}

impl Default for MockInputSource {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for MockInputSource {
    fn start(&self) -> Result<CaptureHandle, CaptureError> {
        let (tx, rx) = mpsc::channel();
        let id = HookId::unique();
        self.registry.register(id, tx)?;
        *self.active.lock().unwrap_or_else(PoisonError::into_inner) = Some(id);
        Ok(CaptureHandle::new(id, self.registry.clone(), rx))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc::RecvTimeoutError;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::infrastructure::input_capture::PointerButton;

    #[test]
    fn test_mock_input_source_starts_and_receives_events() {
        // Arrange
        let source = MockInputSource::new();
        let handle = source.start().expect("start should succeed");

        // Act
        source.inject_event(RawInputEvent::Key {
            vk_code: 0x41,
            is_down: true,
            is_system: false,
        });

        // Assert
        let event = handle.try_next().expect("should receive event");
        assert!(matches!(event, RawInputEvent::Key { vk_code: 0x41, .. }));
    }

    #[test]
    fn test_stop_unregisters_hook() {
        // Arrange
        let source = MockInputSource::new();
        let handle = source.start().expect("start should succeed");
        let id = handle.id();

        // Act
        handle.stop();

        // Assert
        assert!(!source.registry().is_registered(id));
        assert!(!source.inject_event(RawInputEvent::PointerMove { x: 1, y: 1 }));
    }

    #[test]
    fn test_dropping_handle_unregisters_and_runs_stop_hook() {
        // Arrange
        let source = MockInputSource::new();
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stopped);
        let handle = source
            .start()
            .unwrap()
            .with_stop_hook(move || flag.store(true, Ordering::SeqCst));

        // Act
        drop(handle);

        // Assert
        assert!(stopped.load(Ordering::SeqCst));
        assert!(source.registry().is_empty());
    }

    #[test]
    fn test_inject_before_start_is_rejected() {
        let source = MockInputSource::new();
        assert!(!source.inject_event(RawInputEvent::PointerMove { x: 0, y: 0 }));
    }

    #[test]
    fn test_next_timeout_reports_timeout_then_events() {
        // Arrange
        let source = MockInputSource::new();
        let handle = source.start().unwrap();

        // Act / Assert
        assert_eq!(
            handle.next_timeout(Duration::from_millis(5)),
            Err(RecvTimeoutError::Timeout)
        );
        source.inject_event(RawInputEvent::PointerButton {
            button: PointerButton::Left,
            is_down: true,
            x: 10,
            y: 20,
        });
        source.inject_event(RawInputEvent::Wheel { delta: 120, x: 10, y: 20 });
        assert!(matches!(
            handle.next_timeout(Duration::from_millis(5)),
            Ok(RawInputEvent::PointerButton { button: PointerButton::Left, .. })
        ));
        assert!(matches!(
            handle.next_timeout(Duration::from_millis(5)),
            Ok(RawInputEvent::Wheel { delta: 120, .. })
        ));
    }
}
