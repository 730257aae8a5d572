//! ForwardInputUseCase: turns captured host input into device frames.
//!
//! Captured events arrive in host terms (Windows VK codes, screen pixels,
//! wheel deltas).  This use case translates each one and hands it to an
//! [`InputSink`], normally the [`SerialLink`]:
//!
//! | Captured                | Sent                                        |
//! |-------------------------|---------------------------------------------|
//! | `Key { vk_code, .. }`   | key frame with the mapped device code       |
//! | `PointerMove { x, y }`  | absolute move inside the video view         |
//! | `PointerButton`         | left/right down/up; middle is not forwarded |
//! | `Wheel { delta, .. }`   | `±sensitivity` scroll ticks                 |
//!
//! Forwarding can be paused, e.g. while a local overlay has focus; events
//! captured in the meantime are dropped.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::RecvTimeoutError;
use std::sync::Arc;
use std::time::Duration;

use kvm_serial_core::{
    FrameError, KeyAction, KeyMapper, MouseAction, Point, ScrollSettings, Viewport, WireProfile,
};
use tracing::{debug, trace, warn};

use super::link::SerialLink;
use crate::infrastructure::input_capture::{CaptureHandle, PointerButton, RawInputEvent};

/// How long [`ForwardInputUseCase::run`] blocks before re-checking its stop flag.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Destination for translated input.
///
/// [`SerialLink`] is the production implementation; tests record calls.
pub trait InputSink: Send + Sync {
    /// Queues a key transition.  `device_code` is already mapped.
    fn key(&self, action: KeyAction, device_code: u8, is_system: bool);

    /// Queues a move or button transition at an absolute device position.
    fn mouse(&self, action: MouseAction, pos: Point) -> Result<(), FrameError>;

    /// Queues `|ticks|` scroll frames; positive scrolls up.
    fn scroll(&self, pos: Point, ticks: i32) -> Result<(), FrameError>;
}

impl InputSink for SerialLink {
    fn key(&self, action: KeyAction, device_code: u8, is_system: bool) {
        self.queue_keyboard_event(action, device_code, is_system);
    }

    fn mouse(&self, action: MouseAction, pos: Point) -> Result<(), FrameError> {
        self.queue_mouse_event(action, pos)
    }

    fn scroll(&self, pos: Point, ticks: i32) -> Result<(), FrameError> {
        self.queue_scroll(pos, ticks)
    }
}

/// The screen rectangle that shows the target's video.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewArea {
    /// Screen x of the view's left edge.
    pub left: i32,
    /// Screen y of the view's top edge.
    pub top: i32,
    pub viewport: Viewport,
    /// Position the view's far corner maps to.
    pub max: Point,
}

impl ViewArea {
    /// A view mapped onto the full device range (standard profile).
    pub fn new(left: i32, top: i32, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            viewport: Viewport::new(width, height),
            max: WireProfile::STANDARD.input_max(),
        }
    }

    /// Maps the view onto the positions `profile` accepts before scaling.
    pub fn for_profile(self, profile: &WireProfile) -> Self {
        Self {
            max: profile.input_max(),
            ..self
        }
    }

    /// Maps a screen position to the link's mouse coordinates.
    pub fn to_device(&self, x: i32, y: i32) -> Point {
        self.viewport.to_range(
            f64::from(x) - f64::from(self.left),
            f64::from(y) - f64::from(self.top),
            self.max,
        )
    }
}

/// Forwards captured input to an [`InputSink`].
pub struct ForwardInputUseCase {
    sink: Arc<dyn InputSink>,
    view: ViewArea,
    scroll: ScrollSettings,
    paused: AtomicBool,
    forwarded: AtomicU64,
}

impl ForwardInputUseCase {
    pub fn new(sink: Arc<dyn InputSink>, view: ViewArea, scroll: ScrollSettings) -> Self {
        Self {
            sink,
            view,
            scroll,
            paused: AtomicBool::new(false),
            forwarded: AtomicU64::new(0),
        }
    }

    pub fn view(&self) -> ViewArea {
        self.view
    }

    /// Stops forwarding until [`resume`](Self::resume).
    pub fn pause(&self) {
        if !self.paused.swap(true, Ordering::SeqCst) {
            debug!("input forwarding paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.swap(false, Ordering::SeqCst) {
            debug!("input forwarding resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Events handed to the sink so far.
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Translates one captured event.
    ///
    /// Returns `Ok(false)` when the event was dropped (paused, or a button
    /// the device does not have).
    ///
    /// # Errors
    ///
    /// Propagates [`FrameError`] from the sink when a position cannot be encoded.
    pub fn handle(&self, event: RawInputEvent) -> Result<bool, FrameError> {
        if self.is_paused() {
            return Ok(false);
        }

        match event {
            RawInputEvent::Key {
                vk_code,
                is_down,
                is_system,
            } => {
                let code = KeyMapper::vk_to_device(vk_code);
                trace!("{} -> 0x{code:02X}", KeyMapper::key_name(vk_code));
                self.sink.key(KeyAction::from_is_down(is_down), code, is_system);
            }
            RawInputEvent::PointerMove { x, y } => {
                self.sink.mouse(MouseAction::Move, self.view.to_device(x, y))?;
            }
            RawInputEvent::PointerButton {
                button,
                is_down,
                x,
                y,
            } => {
                let action = match (button, is_down) {
                    (PointerButton::Left, true) => MouseAction::LeftDown,
                    (PointerButton::Left, false) => MouseAction::LeftUp,
                    (PointerButton::Right, true) => MouseAction::RightDown,
                    (PointerButton::Right, false) => MouseAction::RightUp,
                    (PointerButton::Middle, _) => return Ok(false),
                };
                self.sink.mouse(action, self.view.to_device(x, y))?;
            }
            RawInputEvent::Wheel { delta, x, y } => {
                let ticks = self.scroll.ticks_for(i32::from(delta));
                if ticks == 0 {
                    return Ok(false);
                }
                self.sink.scroll(self.view.to_device(x, y), ticks)?;
            }
        }

        self.forwarded.fetch_add(1, Ordering::Relaxed);
        Ok(true)
    }

    /// Forwards events from `capture` until `stop` is set or the capture ends.
    ///
    /// Blocks the calling thread; run it on a dedicated thread or via
    /// `spawn_blocking`.
    pub fn run(&self, capture: &CaptureHandle, stop: &AtomicBool) {
        debug!("forwarding input from {:?}", capture.id());
        while !stop.load(Ordering::SeqCst) {
            match capture.next_timeout(POLL_INTERVAL) {
                Ok(event) => {
                    if let Err(e) = self.handle(event) {
                        warn!("dropped {event:?}: {e}");
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("input forwarding stopped after {} event(s)", self.forwarded());
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
