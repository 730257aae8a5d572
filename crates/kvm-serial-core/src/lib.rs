//! # kvm-serial-core
//!
//! Shared library for the serial KVM link containing the 6-byte frame
//! encoder, hotkey macros, and the key code / pointer translation tables.
//!
//! This crate has zero dependencies on OS APIs, serial ports, or async
//! runtimes.  Everything in it is a pure function or a plain value type, so it
//! can be unit-tested on any platform.
//!
//! # Architecture overview (for beginners)
//!
//! The serial KVM link drives a small USB device that plays the role of a
//! keyboard and mouse for a *target* computer.  The host machine shows the
//! target's video output in a window and captures the local keyboard and
//! mouse.  Every captured event is turned into a tiny 6-byte *frame* and
//! written to the device over a serial (COM) port.
//!
//! This crate (`kvm-serial-core`) is the shared foundation.  It defines:
//!
//! - **`protocol`** – The 6-byte wire frame, the encoder that builds frames
//!   from semantic events (key down, mouse move, scroll, …), and hotkey macros
//!   such as Ctrl+Alt+Del that expand to an ordered sequence of frames.
//!
//! - **`keymap`** – Translation from Windows Virtual-Key codes (what the
//!   keyboard hook reports) to the key codes understood by the device.
//!
//! - **`domain`** – Pointer geometry: mapping a position inside the video
//!   view to the device's absolute coordinate space, and scroll settings.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::pointer::{Point, ScrollSettings, Viewport, DEVICE_COORD_MAX};
pub use keymap::KeyMapper;
pub use protocol::encoder::{
    encode_key, encode_mouse, FrameError, KeyAction, MouseAction, ProfileKind,
    RightButtonEncoding, ScrollDirection, WireProfile,
};
pub use protocol::frame::{Frame, Opcode, Priority, QueuedMessage, FRAME_LEN};
pub use protocol::hotkey::{Hotkey, HotkeyError};
