//! Protocol module containing the wire frame, the frame encoder, and hotkey macros.

pub mod encoder;
pub mod frame;
pub mod hotkey;

pub use encoder::{encode_key, encode_mouse, FrameError};
pub use frame::*;
pub use hotkey::{Hotkey, HotkeyError};
