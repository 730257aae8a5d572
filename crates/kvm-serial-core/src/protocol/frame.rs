//! The fixed-size wire frame and the queue entry that carries it.
//!
//! Wire format:
//! ```text
//! [opcode:1][b1:1][b2:1][b3:1][b4:1][b5:1]
//! ```
//! Every unit on the serial link is exactly [`FRAME_LEN`] bytes.  There is no
//! delimiter, length prefix, or checksum: the link is assumed reliable and
//! byte-synchronous, so the receiver simply reads six bytes at a time.
//!
//! The opcode in byte 0 fully determines the meaning of bytes 1–5:
//!
//! | Opcode | Meaning              | Bytes 1–5                                   |
//! |--------|----------------------|---------------------------------------------|
//! | `0x11` | Pointer motion       | X lo, X hi, Y lo, Y hi, `0x11`              |
//! | `0x22` | Mouse button         | X lo, X hi, Y lo, Y hi, button/state code   |
//! | `0x33` | Keyboard             | `0x01`, down flag, key code, `0x00`, `0x00` |
//! | `0x44` | Scroll tick          | X lo, X hi, Y lo, Y hi, `0x01` up / `0xFF`  |

use std::fmt;

use serde::{Deserialize, Serialize};

/// Size of every frame on the wire, in bytes.
pub const FRAME_LEN: usize = 6;

// ── Opcodes ───────────────────────────────────────────────────────────────────

/// Opcode byte (byte 0) of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Opcode {
    /// Absolute pointer motion.  The only opcode subject to coalescing.
    MouseMove = 0x11,
    /// Left/right button press or release.
    MouseButton = 0x22,
    /// Key press or release.  The calibrated wire profile also uses this
    /// opcode for right-button frames.
    Keyboard = 0x33,
    /// One scroll tick.
    MouseScroll = 0x44,
}

impl TryFrom<u8> for Opcode {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x11 => Ok(Opcode::MouseMove),
            0x22 => Ok(Opcode::MouseButton),
            0x33 => Ok(Opcode::Keyboard),
            0x44 => Ok(Opcode::MouseScroll),
            _ => Err(()),
        }
    }
}

// ── Frame ─────────────────────────────────────────────────────────────────────

/// An immutable 6-byte protocol frame.
///
/// The length invariant is enforced by the type: the inner array is always
/// exactly [`FRAME_LEN`] bytes and there is no way to mutate it after
/// construction.
///
/// # Examples
///
/// ```rust
/// use kvm_serial_core::{encode_key, KeyAction, FRAME_LEN};
///
/// let frame = encode_key(KeyAction::Down, 0x41);
/// assert_eq!(frame.as_bytes().len(), FRAME_LEN);
/// assert_eq!(frame.as_bytes(), &[0x33, 0x01, 0x01, 0x41, 0x00, 0x00]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame([u8; FRAME_LEN]);

impl Frame {
    /// Wraps six raw bytes as a frame.
    pub const fn from_bytes(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes exactly as they go on the wire.
    pub fn as_bytes(&self) -> &[u8; FRAME_LEN] {
        &self.0
    }

    /// Returns byte 0 without interpreting it.
    pub fn opcode_byte(&self) -> u8 {
        self.0[0]
    }

    /// Returns the decoded opcode, or `None` for an unrecognised byte 0.
    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.0[0]).ok()
    }

    /// `true` if this is a pointer-motion frame.
    ///
    /// Motion frames are the only ones the worker may coalesce, and the only
    /// ones that reset the jiggle idle timer.
    pub fn is_motion(&self) -> bool {
        self.0[0] == Opcode::MouseMove as u8
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; FRAME_LEN]> for Frame {
    fn from(bytes: [u8; FRAME_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Frame {
    /// Formats as space-separated upper-case hex, e.g. `33 01 01 41 00 00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, b) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{b:02X}")?;
        }
        Ok(())
    }
}

// ── Queue entry ───────────────────────────────────────────────────────────────

/// Priority tag carried by every queued frame.
///
/// Only FIFO ordering is applied today; the tag is preserved end-to-end so
/// that it is visible in `MessageSent` notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Priority(pub i32);

impl Priority {
    /// Default priority for frames queued without an explicit tag.
    pub const NORMAL: Priority = Priority(0);
    /// Priority used for frames produced from user input.
    pub const INPUT: Priority = Priority(1);
}

/// A frame plus its priority tag, as stored in the message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedMessage {
    pub frame: Frame,
    pub priority: Priority,
}

impl QueuedMessage {
    pub fn new(frame: Frame, priority: Priority) -> Self {
        Self { frame, priority }
    }

    /// Shorthand for `self.frame.is_motion()`.
    pub fn is_motion(&self) -> bool {
        self.frame.is_motion()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
