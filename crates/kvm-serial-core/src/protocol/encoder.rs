//! Frame encoder: semantic input events to 6-byte frames.
//!
//! Keyboard frames:
//! ```text
//! [0x33][0x01][down:1][key_code:1][0x00][0x00]
//! ```
//! Mouse frames:
//! ```text
//! [opcode:1][x:2 LE][y:2 LE][sub:1]
//! ```
//! Coordinates are little-endian `u16`.  The encoder is pure: it never
//! touches the queue or the serial port, and the only failure mode is a
//! coordinate that does not fit the wire field.
//!
//! # Wire profiles
//!
//! Two receiver firmwares exist in the field.  They agree on everything
//! except the right mouse button and coordinate scaling:
//!
//! | Profile      | Coordinates                 | Right down       | Right up         |
//! |--------------|-----------------------------|------------------|------------------|
//! | `Standard`   | raw                         | `0x22 … 0x02`    | `0x22 … 0x03`    |
//! | `Calibrated` | `x × 17.27`, `y × 33.25`    | `0x33 … 0x00`    | `0x33 … 0x01`    |
//!
//! The profile is chosen explicitly through [`WireProfile`]; `Standard` is
//! the default.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::pointer::{Point, DEVICE_COORD_MAX};
use crate::protocol::frame::{Frame, Opcode, FRAME_LEN};

/// Errors that can occur while encoding a frame.
#[derive(Debug, Error, PartialEq)]
pub enum FrameError {
    /// A (possibly scaled) coordinate does not fit in the unsigned 16-bit wire field.
    #[error("{axis} coordinate {value} is outside 0..=65535")]
    CoordinateOutOfRange { axis: &'static str, value: i64 },
}

// ── Event types ───────────────────────────────────────────────────────────────

/// Key transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyAction {
    Down,
    Up,
}

impl KeyAction {
    pub fn from_is_down(is_down: bool) -> Self {
        if is_down {
            KeyAction::Down
        } else {
            KeyAction::Up
        }
    }
}

/// Scroll direction of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Positive deltas scroll up; zero and negative deltas scroll down.
    pub fn from_delta(delta: i32) -> Self {
        if delta > 0 {
            ScrollDirection::Up
        } else {
            ScrollDirection::Down
        }
    }

    fn wire_byte(self) -> u8 {
        match self {
            ScrollDirection::Up => 0x01,
            ScrollDirection::Down => 0xFF,
        }
    }
}

/// Mouse event sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseAction {
    Move,
    LeftDown,
    LeftUp,
    RightDown,
    RightUp,
    Scroll(ScrollDirection),
}

// ── Wire profiles ─────────────────────────────────────────────────────────────

/// How right-button frames are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RightButtonEncoding {
    /// Shares opcode `0x22` with the left button; sub-codes `0x02`/`0x03`.
    Shared,
    /// Uses opcode `0x33` with sub-codes `0x00`/`0x01`.
    Dedicated,
}

/// Named wire profiles, as selected in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    #[default]
    Standard,
    Calibrated,
}

impl ProfileKind {
    pub fn profile(self) -> WireProfile {
        match self {
            ProfileKind::Standard => WireProfile::STANDARD,
            ProfileKind::Calibrated => WireProfile::CALIBRATED,
        }
    }
}

/// Device-specific mouse frame layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WireProfile {
    /// Multiplier applied to X before encoding.
    pub scale_x: f64,
    /// Multiplier applied to Y before encoding.
    pub scale_y: f64,
    pub right_button: RightButtonEncoding,
}

impl WireProfile {
    /// Raw coordinates, right button on opcode `0x22`.
    pub const STANDARD: WireProfile = WireProfile {
        scale_x: 1.0,
        scale_y: 1.0,
        right_button: RightButtonEncoding::Shared,
    };

    /// Scaled coordinates, right button on opcode `0x33`.
    pub const CALIBRATED: WireProfile = WireProfile {
        scale_x: 17.27,
        scale_y: 33.25,
        right_button: RightButtonEncoding::Dedicated,
    };

    /// Largest caller-side position whose scaled value stays within
    /// `0..=DEVICE_COORD_MAX`.
    ///
    /// ```rust
    /// use kvm_serial_core::{Point, WireProfile};
    ///
    /// assert_eq!(WireProfile::STANDARD.input_max(), Point::new(0x7FFF, 0x7FFF));
    /// assert_eq!(WireProfile::CALIBRATED.input_max(), Point::new(1897, 985));
    /// ```
    pub fn input_max(&self) -> Point {
        let max = f64::from(DEVICE_COORD_MAX);
        Point::new(
            (max / self.scale_x).floor() as i32,
            (max / self.scale_y).floor() as i32,
        )
    }

    fn scale(&self, pos: Point) -> Result<(u16, u16), FrameError> {
        let x = (f64::from(pos.x) * self.scale_x).trunc() as i64;
        let y = (f64::from(pos.y) * self.scale_y).trunc() as i64;
        let x = u16::try_from(x).map_err(|_| FrameError::CoordinateOutOfRange { axis: "x", value: x })?;
        let y = u16::try_from(y).map_err(|_| FrameError::CoordinateOutOfRange { axis: "y", value: y })?;
        Ok((x, y))
    }
}

impl Default for WireProfile {
    fn default() -> Self {
        Self::STANDARD
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Encodes a key transition.
///
/// `key_code` is the device key code, already mapped by the caller (see
/// [`crate::keymap::KeyMapper`]).
///
/// # Examples
///
/// ```rust
/// use kvm_serial_core::{encode_key, KeyAction};
///
/// let up = encode_key(KeyAction::Up, 0x41);
/// assert_eq!(up.as_bytes(), &[0x33, 0x01, 0x00, 0x41, 0x00, 0x00]);
/// ```
pub fn encode_key(action: KeyAction, key_code: u8) -> Frame {
    let down = match action {
        KeyAction::Down => 0x01,
        KeyAction::Up => 0x00,
    };
    Frame::from_bytes([Opcode::Keyboard as u8, 0x01, down, key_code, 0x00, 0x00])
}

/// Encodes a mouse event at `pos` using `profile`.
///
/// # Errors
///
/// Returns [`FrameError::CoordinateOutOfRange`] if a coordinate, after
/// scaling, is negative or larger than `u16::MAX`.
///
/// # Examples
///
/// ```rust
/// use kvm_serial_core::{encode_mouse, MouseAction, Point, WireProfile};
///
/// let frame = encode_mouse(MouseAction::Move, Point::new(100, 200), &WireProfile::STANDARD).unwrap();
/// assert_eq!(frame.as_bytes(), &[0x11, 0x64, 0x00, 0xC8, 0x00, 0x11]);
/// ```
pub fn encode_mouse(
    action: MouseAction,
    pos: Point,
    profile: &WireProfile,
) -> Result<Frame, FrameError> {
    let (x, y) = profile.scale(pos)?;
    let (opcode, sub) = opcode_and_sub(action, profile.right_button);

    let mut buf = [0u8; FRAME_LEN];
    buf[0] = opcode;
    buf[1..3].copy_from_slice(&x.to_le_bytes());
    buf[3..5].copy_from_slice(&y.to_le_bytes());
    buf[5] = sub;
    Ok(Frame::from_bytes(buf))
}

fn opcode_and_sub(action: MouseAction, right: RightButtonEncoding) -> (u8, u8) {
    const BUTTON: u8 = Opcode::MouseButton as u8;
    match (action, right) {
        (MouseAction::Move, _) => (Opcode::MouseMove as u8, 0x11),
        (MouseAction::LeftDown, _) => (BUTTON, 0x00),
        (MouseAction::LeftUp, _) => (BUTTON, 0x01),
        (MouseAction::RightDown, RightButtonEncoding::Shared) => (BUTTON, 0x02),
        (MouseAction::RightUp, RightButtonEncoding::Shared) => (BUTTON, 0x03),
        (MouseAction::RightDown, RightButtonEncoding::Dedicated) => (Opcode::Keyboard as u8, 0x00),
        (MouseAction::RightUp, RightButtonEncoding::Dedicated) => (Opcode::Keyboard as u8, 0x01),
        (MouseAction::Scroll(dir), _) => (Opcode::MouseScroll as u8, dir.wire_byte()),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn std_mouse(action: MouseAction, x: i32, y: i32) -> [u8; FRAME_LEN] {
        *encode_mouse(action, Point::new(x, y), &WireProfile::STANDARD)
            .expect("in range")
            .as_bytes()
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    #[test]
    fn test_key_down_frame_layout() {
        let frame = encode_key(KeyAction::Down, 0x41);
        assert_eq!(frame.as_bytes(), &[0x33, 0x01, 0x01, 0x41, 0x00, 0x00]);
    }

    #[test]
    fn test_key_up_frame_layout() {
        let frame = encode_key(KeyAction::Up, 0xD4);
        assert_eq!(frame.as_bytes(), &[0x33, 0x01, 0x00, 0xD4, 0x00, 0x00]);
    }

    #[test]
    fn test_key_action_from_is_down() {
        assert_eq!(KeyAction::from_is_down(true), KeyAction::Down);
        assert_eq!(KeyAction::from_is_down(false), KeyAction::Up);
    }

    // ── Mouse, standard profile ───────────────────────────────────────────────

    #[test]
    fn test_move_frame_layout() {
        assert_eq!(
            std_mouse(MouseAction::Move, 100, 200),
            [0x11, 0x64, 0x00, 0xC8, 0x00, 0x11]
        );
    }

    #[test]
    fn test_coordinates_are_little_endian() {
        // Arrange – 0x1234 / 0x7FFF make byte order visible.
        let bytes = std_mouse(MouseAction::Move, 0x1234, 0x7FFF);

        // Assert
        assert_eq!(&bytes[1..3], &[0x34, 0x12]);
        assert_eq!(&bytes[3..5], &[0xFF, 0x7F]);
    }

    #[test]
    fn test_left_button_sub_codes() {
        assert_eq!(std_mouse(MouseAction::LeftDown, 0, 0), [0x22, 0, 0, 0, 0, 0x00]);
        assert_eq!(std_mouse(MouseAction::LeftUp, 0, 0), [0x22, 0, 0, 0, 0, 0x01]);
    }

    #[test]
    fn test_right_button_standard_profile_uses_shared_opcode() {
        assert_eq!(std_mouse(MouseAction::RightDown, 0, 0), [0x22, 0, 0, 0, 0, 0x02]);
        assert_eq!(std_mouse(MouseAction::RightUp, 0, 0), [0x22, 0, 0, 0, 0, 0x03]);
    }

    #[test]
    fn test_scroll_direction_bytes() {
        assert_eq!(
            std_mouse(MouseAction::Scroll(ScrollDirection::Up), 0, 0)[5],
            0x01
        );
        assert_eq!(
            std_mouse(MouseAction::Scroll(ScrollDirection::Down), 0, 0)[5],
            0xFF
        );
        assert_eq!(std_mouse(MouseAction::Scroll(ScrollDirection::Up), 0, 0)[0], 0x44);
    }

    #[test]
    fn test_scroll_direction_from_delta() {
        assert_eq!(ScrollDirection::from_delta(3), ScrollDirection::Up);
        assert_eq!(ScrollDirection::from_delta(-1), ScrollDirection::Down);
        assert_eq!(ScrollDirection::from_delta(0), ScrollDirection::Down);
    }

    #[test]
    fn test_negative_coordinate_is_rejected() {
        let result = encode_mouse(MouseAction::Move, Point::new(-1, 10), &WireProfile::STANDARD);
        assert_eq!(
            result,
            Err(FrameError::CoordinateOutOfRange { axis: "x", value: -1 })
        );
    }

    #[test]
    fn test_coordinate_above_u16_is_rejected() {
        let result = encode_mouse(MouseAction::Move, Point::new(0, 70_000), &WireProfile::STANDARD);
        assert!(matches!(
            result,
            Err(FrameError::CoordinateOutOfRange { axis: "y", .. })
        ));
    }

    // ── Mouse, calibrated profile ─────────────────────────────────────────────

    #[test]
    fn test_calibrated_profile_scales_coordinates() {
        // Arrange
        let profile = WireProfile::CALIBRATED;

        // Act – 100 × 17.27 = 1727, 100 × 33.25 = 3325
        let frame = encode_mouse(MouseAction::Move, Point::new(100, 100), &profile).unwrap();

        // Assert
        let b = frame.as_bytes();
        assert_eq!(u16::from_le_bytes([b[1], b[2]]), 1727);
        assert_eq!(u16::from_le_bytes([b[3], b[4]]), 3325);
    }

    #[test]
    fn test_calibrated_profile_right_button_uses_dedicated_opcode() {
        let profile = WireProfile::CALIBRATED;
        let down = encode_mouse(MouseAction::RightDown, Point::new(0, 0), &profile).unwrap();
        let up = encode_mouse(MouseAction::RightUp, Point::new(0, 0), &profile).unwrap();
        assert_eq!(down.as_bytes(), &[0x33, 0, 0, 0, 0, 0x00]);
        assert_eq!(up.as_bytes(), &[0x33, 0, 0, 0, 0, 0x01]);
    }

    #[test]
    fn test_calibrated_profile_rejects_overflow_after_scaling() {
        // 4000 × 33.25 = 133_000 does not fit in u16
        let result = encode_mouse(MouseAction::Move, Point::new(10, 4000), &WireProfile::CALIBRATED);
        assert_eq!(
            result,
            Err(FrameError::CoordinateOutOfRange { axis: "y", value: 133_000 })
        );
    }

    #[test]
    fn test_input_max_encodes_inside_device_range() {
        // Arrange
        let profile = WireProfile::CALIBRATED;

        // Act
        let frame = encode_mouse(MouseAction::Move, profile.input_max(), &profile).unwrap();

        // Assert
        let b = frame.as_bytes();
        let x = u16::from_le_bytes([b[1], b[2]]);
        let y = u16::from_le_bytes([b[3], b[4]]);
        assert!(x <= DEVICE_COORD_MAX && y <= DEVICE_COORD_MAX, "{x} {y}");
        assert!(x > DEVICE_COORD_MAX - 32 && y > DEVICE_COORD_MAX - 32, "{x} {y}");
    }

    #[test]
    fn test_profile_kind_resolves_to_profile() {
        assert_eq!(ProfileKind::Standard.profile(), WireProfile::STANDARD);
        assert_eq!(ProfileKind::Calibrated.profile(), WireProfile::CALIBRATED);
        assert_eq!(ProfileKind::default(), ProfileKind::Standard);
    }

    #[test]
    fn test_every_action_produces_six_bytes() {
        let actions = [
            MouseAction::Move,
            MouseAction::LeftDown,
            MouseAction::LeftUp,
            MouseAction::RightDown,
            MouseAction::RightUp,
            MouseAction::Scroll(ScrollDirection::Up),
            MouseAction::Scroll(ScrollDirection::Down),
        ];
        for profile in [WireProfile::STANDARD, WireProfile::CALIBRATED] {
            for action in actions {
                let frame = encode_mouse(action, Point::new(5, 5), &profile).unwrap();
                assert_eq!(frame.as_bytes().len(), FRAME_LEN);
            }
        }
    }
}
