//! Named key combinations ("hotkey macros").
//!
//! A hotkey is a fixed list of device key codes.  It expands to a frame
//! sequence that presses every key in order and then releases them in the
//! *same* order:
//!
//! ```text
//! CtrlAltDel:  down 0x84, down 0x86, down 0xD4, up 0x84, up 0x86, up 0xD4
//! ```
//!
//! Releasing in press order (rather than reverse order) is what the receiver
//! firmware has always been driven with, and it handles it correctly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::keymap::device_key as dk;
use crate::protocol::encoder::{encode_key, KeyAction};
use crate::protocol::frame::Frame;

/// Errors returned when parsing a hotkey name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HotkeyError {
    #[error("unknown hotkey: {0:?}")]
    Unknown(String),
}

/// A built-in key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Hotkey {
    /// Right Ctrl + Right Alt + Delete.
    CtrlAltDel,
    PrintScreen,
    AltTab,
    AltF4,
    /// Opens the task manager directly.
    CtrlShiftEsc,
    /// Locks the workstation.
    WinL,
}

impl Hotkey {
    /// All hotkeys, in display order.
    pub const ALL: [Hotkey; 6] = [
        Hotkey::CtrlAltDel,
        Hotkey::PrintScreen,
        Hotkey::AltTab,
        Hotkey::AltF4,
        Hotkey::CtrlShiftEsc,
        Hotkey::WinL,
    ];

    /// Device key codes pressed by this hotkey, in press order.
    pub fn keys(self) -> &'static [u8] {
        match self {
            Hotkey::CtrlAltDel => &[dk::RIGHT_CTRL, dk::RIGHT_ALT, dk::DELETE],
            Hotkey::PrintScreen => &[dk::PRINT_SCREEN],
            Hotkey::AltTab => &[dk::LEFT_ALT, dk::TAB],
            Hotkey::AltF4 => &[dk::LEFT_ALT, dk::F4],
            Hotkey::CtrlShiftEsc => &[dk::LEFT_CTRL, dk::LEFT_SHIFT, dk::ESCAPE],
            Hotkey::WinL => &[dk::LEFT_GUI, b'l'],
        }
    }

    /// Expands the hotkey into its full down/up frame sequence.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvm_serial_core::Hotkey;
    ///
    /// let frames = Hotkey::PrintScreen.frames();
    /// assert_eq!(frames.len(), 2);
    /// assert_eq!(frames[0].as_bytes(), &[0x33, 0x01, 0x01, 0xCE, 0x00, 0x00]);
    /// assert_eq!(frames[1].as_bytes(), &[0x33, 0x01, 0x00, 0xCE, 0x00, 0x00]);
    /// ```
    pub fn frames(self) -> Vec<Frame> {
        let keys = self.keys();
        let downs = keys.iter().map(|&k| encode_key(KeyAction::Down, k));
        let ups = keys.iter().map(|&k| encode_key(KeyAction::Up, k));
        downs.chain(ups).collect()
    }

    pub fn name(self) -> &'static str {
        match self {
            Hotkey::CtrlAltDel => "Ctrl+Alt+Del",
            Hotkey::PrintScreen => "PrintScreen",
            Hotkey::AltTab => "Alt+Tab",
            Hotkey::AltF4 => "Alt+F4",
            Hotkey::CtrlShiftEsc => "Ctrl+Shift+Esc",
            Hotkey::WinL => "Win+L",
        }
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Hotkey {
    type Err = HotkeyError;

    /// Case-insensitive; `+`, `-`, `_` and spaces are ignored, so
    /// `"ctrl-alt-del"`, `"Ctrl+Alt+Del"` and `"CTRLALTDEL"` all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '+' | '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "ctrlaltdel" | "ctrlaltdelete" => Ok(Hotkey::CtrlAltDel),
            "printscreen" | "prtsc" | "prtscn" => Ok(Hotkey::PrintScreen),
            "alttab" => Ok(Hotkey::AltTab),
            "altf4" => Ok(Hotkey::AltF4),
            "ctrlshiftesc" | "ctrlshiftescape" => Ok(Hotkey::CtrlShiftEsc),
            "winl" | "guil" => Ok(Hotkey::WinL),
            _ => Err(HotkeyError::Unknown(s.to_string())),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn bytes(frames: &[Frame]) -> Vec<[u8; 6]> {
        frames.iter().map(|f| *f.as_bytes()).collect()
    }

    #[test]
    fn test_ctrl_alt_del_expands_to_six_frames_in_press_order() {
        // Act
        let frames = Hotkey::CtrlAltDel.frames();

        // Assert – downs in order, then ups in the same order
        assert_eq!(
            bytes(&frames),
            vec![
                [0x33, 0x01, 0x01, 0x84, 0x00, 0x00],
                [0x33, 0x01, 0x01, 0x86, 0x00, 0x00],
                [0x33, 0x01, 0x01, 0xD4, 0x00, 0x00],
                [0x33, 0x01, 0x00, 0x84, 0x00, 0x00],
                [0x33, 0x01, 0x00, 0x86, 0x00, 0x00],
                [0x33, 0x01, 0x00, 0xD4, 0x00, 0x00],
            ]
        );
    }

    #[test]
    fn test_print_screen_is_single_key() {
        assert_eq!(Hotkey::PrintScreen.keys(), &[0xCE]);
        assert_eq!(Hotkey::PrintScreen.frames().len(), 2);
    }

    #[test]
    fn test_every_hotkey_has_twice_as_many_frames_as_keys() {
        for hk in Hotkey::ALL {
            assert_eq!(hk.frames().len(), hk.keys().len() * 2, "{hk}");
        }
    }

    #[test]
    fn test_from_str_accepts_common_spellings() {
        assert_eq!("ctrl-alt-del".parse(), Ok(Hotkey::CtrlAltDel));
        assert_eq!("Ctrl+Alt+Del".parse(), Ok(Hotkey::CtrlAltDel));
        assert_eq!("PRINT_SCREEN".parse(), Ok(Hotkey::PrintScreen));
        assert_eq!("alt tab".parse(), Ok(Hotkey::AltTab));
        assert_eq!("win+l".parse(), Ok(Hotkey::WinL));
    }

    #[test]
    fn test_from_str_unknown_name_is_error() {
        let result: Result<Hotkey, _> = "ctrl+z".parse();
        assert_eq!(result, Err(HotkeyError::Unknown("ctrl+z".to_string())));
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for hk in Hotkey::ALL {
            assert_eq!(hk.to_string().parse::<Hotkey>(), Ok(hk));
        }
    }
}
