//! Key code translation for the serial link.
//!
//! Captured keys arrive as Windows Virtual Key codes and leave as device key
//! codes (see [`device_key`]).  Translation happens once, at the capture
//! boundary, so everything past it (queue, worker, transport) only ever sees
//! device codes.

pub mod device_key;
pub mod windows_vk;

use std::borrow::Cow;

/// Unified key mapper.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a Windows VK code to the device key code.
    ///
    /// VKs with no known mapping are passed through unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use kvm_serial_core::KeyMapper;
    ///
    /// assert_eq!(KeyMapper::vk_to_device(0x41), b'a');
    /// assert_eq!(KeyMapper::vk_to_device(0x2E), 0xD4); // Delete
    /// ```
    pub fn vk_to_device(vk: u8) -> u8 {
        windows_vk::vk_to_device(vk)
    }

    /// Human-readable name for a VK code, used in log output.
    pub fn key_name(vk: u8) -> Cow<'static, str> {
        if let Some(name) = special_key_name(vk) {
            return Cow::Borrowed(name);
        }
        match vk {
            0x30..=0x39 | 0x41..=0x5A => Cow::Owned(char::from(vk).to_string()),
            0x60..=0x69 => Cow::Owned(format!("Numpad{}", vk - 0x60)),
            0x70..=0x87 => Cow::Owned(format!("F{}", vk - 0x6F)),
            _ => Cow::Owned(format!("VK_0x{vk:02X}")),
        }
    }
}

fn special_key_name(vk: u8) -> Option<&'static str> {
    let name = match vk {
        0x08 => "Backspace",
        0x09 => "Tab",
        0x0D => "Enter",
        0x10 => "Shift",
        0x11 => "Ctrl",
        0x12 => "Alt",
        0x13 => "Pause",
        0x14 => "CapsLock",
        0x1B => "Escape",
        0x20 => "Space",
        0x21 => "PageUp",
        0x22 => "PageDown",
        0x23 => "End",
        0x24 => "Home",
        0x25 => "LeftArrow",
        0x26 => "UpArrow",
        0x27 => "RightArrow",
        0x28 => "DownArrow",
        0x2C => "PrintScreen",
        0x2D => "Insert",
        0x2E => "Delete",
        0x5B => "LeftWin",
        0x5C => "RightWin",
        0x5D => "Menu",
        0x90 => "NumLock",
        0x91 => "ScrollLock",
        0xA0 => "LeftShift",
        0xA1 => "RightShift",
        0xA2 => "LeftCtrl",
        0xA3 => "RightCtrl",
        0xA4 => "LeftAlt",
        0xA5 => "RightAlt",
        _ => return None,
    };
    Some(name)
}
