//! Windows Virtual Key (VK) code to device key code translation table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code"
//! (e.g. `VK_RETURN = 0x0D`, `VK_SPACE = 0x20`).  The low-level keyboard hook
//! reports every keystroke as a VK code, so this table is the first step
//! between a physical key press and a frame on the serial link.
//!
//! # How this table works
//!
//! `VK_TO_DEVICE_TABLE` is a compile-time constant array of 256 bytes,
//! indexed by VK code.  It is filled in three layers:
//!
//! 1. Identity: every entry starts as its own index, so VKs without a
//!    mapping pass through unchanged.
//! 2. ASCII: printable keys (letters, digits, numpad, OEM punctuation) become
//!    their unshifted US-layout character.  Letters are lower case because
//!    the receiver applies Shift itself.
//! 3. Special keys: modifiers, navigation, and function keys get the
//!    firmware's dedicated codes from [`super::device_key`].
//!
//! Every lookup is a single array index.

use super::device_key as dk;

/// Translates a Windows VK code to the device key code.
pub fn vk_to_device(vk: u8) -> u8 {
    VK_TO_DEVICE_TABLE[vk as usize]
}

/// `true` if `vk` has an explicit (non pass-through) mapping.
pub fn is_mapped(vk: u8) -> bool {
    VK_TO_DEVICE_TABLE[vk as usize] != vk || matches!(vk, 0x20 | 0x30..=0x39)
}

const VK_TO_DEVICE_TABLE: [u8; 256] = {
    let mut t = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        t[i] = i as u8;
        i += 1;
    }

    // ── Letters (VK_A=0x41 … VK_Z=0x5A) → 'a'…'z' ───────────────────────────
    let mut vk = 0x41;
    while vk <= 0x5A {
        t[vk] = (vk as u8) + 0x20;
        vk += 1;
    }

    // ── Digit row and space are already ASCII ────────────────────────────────

    // ── Numpad (VK_NUMPAD0=0x60 … VK_NUMPAD9=0x69) ───────────────────────────
    let mut vk = 0x60;
    while vk <= 0x69 {
        t[vk] = b'0' + (vk - 0x60) as u8;
        vk += 1;
    }
    t[0x6A] = b'*'; // VK_MULTIPLY
    t[0x6B] = b'+'; // VK_ADD
    t[0x6D] = b'-'; // VK_SUBTRACT
    t[0x6E] = b'.'; // VK_DECIMAL
    t[0x6F] = b'/'; // VK_DIVIDE

    // ── OEM punctuation (US layout) ──────────────────────────────────────────
    t[0xBA] = b';';
    t[0xBB] = b'=';
    t[0xBC] = b',';
    t[0xBD] = b'-';
    t[0xBE] = b'.';
    t[0xBF] = b'/';
    t[0xC0] = b'`';
    t[0xDB] = b'[';
    t[0xDC] = b'\\';
    t[0xDD] = b']';
    t[0xDE] = b'\'';

    // ── Modifiers ────────────────────────────────────────────────────────────
    // The hook reports sided VKs; generic ones map to the left-hand key.
    t[0x10] = dk::LEFT_SHIFT; // VK_SHIFT
    t[0x11] = dk::LEFT_CTRL; // VK_CONTROL
    t[0x12] = dk::LEFT_ALT; // VK_MENU
    t[0xA0] = dk::LEFT_SHIFT;
    t[0xA1] = dk::RIGHT_SHIFT;
    t[0xA2] = dk::LEFT_CTRL;
    t[0xA3] = dk::RIGHT_CTRL;
    t[0xA4] = dk::LEFT_ALT;
    t[0xA5] = dk::RIGHT_ALT;
    t[0x5B] = dk::LEFT_GUI; // VK_LWIN
    t[0x5C] = dk::RIGHT_GUI; // VK_RWIN

    // ── Control keys ─────────────────────────────────────────────────────────
    t[0x08] = dk::BACKSPACE; // VK_BACK
    t[0x09] = dk::TAB;
    t[0x0D] = dk::RETURN;
    t[0x13] = dk::PAUSE;
    t[0x14] = dk::CAPS_LOCK; // VK_CAPITAL
    t[0x1B] = dk::ESCAPE;
    t[0x2C] = dk::PRINT_SCREEN; // VK_SNAPSHOT
    t[0x5D] = dk::MENU; // VK_APPS
    t[0x90] = dk::NUM_LOCK;
    t[0x91] = dk::SCROLL_LOCK;

    // ── Navigation ───────────────────────────────────────────────────────────
    t[0x21] = dk::PAGE_UP; // VK_PRIOR
    t[0x22] = dk::PAGE_DOWN; // VK_NEXT
    t[0x23] = dk::END;
    t[0x24] = dk::HOME;
    t[0x25] = dk::LEFT_ARROW;
    t[0x26] = dk::UP_ARROW;
    t[0x27] = dk::RIGHT_ARROW;
    t[0x28] = dk::DOWN_ARROW;
    t[0x2D] = dk::INSERT;
    t[0x2E] = dk::DELETE;

    // ── Function keys (VK_F1=0x70 … VK_F24=0x87) ─────────────────────────────
    let mut vk = 0x70;
    while vk <= 0x7B {
        t[vk] = dk::F1 + (vk - 0x70) as u8;
        vk += 1;
    }
    let mut vk = 0x7C;
    while vk <= 0x87 {
        t[vk] = dk::F13 + (vk - 0x7C) as u8;
        vk += 1;
    }

    t
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letters_map_to_lower_case_ascii() {
        assert_eq!(vk_to_device(0x41), b'a');
        assert_eq!(vk_to_device(0x5A), b'z');
    }

    #[test]
    fn test_digits_and_space_pass_through() {
        assert_eq!(vk_to_device(0x30), b'0');
        assert_eq!(vk_to_device(0x39), b'9');
        assert_eq!(vk_to_device(0x20), b' ');
        assert!(is_mapped(0x20));
    }

    #[test]
    fn test_sided_modifiers() {
        assert_eq!(vk_to_device(0xA2), 0x80);
        assert_eq!(vk_to_device(0xA0), 0x81);
        assert_eq!(vk_to_device(0xA4), 0x82);
        assert_eq!(vk_to_device(0x5B), 0x83);
        assert_eq!(vk_to_device(0xA3), 0x84);
        assert_eq!(vk_to_device(0xA1), 0x85);
        assert_eq!(vk_to_device(0xA5), 0x86);
        assert_eq!(vk_to_device(0x5C), 0x87);
    }

    #[test]
    fn test_generic_modifiers_map_to_left_hand() {
        assert_eq!(vk_to_device(0x10), dk::LEFT_SHIFT);
        assert_eq!(vk_to_device(0x11), dk::LEFT_CTRL);
        assert_eq!(vk_to_device(0x12), dk::LEFT_ALT);
    }

    #[test]
    fn test_function_key_ranges() {
        assert_eq!(vk_to_device(0x70), 0xC2); // F1
        assert_eq!(vk_to_device(0x7B), 0xCD); // F12
        assert_eq!(vk_to_device(0x7C), 0xF0); // F13
        assert_eq!(vk_to_device(0x87), 0xFB); // F24
    }

    #[test]
    fn test_navigation_keys() {
        assert_eq!(vk_to_device(0x2E), 0xD4);
        assert_eq!(vk_to_device(0x26), 0xDA);
        assert_eq!(vk_to_device(0x28), 0xD9);
        assert_eq!(vk_to_device(0x25), 0xD8);
        assert_eq!(vk_to_device(0x27), 0xD7);
    }

    #[test]
    fn test_unmapped_vk_passes_through() {
        // VK_BROWSER_BACK
        assert_eq!(vk_to_device(0xA6), 0xA6);
        assert!(!is_mapped(0xA6));
    }
}
