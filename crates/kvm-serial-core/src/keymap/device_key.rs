//! Device key codes understood by the receiver firmware.
//!
//! Printable keys are sent as their unshifted US-layout ASCII byte
//! (`b'a'`, `b'1'`, `b';'`).  Everything else uses the codes below, which
//! sit in the `0x80..=0xFF` range so they never collide with ASCII.

// ── Modifiers ─────────────────────────────────────────────────────────────────

pub const LEFT_CTRL: u8 = 0x80;
pub const LEFT_SHIFT: u8 = 0x81;
pub const LEFT_ALT: u8 = 0x82;
pub const LEFT_GUI: u8 = 0x83;
pub const RIGHT_CTRL: u8 = 0x84;
pub const RIGHT_SHIFT: u8 = 0x85;
pub const RIGHT_ALT: u8 = 0x86;
pub const RIGHT_GUI: u8 = 0x87;

// ── Editing and control ───────────────────────────────────────────────────────

pub const RETURN: u8 = 0xB0;
pub const ESCAPE: u8 = 0xB1;
pub const BACKSPACE: u8 = 0xB2;
pub const TAB: u8 = 0xB3;
pub const CAPS_LOCK: u8 = 0xC1;
pub const PRINT_SCREEN: u8 = 0xCE;
pub const SCROLL_LOCK: u8 = 0xCF;
pub const PAUSE: u8 = 0xD0;
pub const INSERT: u8 = 0xD1;
pub const HOME: u8 = 0xD2;
pub const PAGE_UP: u8 = 0xD3;
pub const DELETE: u8 = 0xD4;
pub const END: u8 = 0xD5;
pub const PAGE_DOWN: u8 = 0xD6;
pub const NUM_LOCK: u8 = 0xDB;
pub const MENU: u8 = 0xED;

// ── Arrows ────────────────────────────────────────────────────────────────────

pub const RIGHT_ARROW: u8 = 0xD7;
pub const LEFT_ARROW: u8 = 0xD8;
pub const DOWN_ARROW: u8 = 0xD9;
pub const UP_ARROW: u8 = 0xDA;

// ── Function keys ─────────────────────────────────────────────────────────────

/// F1; F2–F12 follow contiguously up to `0xCD`.
pub const F1: u8 = 0xC2;
pub const F4: u8 = 0xC5;
pub const F12: u8 = 0xCD;
/// F13; F14–F24 follow contiguously up to `0xFB`.
pub const F13: u8 = 0xF0;
pub const F24: u8 = 0xFB;
