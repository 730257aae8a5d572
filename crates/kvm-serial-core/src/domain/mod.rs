//! Domain entities for the serial KVM link.
//!
//! This module contains pure geometry and settings logic with no
//! infrastructure dependencies.
//!
//! # What lives here? (for beginners)
//!
//! The host shows the target computer's screen inside a video view whose size
//! changes whenever the user resizes the window.  The device, however, expects
//! *absolute* pointer coordinates in a fixed range (`0..=0x7FFF` on both
//! axes).  [`pointer::Viewport`] performs that conversion, and
//! [`pointer::ScrollSettings`] turns a physical wheel notch into a number of
//! device scroll ticks.

/// Pointer geometry and scroll settings.
///
/// See [`pointer::Viewport`] for the main type.
pub mod pointer;
