//! Pointer geometry: view-to-device coordinate mapping and scroll settings.

use serde::{Deserialize, Serialize};

/// Largest absolute coordinate the device accepts on either axis.
pub const DEVICE_COORD_MAX: u16 = 0x7FFF;

/// A pointer position.
///
/// Signed so that callers can pass raw hook coordinates (which may be
/// negative on multi-monitor setups); the encoder rejects anything that does
/// not fit the wire's unsigned 16-bit fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// The on-screen area that displays the target's video.
///
/// # Examples
///
/// ```rust
/// use kvm_serial_core::{Point, Viewport};
///
/// let view = Viewport::new(800.0, 600.0);
/// assert_eq!(view.to_device(400.0, 300.0), Point::new(0x3FFF, 0x3FFF));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Maps a position inside the view to device absolute coordinates.
    ///
    /// The position is clamped to the view first, so the result is always in
    /// `0..=DEVICE_COORD_MAX`.  A zero-sized (not yet laid out) view maps
    /// everything to the origin.
    pub fn to_device(&self, x: f64, y: f64) -> Point {
        let max = i32::from(DEVICE_COORD_MAX);
        self.to_range(x, y, Point::new(max, max))
    }

    /// Like [`to_device`](Self::to_device), but maps the far corner of the
    /// view to `max` instead of the device maximum.
    pub fn to_range(&self, x: f64, y: f64, max: Point) -> Point {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Point::default();
        }
        let nx = (x.clamp(0.0, self.width) / self.width) * f64::from(max.x);
        let ny = (y.clamp(0.0, self.height) / self.height) * f64::from(max.y);
        Point::new(nx as i32, ny as i32)
    }
}

/// How a physical wheel notch translates into device scroll ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Ticks sent per wheel notch, `MIN_SENSITIVITY..=MAX_SENSITIVITY`.
    pub sensitivity: u8,
    /// Inverts the scroll direction ("natural" scrolling).
    pub reverse: bool,
}

impl ScrollSettings {
    pub const MIN_SENSITIVITY: u8 = 1;
    pub const MAX_SENSITIVITY: u8 = 20;

    /// Creates settings, clamping `sensitivity` into the supported range.
    pub fn new(sensitivity: u8, reverse: bool) -> Self {
        Self {
            sensitivity: sensitivity.clamp(Self::MIN_SENSITIVITY, Self::MAX_SENSITIVITY),
            reverse,
        }
    }

    /// Returns the signed tick count for one wheel event.
    ///
    /// Positive `wheel_delta` (away from the user) scrolls up.  The magnitude
    /// of the delta is ignored: every notch becomes `sensitivity` ticks.
    pub fn ticks_for(&self, wheel_delta: i32) -> i32 {
        if wheel_delta == 0 {
            return 0;
        }
        let ticks = i32::from(self.sensitivity) * wheel_delta.signum();
        if self.reverse {
            -ticks
        } else {
            ticks
        }
    }
}

impl Default for ScrollSettings {
    fn default() -> Self {
        Self {
            sensitivity: 1,
            reverse: false,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewport_maps_origin_to_origin() {
        let view = Viewport::new(1280.0, 720.0);
        assert_eq!(view.to_device(0.0, 0.0), Point::new(0, 0));
    }

    #[test]
    fn test_viewport_maps_far_corner_to_device_max() {
        let view = Viewport::new(1280.0, 720.0);
        let p = view.to_device(1280.0, 720.0);
        assert_eq!(p, Point::new(0x7FFF, 0x7FFF));
    }

    #[test]
    fn test_viewport_clamps_positions_outside_the_view() {
        // Arrange – the pointer can briefly report positions just outside
        // the view while dragging across its border.
        let view = Viewport::new(100.0, 100.0);

        // Act
        let below = view.to_device(-5.0, -1.0);
        let above = view.to_device(250.0, 101.0);

        // Assert
        assert_eq!(below, Point::new(0, 0));
        assert_eq!(above, Point::new(0x7FFF, 0x7FFF));
    }

    #[test]
    fn test_to_range_maps_far_corner_to_given_maximum() {
        let view = Viewport::new(1920.0, 1080.0);
        assert_eq!(view.to_range(1920.0, 1080.0, Point::new(1897, 985)), Point::new(1897, 985));
        assert_eq!(view.to_range(960.0, 540.0, Point::new(1000, 500)), Point::new(500, 250));
    }

    #[test]
    fn test_zero_sized_viewport_maps_to_origin() {
        let view = Viewport::new(0.0, 600.0);
        assert_eq!(view.to_device(10.0, 10.0), Point::default());
    }

    #[test]
    fn test_scroll_ticks_follow_wheel_direction() {
        let settings = ScrollSettings::new(3, false);
        assert_eq!(settings.ticks_for(120), 3);
        assert_eq!(settings.ticks_for(-120), -3);
        assert_eq!(settings.ticks_for(0), 0);
    }

    #[test]
    fn test_scroll_reverse_negates_ticks() {
        let settings = ScrollSettings::new(2, true);
        assert_eq!(settings.ticks_for(120), -2);
        assert_eq!(settings.ticks_for(-120), 2);
    }

    #[test]
    fn test_scroll_sensitivity_is_clamped() {
        assert_eq!(ScrollSettings::new(0, false).sensitivity, 1);
        assert_eq!(ScrollSettings::new(200, false).sensitivity, 20);
    }
}
