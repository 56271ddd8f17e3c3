//! # Calibration Module
//!
//! Centers raw stick values and removes the flat region around center.
//!
//! Every axis is normalized with the range the device reports for it, so a
//! DualSense (0..255), an xpad stick (-32768..32767) and a pad reporting
//! 0..1023 all rest at `0.0`.
//!
//! A stick at rest rarely reports exactly its center value. Everything inside
//! the deadzone is mapped to exactly `0.0`; the motion controller relies on
//! that, since only an exactly-zero stick counts as released. The deadzone is
//! the larger of the configured one and the flat region the device reports.
//! Values outside the deadzone are passed through unscaled: the motion
//! controller only looks at the angle of the stick.
//!
//! ## Usage
//!
//! ```
//! use pepper_gamepad::controller::calibration::{AxisRange, Calibration};
//!
//! let cal = Calibration::new(0.05);
//! let range = AxisRange::new(-32768, 32767, 0);
//!
//! // Near center (within deadzone)
//! assert_eq!(cal.apply_axis(&range, 800), 0.0);
//!
//! // Full deflection
//! assert_eq!(cal.apply_axis(&range, -32768), -1.0);
//! ```

/// Raw value range of a DualSense stick.
pub const DUALSENSE_AXIS_MIN: i32 = 0;
/// Raw value range of a DualSense stick.
pub const DUALSENSE_AXIS_MAX: i32 = 255;

/// Raw range of one absolute axis, as reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    minimum: i32,
    maximum: i32,
    /// Raw half-width of the region the device itself treats as centered.
    flat: i32,
}

impl Default for AxisRange {
    fn default() -> Self {
        Self::new(DUALSENSE_AXIS_MIN, DUALSENSE_AXIS_MAX, 0)
    }
}

impl AxisRange {
    #[must_use]
    pub fn new(minimum: i32, maximum: i32, flat: i32) -> Self {
        Self {
            minimum,
            maximum,
            flat: flat.max(0),
        }
    }

    /// Raw rest value of the axis.
    ///
    /// ```
    /// use pepper_gamepad::controller::calibration::AxisRange;
    ///
    /// assert_eq!(AxisRange::new(0, 255, 0).center(), 128);
    /// assert_eq!(AxisRange::new(-32768, 32767, 0).center(), 0);
    /// assert_eq!(AxisRange::new(0, 1023, 0).center(), 512);
    /// ```
    #[must_use]
    pub fn center(&self) -> i32 {
        let sum = i64::from(self.minimum) + i64::from(self.maximum) + 1;
        sum.div_euclid(2) as i32
    }

    fn half_span(&self) -> f32 {
        (i64::from(self.maximum) - i64::from(self.minimum)) as f32 / 2.0
    }

    /// Converts a raw value to -1.0..=1.0, where the center is exactly 0.0.
    ///
    /// A degenerate range (maximum not above minimum) always reads as centered.
    #[must_use]
    pub fn normalize(&self, raw: i32) -> f32 {
        let half = self.half_span();
        if half <= 0.0 {
            return 0.0;
        }
        let offset = (i64::from(raw) - i64::from(self.center())) as f32;
        (offset / half).clamp(-1.0, 1.0)
    }

    /// Flat region as a fraction of the half range.
    #[must_use]
    pub fn flat_fraction(&self) -> f32 {
        let half = self.half_span();
        if half <= 0.0 {
            return 0.0;
        }
        (self.flat as f32 / half).clamp(0.0, 1.0)
    }
}

/// Ranges of the four stick axes of one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StickRanges {
    pub left_x: AxisRange,
    pub left_y: AxisRange,
    pub right_x: AxisRange,
    pub right_y: AxisRange,
}

/// Applies a center deadzone to stick values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Deadzone as a fraction (0.0 to 0.25).
    deadzone: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { deadzone: 0.05 }
    }
}

impl Calibration {
    /// Creates a new calibration.
    ///
    /// # Arguments
    ///
    /// * `deadzone` - Deadzone fraction (0.0 to 0.25). Values outside this range are clamped.
    #[must_use]
    pub fn new(deadzone: f32) -> Self {
        Self {
            deadzone: deadzone.clamp(0.0, 0.25),
        }
    }

    /// Normalizes a raw axis value and applies the deadzone.
    ///
    /// # Examples
    ///
    /// ```
    /// use pepper_gamepad::controller::calibration::{AxisRange, Calibration};
    ///
    /// let cal = Calibration::new(0.1);
    /// let range = AxisRange::default();
    /// assert_eq!(cal.apply_axis(&range, 135), 0.0);
    /// assert!(cal.apply_axis(&range, 255) > 0.99);
    /// ```
    #[must_use]
    pub fn apply_axis(&self, range: &AxisRange, raw: i32) -> f32 {
        let value = range.normalize(raw);
        let deadzone = self.deadzone.max(range.flat_fraction());
        if value.abs() <= deadzone {
            0.0
        } else {
            value
        }
    }
}
