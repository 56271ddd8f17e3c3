//! # Joystick Quantization
//!
//! Reduces a continuous stick vector to one of a few directions on a ring of
//! fixed radius. Only the angle of the input matters: a half-pushed stick and
//! a fully pushed stick pointing the same way give the same direction, which
//! is what lets the controller ignore analog noise.
//!
//! ```text
//! θ = atan2(y, x)
//! x' = round(cos θ · radius / step) · step
//! y' = round(sin θ · radius / step) · step
//! ```
//!
//! A larger `step` means fewer distinct directions. With `radius = 10`:
//! - `step = 1`: fine ring (the right stick default)
//! - `step = 2`: coarse ring (the left stick default)

/// Continuous joystick input for both sticks, one sample per input frame.
///
/// Values are in -1.0..=1.0, x positive to the right, y positive downwards.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct JoystickSample {
    pub left_x: f32,
    pub left_y: f32,
    pub right_x: f32,
    pub right_y: f32,
}

impl JoystickSample {
    #[must_use]
    pub fn new(left_x: f32, left_y: f32, right_x: f32, right_y: f32) -> Self {
        Self {
            left_x,
            left_y,
            right_x,
            right_y,
        }
    }
}

/// A quantized stick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Direction {
    pub x: i32,
    pub y: i32,
}

impl Direction {
    /// Stick at rest.
    pub const ZERO: Direction = Direction { x: 0, y: 0 };

    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

/// Ring quantizer for one stick.
///
/// # Examples
///
/// ```
/// use pepper_gamepad::motion::quantize::{Direction, Quantizer};
///
/// let q = Quantizer::new(10, 1);
/// assert_eq!(q.quantize(0.0, 0.0), Direction::ZERO);
/// assert_eq!(q.quantize(0.3, 0.0), Direction::new(10, 0));
/// assert_eq!(q.quantize(0.5, 0.5), Direction::new(7, 7));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantizer {
    radius: i32,
    step: i32,
}

impl Quantizer {
    /// Creates a quantizer.
    ///
    /// `step` is clamped to `1..=radius` and `radius` to at least 1.
    #[must_use]
    pub fn new(radius: i32, step: i32) -> Self {
        let radius = radius.max(1);
        Self {
            radius,
            step: step.clamp(1, radius),
        }
    }

    #[must_use]
    pub fn radius(&self) -> i32 {
        self.radius
    }

    #[must_use]
    pub fn step(&self) -> i32 {
        self.step
    }

    /// Quantizes one stick vector.
    ///
    /// Exactly-zero input is the only way to get [`Direction::ZERO`].
    #[must_use]
    pub fn quantize(&self, x: f32, y: f32) -> Direction {
        if x == 0.0 && y == 0.0 {
            return Direction::ZERO;
        }

        let theta = f64::from(y).atan2(f64::from(x));
        let slots = f64::from(self.radius) / f64::from(self.step);
        Direction {
            x: (theta.cos() * slots).round() as i32 * self.step,
            y: (theta.sin() * slots).round() as i32 * self.step,
        }
    }
}
