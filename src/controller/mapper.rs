//! # Controller Event Mapper
//!
//! Parses raw evdev input events into a [`ControllerState`].
//!
//! ## Axis Mapping
//!
//! | Input | evdev Code | Motion |
//! |-------|------------|--------|
//! | Left Stick X | ABS_X | Sideways translation |
//! | Left Stick Y | ABS_Y | Forward/backward translation |
//! | Right Stick X | ABS_Z | Gaze left/right |
//! | Right Stick Y | ABS_RZ | Gaze forward/backward |
//!
//! ## Button Mapping
//!
//! | Button | evdev Code | Function |
//! |--------|------------|----------|
//! | Options / Start | BTN_START | Start / stop the robot |
//! | PS / Mode | BTN_MODE | Stop the robot |
//!
//! Events arrive one axis at a time; a frame is complete at `SYN_REPORT`.
//! Stick values are kept raw; the device's [`StickRanges`] decide where the
//! rest position is.
//!
//! ## Usage
//!
//! ```no_run
//! use pepper_gamepad::controller::mapper::EventMapper;
//! use pepper_gamepad::controller::gamepad::Gamepad;
//!
//! let mut gamepad = Gamepad::open("")?;
//! let mut mapper = EventMapper::with_ranges(gamepad.stick_ranges());
//!
//! loop {
//!     for event in gamepad.fetch_events()? {
//!         if mapper.process_event(&event) {
//!             let state = mapper.state();
//!             // Convert state to a joystick sample...
//!         }
//!     }
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use evdev::{AbsoluteAxisType, InputEvent, InputEventKind, Key, Synchronization};

use super::calibration::StickRanges;

/// Stick and lifecycle button state of the gamepad.
///
/// Stick values are raw evdev values in the device's range (y grows
/// downwards). The default state is a centered DualSense (0-255, 128 = center).
///
/// # Examples
///
/// ```
/// use pepper_gamepad::controller::mapper::ControllerState;
///
/// let state = ControllerState::default();
/// assert_eq!(state.left_stick_x, 128);  // Centered
/// assert!(!state.btn_start);            // Not pressed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerState {
    /// Left stick X axis. Minimum = full left.
    pub left_stick_x: i32,
    /// Left stick Y axis. Minimum = full up.
    pub left_stick_y: i32,
    /// Right stick X axis. Minimum = full left.
    pub right_stick_x: i32,
    /// Right stick Y axis. Minimum = full up.
    pub right_stick_y: i32,

    /// Options / Start button.
    pub btn_start: bool,
    /// PS / Mode button.
    pub btn_mode: bool,
}

impl Default for ControllerState {
    /// Creates a new controller state with all sticks centered and buttons released.
    fn default() -> Self {
        Self::centered(&StickRanges::default())
    }
}

impl ControllerState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sticks at the rest position of `ranges`, buttons released.
    ///
    /// # Examples
    ///
    /// ```
    /// use pepper_gamepad::controller::calibration::{AxisRange, StickRanges};
    /// use pepper_gamepad::controller::mapper::ControllerState;
    ///
    /// let stick = AxisRange::new(-32768, 32767, 16);
    /// let ranges = StickRanges { left_x: stick, left_y: stick, ..Default::default() };
    /// let state = ControllerState::centered(&ranges);
    /// assert_eq!(state.left_stick_x, 0);
    /// assert_eq!(state.right_stick_x, 128);
    /// ```
    #[must_use]
    pub fn centered(ranges: &StickRanges) -> Self {
        Self {
            left_stick_x: ranges.left_x.center(),
            left_stick_y: ranges.left_y.center(),
            right_stick_x: ranges.right_x.center(),
            right_stick_y: ranges.right_y.center(),
            btn_start: false,
            btn_mode: false,
        }
    }
}

/// Parses raw evdev events and maintains controller state.
///
/// # Thread Safety
///
/// `EventMapper` is not thread-safe. Use from a single task/thread only.
#[derive(Debug, Default)]
pub struct EventMapper {
    ranges: StickRanges,
    state: ControllerState,
}

impl EventMapper {
    /// Mapper for a DualSense-style 0-255 device.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mapper whose rest state is the center of the device's stick ranges.
    #[must_use]
    pub fn with_ranges(ranges: StickRanges) -> Self {
        Self {
            ranges,
            state: ControllerState::centered(&ranges),
        }
    }

    /// Returns a reference to the current controller state.
    #[must_use]
    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    /// Processes a single evdev input event and updates internal state.
    ///
    /// Returns `true` when the event completes an input frame (`SYN_REPORT`).
    pub fn process_event(&mut self, event: &InputEvent) -> bool {
        match event.kind() {
            InputEventKind::AbsAxis(axis) => {
                self.process_axis_event(axis, event.value());
                false
            }
            InputEventKind::Key(key) => {
                self.process_key_event(key, event.value() != 0);
                false
            }
            InputEventKind::Synchronization(Synchronization::SYN_REPORT) => true,
            _ => false,
        }
    }

    fn process_axis_event(&mut self, axis: AbsoluteAxisType, value: i32) {
        match axis {
            AbsoluteAxisType::ABS_X => self.state.left_stick_x = value,
            AbsoluteAxisType::ABS_Y => self.state.left_stick_y = value,
            AbsoluteAxisType::ABS_Z => self.state.right_stick_x = value,
            AbsoluteAxisType::ABS_RZ => self.state.right_stick_y = value,
            _ => {
                // Triggers, d-pad, motion sensors
            }
        }
    }

    fn process_key_event(&mut self, key: Key, pressed: bool) {
        match key {
            Key::BTN_START => self.state.btn_start = pressed,
            Key::BTN_MODE => self.state.btn_mode = pressed,
            _ => {}
        }
    }

    /// Centers the sticks and releases the buttons.
    ///
    /// Used when the gamepad disconnects so the robot is not left moving.
    pub fn reset(&mut self) {
        self.state = ControllerState::centered(&self.ranges);
    }
}
