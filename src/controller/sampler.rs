//! # Stick Sampler
//!
//! Turns a [`ControllerState`] into what the motion controller consumes: a
//! [`JoystickSample`] per input frame, and lifecycle commands on button
//! presses.
//!
//! ## Usage
//!
//! ```
//! use pepper_gamepad::controller::calibration::{Calibration, StickRanges};
//! use pepper_gamepad::controller::mapper::ControllerState;
//! use pepper_gamepad::controller::sampler::StickSampler;
//!
//! let mut sampler = StickSampler::new(Calibration::new(0.05), StickRanges::default());
//! let mut state = ControllerState::default();
//! state.left_stick_y = 0; // Full up
//!
//! let sample = sampler.sample(&state);
//! assert_eq!(sample.left_x, 0.0);
//! assert!((sample.left_y - (-1.0)).abs() < 0.01);
//! ```

use super::calibration::{Calibration, StickRanges};
use super::mapper::ControllerState;
use crate::motion::JoystickSample;

/// Controller lifecycle request from a button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleCommand {
    Start,
    Stop,
}

/// Converts controller state to joystick samples and lifecycle commands.
#[derive(Debug, Clone)]
pub struct StickSampler {
    calibration: Calibration,
    ranges: StickRanges,
    /// Whether the robot should currently be running, as toggled by the user.
    running: bool,
    previous: ControllerState,
}

impl StickSampler {
    /// Creates a sampler for a device with the given stick ranges.
    #[must_use]
    pub fn new(calibration: Calibration, ranges: StickRanges) -> Self {
        Self {
            calibration,
            ranges,
            running: false,
            previous: ControllerState::centered(&ranges),
        }
    }

    /// Calibrated stick values.
    #[must_use]
    pub fn sample(&self, state: &ControllerState) -> JoystickSample {
        JoystickSample {
            left_x: self.calibration.apply_axis(&self.ranges.left_x, state.left_stick_x),
            left_y: self.calibration.apply_axis(&self.ranges.left_y, state.left_stick_y),
            right_x: self.calibration.apply_axis(&self.ranges.right_x, state.right_stick_x),
            right_y: self.calibration.apply_axis(&self.ranges.right_y, state.right_stick_y),
        }
    }

    /// Detects button presses since the previous frame.
    ///
    /// Start toggles between running and stopped; Mode always stops.
    pub fn lifecycle(&mut self, state: &ControllerState) -> Option<LifecycleCommand> {
        let start_pressed = state.btn_start && !self.previous.btn_start;
        let mode_pressed = state.btn_mode && !self.previous.btn_mode;
        self.previous = *state;

        if mode_pressed {
            self.running = false;
            return Some(LifecycleCommand::Stop);
        }
        if start_pressed {
            self.running = !self.running;
            return Some(if self.running {
                LifecycleCommand::Start
            } else {
                LifecycleCommand::Stop
            });
        }
        None
    }

    /// Marks the robot as running without a button press (session start).
    pub fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}
