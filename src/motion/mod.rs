//! # Motion Module
//!
//! Converts joystick samples into robot motion.
//!
//! This module handles:
//! - Quantizing stick vectors onto a fixed-radius ring
//! - Debouncing repeated directions
//! - Serializing translation animations (one in flight, cancel and retry)
//! - Moving the gaze target with the right stick

pub mod controller;
pub mod quantize;

pub use controller::{
    ControllerHandle, ControllerPhase, ControllerSnapshot, MotionSettings, RemoteRobotController,
};
pub use quantize::{Direction, JoystickSample, Quantizer};
