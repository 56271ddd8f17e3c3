//! # Controller Module
//!
//! Gamepad input handling.
//!
//! This module handles:
//! - Gamepad detection and connection via evdev
//! - Reading analog stick and button inputs
//! - Centering sticks and applying the deadzone
//! - Producing joystick samples and lifecycle commands for the motion controller

pub mod calibration;
pub mod gamepad;
pub mod mapper;
pub mod sampler;
