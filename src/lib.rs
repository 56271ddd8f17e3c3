//! # Pepper Gamepad Library
//!
//! Drive a Pepper humanoid robot with a gamepad.
//!
//! The left stick translates the robot base with holonomic line animations;
//! the right stick moves the target the robot keeps looking at. Stick input is
//! quantized to a handful of directions so analog noise does not flood the
//! robot with commands.

pub mod config;
pub mod controller;
pub mod error;
pub mod motion;
pub mod robot;
pub mod telemetry;
