//! # Error Types
//!
//! Custom error types for Pepper Gamepad using `thiserror`.

use thiserror::Error;

/// Main error type for Pepper Gamepad
#[derive(Debug, Error)]
pub enum PepperGamepadError {
    /// The robot (gaze) frame or the attached target frame could not be obtained
    #[error("Frame acquisition failed: {0}")]
    FrameAcquisition(String),

    /// Building, running or re-configuring the look-at behaviour failed
    #[error("LookAt error: {0}")]
    LookAt(String),

    /// Building or running a motion animation failed
    #[error("Animation error: {0}")]
    Animation(String),

    /// A motion animation was cancelled before it finished
    #[error("Animation cancelled")]
    AnimationCancelled,

    /// Gamepad errors
    #[error("Controller error: {0}")]
    Controller(String),

    /// No gamepad found
    #[error("No gamepad with two analog sticks found")]
    ControllerNotFound,

    /// The motion controller task is gone
    #[error("Motion controller is not running")]
    ControllerUnavailable,

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Command journal serialization errors
    #[error("Journal error: {0}")]
    Journal(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Pepper Gamepad
pub type Result<T> = std::result::Result<T, PepperGamepadError>;
