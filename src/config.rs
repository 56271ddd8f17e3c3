//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{PepperGamepadError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub controller: ControllerConfig,
    pub motion: MotionConfig,
    pub robot: RobotConfig,
    pub telemetry: TelemetryConfig,
    pub logging: LoggingConfig,
}

/// Gamepad configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControllerConfig {
    /// evdev device to open; empty means auto-detect.
    #[serde(default)]
    pub device_path: String,

    #[serde(default = "default_deadzone_stick")]
    pub deadzone_stick: f32,
}

/// Joystick quantization and motion configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MotionConfig {
    #[serde(default = "default_radius")]
    pub left_radius: i32,

    #[serde(default = "default_left_step")]
    pub left_step: i32,

    #[serde(default = "default_radius")]
    pub right_radius: i32,

    #[serde(default = "default_right_step")]
    pub right_step: i32,

    #[serde(default = "default_offset_x")]
    pub default_offset_x: f64,

    #[serde(default = "default_animation_duration_s")]
    pub animation_duration_s: f64,
}

/// Robot backend configuration
#[derive(Debug, Deserialize, Clone)]
pub struct RobotConfig {
    #[serde(default = "default_backend")]
    pub backend: String,

    #[serde(default = "default_simulated_start_delay_ms")]
    pub simulated_start_delay_ms: u64,
}

/// Command journal configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_format")]
    pub format: String,
}

/// Diagnostic logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stdout only.
    #[serde(default)]
    pub directory: String,
}

// Default value functions
fn default_deadzone_stick() -> f32 { 0.05 }

fn default_radius() -> i32 { 10 }
fn default_left_step() -> i32 { 2 }
fn default_right_step() -> i32 { 1 }
fn default_offset_x() -> f64 { 100.0 }
fn default_animation_duration_s() -> f64 { 40.0 }

fn default_backend() -> String { "simulated".to_string() }
fn default_simulated_start_delay_ms() -> u64 { 50 }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_format() -> String { "jsonl".to_string() }

fn default_log_level() -> String { "info".to_string() }

fn invalid(message: impl std::fmt::Display) -> PepperGamepadError {
    PepperGamepadError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pepper_gamepad::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    fn validate(&self) -> Result<()> {
        // Validate deadzone
        if !(0.0..=0.25).contains(&self.controller.deadzone_stick) {
            return Err(invalid("deadzone_stick must be between 0.0 and 0.25"));
        }

        // Validate quantization rings
        for (name, radius, step) in [
            ("left", self.motion.left_radius, self.motion.left_step),
            ("right", self.motion.right_radius, self.motion.right_step),
        ] {
            if !(1..=100).contains(&radius) {
                return Err(invalid(format!("{}_radius must be between 1 and 100", name)));
            }
            if step < 1 || step > radius {
                return Err(invalid(format!(
                    "{}_step must be between 1 and {}_radius",
                    name, name
                )));
            }
        }

        if !self.motion.default_offset_x.is_finite() || self.motion.default_offset_x <= 0.0 {
            return Err(invalid("default_offset_x must be greater than 0"));
        }

        if !(self.motion.animation_duration_s > 0.0 && self.motion.animation_duration_s <= 600.0) {
            return Err(invalid("animation_duration_s must be between 0 and 600"));
        }

        // Validate robot backend
        if self.robot.backend != "simulated" {
            return Err(invalid("robot backend must be 'simulated' (only supported backend)"));
        }

        if self.robot.simulated_start_delay_ms > 10000 {
            return Err(invalid("simulated_start_delay_ms must be at most 10000"));
        }

        // Validate telemetry configuration
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.format != "jsonl" {
            return Err(invalid("log format must be 'jsonl' (only supported format)"));
        }

        // Validate logging filter
        if let Err(e) = tracing_subscriber::EnvFilter::try_new(&self.logging.level) {
            return Err(invalid(format!("invalid logging level '{}': {}", self.logging.level, e)));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_valid_config() -> Config {
        Config {
            controller: ControllerConfig {
                device_path: String::new(),
                deadzone_stick: default_deadzone_stick(),
            },
            motion: MotionConfig {
                left_radius: default_radius(),
                left_step: default_left_step(),
                right_radius: default_radius(),
                right_step: default_right_step(),
                default_offset_x: default_offset_x(),
                animation_duration_s: default_animation_duration_s(),
            },
            robot: RobotConfig {
                backend: default_backend(),
                simulated_start_delay_ms: default_simulated_start_delay_ms(),
            },
            telemetry: TelemetryConfig {
                enabled: default_telemetry_enabled(),
                log_dir: default_log_dir(),
                max_records_per_file: default_max_records_per_file(),
                max_files_to_keep: default_max_files_to_keep(),
                format: default_log_format(),
            },
            logging: LoggingConfig {
                level: default_log_level(),
                directory: String::new(),
            },
        }
    }

    fn load_str(toml_content: &str) -> Result<Config> {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();
        Config::load(temp_file.path())
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_load_config_from_file() {
        let config = load_str(
            r#"
[controller]
device_path = "/dev/input/event7"

[motion]
left_step = 1

[robot]

[telemetry]

[logging]
level = "pepper_gamepad=debug"
"#,
        )
        .unwrap();

        assert_eq!(config.controller.device_path, "/dev/input/event7");
        assert_eq!(config.motion.left_step, 1);
        assert_eq!(config.motion.right_step, 1);
        assert_eq!(config.motion.default_offset_x, 100.0);
        assert_eq!(config.logging.level, "pepper_gamepad=debug");
    }

    #[test]
    fn test_missing_section_fails() {
        let result = load_str("[controller]\n[motion]\n");
        assert!(matches!(result, Err(PepperGamepadError::Config(_))));
    }

    #[test]
    fn test_missing_file_fails() {
        let result = Config::load("/nonexistent/pepper-gamepad.toml");
        assert!(matches!(result, Err(PepperGamepadError::Io(_))));
    }

    #[test]
    fn test_bundled_default_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = Config::load(path).unwrap();
        assert!(!config.telemetry.enabled);
        assert_eq!(config.robot.backend, "simulated");
    }

    #[test]
    fn test_deadzone_stick_negative() {
        let mut config = create_valid_config();
        config.controller.deadzone_stick = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_deadzone_stick_too_high() {
        let mut config = create_valid_config();
        config.controller.deadzone_stick = 0.3;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_radius_zero() {
        let mut config = create_valid_config();
        config.motion.right_radius = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_larger_than_radius() {
        let mut config = create_valid_config();
        config.motion.left_radius = 4;
        config.motion.left_step = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_zero() {
        let mut config = create_valid_config();
        config.motion.right_step = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_step_equal_to_radius() {
        let mut config = create_valid_config();
        config.motion.left_radius = 5;
        config.motion.left_step = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_offset_not_positive() {
        let mut config = create_valid_config();
        config.motion.default_offset_x = 0.0;
        assert!(config.validate().is_err());

        config.motion.default_offset_x = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_animation_duration_out_of_range() {
        for duration in [0.0, -1.0, 601.0, f64::NAN] {
            let mut config = create_valid_config();
            config.motion.animation_duration_s = duration;
            assert!(config.validate().is_err(), "duration {} should be invalid", duration);
        }
    }

    #[test]
    fn test_unknown_backend() {
        let mut config = create_valid_config();
        config.robot.backend = "naoqi".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_start_delay_too_high() {
        let mut config = create_valid_config();
        config.robot.simulated_start_delay_ms = 10001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_enabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = true;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_when_disabled() {
        let mut config = create_valid_config();
        config.telemetry.enabled = false;
        config.telemetry.log_dir = String::new();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_max_records_per_file_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_records_per_file = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_files_to_keep_zero() {
        let mut config = create_valid_config();
        config.telemetry.max_files_to_keep = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = create_valid_config();
        config.telemetry.format = "csv".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_logging_level() {
        let mut config = create_valid_config();
        config.logging.level = "pepper_gamepad=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_deadzone_stick(), 0.05);
        assert_eq!(default_radius(), 10);
        assert_eq!(default_left_step(), 2);
        assert_eq!(default_right_step(), 1);
        assert_eq!(default_offset_x(), 100.0);
        assert_eq!(default_animation_duration_s(), 40.0);
        assert_eq!(default_backend(), "simulated");
        assert_eq!(default_simulated_start_delay_ms(), 50);
        assert!(!default_telemetry_enabled());
        assert_eq!(default_log_dir(), "./logs");
        assert_eq!(default_max_records_per_file(), 10000);
        assert_eq!(default_max_files_to_keep(), 10);
        assert_eq!(default_log_format(), "jsonl");
        assert_eq!(default_log_level(), "info");
    }
}
