//! # Gamepad Module
//!
//! Gamepad detection, connection, and input reading using the Linux evdev
//! interface.
//!
//! ## Gamepad Detection
//!
//! A device qualifies when it exposes both analog sticks and at least one
//! gamepad button:
//! - Left stick: ABS_X, ABS_Y
//! - Right stick: ABS_Z, ABS_RZ
//! - Button: BTN_SOUTH
//!
//! The button requirement skips the separate motion-sensor device some
//! controllers register, which reports the same absolute axes.
//!
//! Stick ranges differ between devices (0..255 on a DualSense, ±32767 or
//! 0..1023 elsewhere), so the range and flat region of each stick axis are
//! read from the kernel when the device is opened.

use evdev::{AbsoluteAxisType, Device, Key};
use std::path::Path;
use tracing::{debug, info};

use super::calibration::{AxisRange, StickRanges};
use crate::error::{PepperGamepadError, Result};

/// Axes a device must report to be driven as a gamepad.
const REQUIRED_AXES: [AbsoluteAxisType; 4] = [
    AbsoluteAxisType::ABS_X,
    AbsoluteAxisType::ABS_Y,
    AbsoluteAxisType::ABS_Z,
    AbsoluteAxisType::ABS_RZ,
];

/// Gamepad handle
///
/// Represents an active connection to a gamepad via evdev.
pub struct Gamepad {
    device: Device,
    device_path: String,
    stick_ranges: StickRanges,
}

impl std::fmt::Debug for Gamepad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gamepad")
            .field("device_path", &self.device_path)
            .field("stick_ranges", &self.stick_ranges)
            .finish_non_exhaustive()
    }
}

impl Gamepad {
    /// Open a gamepad
    ///
    /// Opens `device_path` when given, otherwise scans `/dev/input/event*`
    /// (in sorted order) for the first device that looks like a gamepad.
    ///
    /// # Errors
    ///
    /// - `ControllerNotFound`: No gamepad found on the system
    /// - `Controller`: The configured device cannot be opened or is not a gamepad
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use pepper_gamepad::controller::gamepad::Gamepad;
    ///
    /// let gamepad = Gamepad::open("")?;
    /// println!("Connected to gamepad at: {}", gamepad.device_path());
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device_path: &str) -> Result<Self> {
        if device_path.is_empty() {
            Self::detect()
        } else {
            Self::open_path(Path::new(device_path))
        }
    }

    fn open_path(path: &Path) -> Result<Self> {
        let device = Device::open(path).map_err(|e| {
            PepperGamepadError::Controller(format!("Failed to open {}: {}", path.display(), e))
        })?;

        if !is_gamepad(&device) {
            return Err(PepperGamepadError::Controller(format!(
                "{} does not report two analog sticks",
                path.display()
            )));
        }

        let gamepad = Self::from_device(device, path)?;
        info!("Opened gamepad at: {}", gamepad.device_path);
        Ok(gamepad)
    }

    fn from_device(device: Device, path: &Path) -> Result<Self> {
        let abs_state = device.get_abs_state().map_err(|e| {
            PepperGamepadError::Controller(format!(
                "Failed to read axis ranges of {}: {}",
                path.display(),
                e
            ))
        })?;
        let range = |axis: AbsoluteAxisType| {
            let info = &abs_state[usize::from(axis.0)];
            AxisRange::new(info.minimum, info.maximum, info.flat)
        };
        let stick_ranges = StickRanges {
            left_x: range(AbsoluteAxisType::ABS_X),
            left_y: range(AbsoluteAxisType::ABS_Y),
            right_x: range(AbsoluteAxisType::ABS_Z),
            right_y: range(AbsoluteAxisType::ABS_RZ),
        };
        debug!("Stick ranges of {}: {:?}", path.display(), stick_ranges);

        Ok(Self {
            device,
            device_path: path.to_string_lossy().to_string(),
            stick_ranges,
        })
    }

    fn detect() -> Result<Self> {
        let input_dir = Path::new("/dev/input");

        if !input_dir.exists() {
            return Err(PepperGamepadError::Controller(
                "/dev/input directory not found".to_string(),
            ));
        }

        let mut entries: Vec<_> = std::fs::read_dir(input_dir)
            .map_err(|e| {
                PepperGamepadError::Controller(format!("Failed to read /dev/input: {}", e))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| {
                PepperGamepadError::Controller(format!("Failed to read directory entry: {}", e))
            })?;

        // Sort entries for deterministic device selection when multiple gamepads are connected
        entries.sort_by_key(|entry| entry.path());

        for entry in entries {
            let path = entry.path();

            let is_event_node = path
                .file_name()
                .map(|name| name.to_string_lossy().starts_with("event"))
                .unwrap_or(false);
            if !is_event_node {
                continue;
            }

            match Device::open(&path) {
                Ok(device) => {
                    debug!(
                        "Found input device: {} ({})",
                        path.display(),
                        device.name().unwrap_or("unnamed")
                    );

                    if is_gamepad(&device) {
                        info!(
                            "Found gamepad {} at: {}",
                            device.name().unwrap_or("unnamed"),
                            path.display()
                        );
                        return Self::from_device(device, &path);
                    }
                }
                Err(e) => {
                    // Permission denied or other errors - skip device
                    debug!("Could not open {}: {}", path.display(), e);
                }
            }
        }

        Err(PepperGamepadError::ControllerNotFound)
    }

    /// Get the device path of this gamepad
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Raw range of each stick axis, as reported by the device
    pub fn stick_ranges(&self) -> StickRanges {
        self.stick_ranges
    }

    /// Fetch events from the gamepad
    ///
    /// This call blocks until events are available.
    ///
    /// # Errors
    ///
    /// Returns `Controller` error if fetching events fails (e.g., gamepad disconnected).
    pub fn fetch_events(&mut self) -> Result<impl Iterator<Item = evdev::InputEvent> + '_> {
        self.device
            .fetch_events()
            .map_err(|e| PepperGamepadError::Controller(format!("Failed to fetch events: {}", e)))
    }

    /// Human-readable device name.
    pub fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

fn is_gamepad(device: &Device) -> bool {
    let has_sticks = device
        .supported_absolute_axes()
        .map(|axes| REQUIRED_AXES.iter().all(|axis| axes.contains(*axis)))
        .unwrap_or(false);
    let has_buttons = device
        .supported_keys()
        .map(|keys| keys.contains(Key::BTN_SOUTH))
        .unwrap_or(false);
    has_sticks && has_buttons
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_axes_cover_both_sticks() {
        assert!(REQUIRED_AXES.contains(&AbsoluteAxisType::ABS_X));
        assert!(REQUIRED_AXES.contains(&AbsoluteAxisType::ABS_Y));
        assert!(REQUIRED_AXES.contains(&AbsoluteAxisType::ABS_Z));
        assert!(REQUIRED_AXES.contains(&AbsoluteAxisType::ABS_RZ));
    }

    #[test]
    fn test_open_missing_device_fails() {
        let result = Gamepad::open("/dev/input/does-not-exist");
        assert!(matches!(result, Err(PepperGamepadError::Controller(_))));
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_detect_with_real_hardware() {
        let gamepad = Gamepad::open("").expect("Gamepad not found");
        assert!(gamepad.device_path().starts_with("/dev/input/event"));
        assert!(gamepad.name().is_some());

        let ranges = gamepad.stick_ranges();
        assert_ne!(ranges.left_x, AxisRange::new(0, 0, 0));
        assert_ne!(ranges.right_y, AxisRange::new(0, 0, 0));
    }

    // Integration test - only runs with real hardware
    #[test]
    #[ignore]
    fn test_fetch_events_with_real_hardware() {
        let mut gamepad = Gamepad::open("").expect("Gamepad not found");

        println!("Move the sticks or press buttons...");
        for _ in 0..100 {
            if let Ok(mut events) = gamepad.fetch_events() {
                if let Some(event) = events.next() {
                    println!("Received event: {:?}", event);
                    return;
                }
            }
            std::thread::sleep(std::time::Duration::from_millis(50));
        }

        panic!("No events received from gamepad");
    }
}
