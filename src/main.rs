//! # Pepper Gamepad
//!
//! Drive a Pepper humanoid robot with a gamepad.
//!
//! # Control Flow
//!
//! 1. **Initialization**
//!    - Load configuration (first argument, or `config/default.toml`)
//!    - Set up logging with tracing subscriber
//!    - Spawn the motion controller on the configured robot backend
//!    - Open the gamepad via evdev
//!
//! 2. **Input Loop** (dedicated thread, evdev reads block)
//!    - Every completed input frame becomes a joystick sample
//!    - Options/Start toggles the robot, PS/Mode stops it
//!
//! 3. **Graceful Shutdown**
//!    - Ctrl+C or gamepad disconnect
//!    - Cancel the look-at and any motion in flight
//!
//! ```bash
//! cargo run --release -- config/default.toml
//! ```

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use pepper_gamepad::config::{Config, LoggingConfig};
use pepper_gamepad::controller::calibration::Calibration;
use pepper_gamepad::controller::gamepad::Gamepad;
use pepper_gamepad::controller::mapper::EventMapper;
use pepper_gamepad::controller::sampler::{LifecycleCommand, StickSampler};
use pepper_gamepad::motion::{ControllerHandle, MotionSettings, RemoteRobotController};
use pepper_gamepad::robot::sim::SimulatedRobot;
use pepper_gamepad::telemetry::journal::CommandJournal;
use pepper_gamepad::telemetry::JournaledPort;

/// Configuration used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Log file name prefix inside the logging directory
const LOG_FILE_PREFIX: &str = "pepper-gamepad.log";

/// Time given to the controller to cancel robot motion before exit
const SHUTDOWN_GRACE: Duration = Duration::from_millis(200);

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path))?;

    let _log_guard = init_logging(&config.logging)?;
    info!("Pepper Gamepad v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Configuration loaded from {}", config_path);

    let settings = MotionSettings::from_config(&config.motion);
    let robot = SimulatedRobot::new(Duration::from_millis(config.robot.simulated_start_delay_ms));
    info!("Using {} robot backend", config.robot.backend);

    let controller = if config.telemetry.enabled {
        let journal = CommandJournal::from_config(&config.telemetry)?;
        RemoteRobotController::spawn(Arc::new(JournaledPort::new(robot, journal)), settings)
    } else {
        RemoteRobotController::spawn(Arc::new(robot), settings)
    };

    let gamepad = Gamepad::open(&config.controller.device_path)?;
    info!(
        "Gamepad {} connected at {}",
        gamepad.name().unwrap_or("unnamed"),
        gamepad.device_path()
    );
    let calibration = Calibration::new(config.controller.deadzone_stick);

    // The session starts with the robot active.
    controller.start();
    let input_done = spawn_input_thread(gamepad, calibration, controller.clone());

    info!("Press Options to pause/resume, PS to stop, Ctrl+C to exit");

    tokio::select! {
        result = input_done => match result {
            Ok(Ok(())) => info!("Gamepad input finished"),
            Ok(Err(e)) => error!("Gamepad input stopped: {}", e),
            Err(_) => error!("Gamepad input thread exited unexpectedly"),
        },

        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
        }
    }

    controller.shutdown();
    tokio::time::sleep(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Set up the tracing subscriber.
///
/// `RUST_LOG` wins over the configured level. Returns the guard that keeps the
/// file writer alive when logging to a directory.
fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .context("Invalid logging level")?;

    if config.directory.is_empty() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
        return Ok(None);
    }

    let appender = tracing_appender::rolling::daily(&config.directory, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();
    Ok(Some(guard))
}

/// Read the gamepad on a plain thread.
///
/// evdev reads block, and a blocked `spawn_blocking` task would keep the
/// runtime from shutting down on Ctrl+C.
fn spawn_input_thread(
    gamepad: Gamepad,
    calibration: Calibration,
    controller: ControllerHandle,
) -> oneshot::Receiver<pepper_gamepad::error::Result<()>> {
    let (done_tx, done_rx) = oneshot::channel();
    std::thread::spawn(move || {
        let result = run_input_loop(gamepad, calibration, &controller);
        let _ = done_tx.send(result);
    });
    done_rx
}

fn run_input_loop(
    mut gamepad: Gamepad,
    calibration: Calibration,
    controller: &ControllerHandle,
) -> pepper_gamepad::error::Result<()> {
    let ranges = gamepad.stick_ranges();
    let mut mapper = EventMapper::with_ranges(ranges);
    let mut sampler = StickSampler::new(calibration, ranges);
    sampler.set_running(true);

    loop {
        let events: Vec<_> = match gamepad.fetch_events() {
            Ok(events) => events.collect(),
            Err(e) => {
                // Never leave the robot moving after the gamepad is gone.
                mapper.reset();
                controller.update_target(sampler.sample(mapper.state()));
                return Err(e);
            }
        };

        for event in events {
            if !mapper.process_event(&event) {
                continue;
            }

            let state = *mapper.state();
            match sampler.lifecycle(&state) {
                Some(LifecycleCommand::Start) => {
                    info!("Resuming robot");
                    controller.start();
                }
                Some(LifecycleCommand::Stop) => {
                    warn!("Stopping robot");
                    controller.stop();
                }
                None => {}
            }

            controller.update_target(sampler.sample(&state));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_path_exists() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_CONFIG_PATH);
        assert!(path.exists(), "{} should ship with the crate", DEFAULT_CONFIG_PATH);
    }

    #[test]
    fn test_shutdown_grace_is_short() {
        assert!(SHUTDOWN_GRACE <= Duration::from_secs(1));
    }
}
