//! # Remote Robot Controller
//!
//! Turns joystick samples into robot commands.
//!
//! - Left stick: holonomic translation of the base. At most one animation is
//!   in flight; a new direction cancels it and the completion re-evaluates
//!   the stick, so the last direction always wins.
//! - Right stick: moves the frame the look-at behaviour tracks, which turns
//!   the head (and base, when not translating) towards it.
//!
//! The controller state lives in a single task. [`ControllerHandle`] only
//! enqueues requests, so it can be cloned and used from any thread, including
//! blocking input threads.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinError};
use tracing::{debug, error, info, warn};

use super::quantize::{Direction, JoystickSample, Quantizer};
use crate::config::MotionConfig;
use crate::error::{PepperGamepadError, Result};
use crate::robot::{
    AttachedFrameHandle, HolonomicLine, LookAtHandle, LookAtPolicy, RobotActuationPort, Transform,
};

/// Quantization and motion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSettings {
    /// Quantizer for the translation stick.
    pub left: Quantizer,
    /// Quantizer for the gaze stick.
    pub right: Quantizer,
    /// Gaze target when the right stick is at rest.
    pub default_offset: Transform,
    /// Duration of every translation animation, in seconds.
    pub animation_duration_s: f64,
}

impl Default for MotionSettings {
    fn default() -> Self {
        Self {
            left: Quantizer::new(10, 2),
            right: Quantizer::new(10, 1),
            default_offset: Transform::from_x_translation(100.0),
            animation_duration_s: 40.0,
        }
    }
}

impl MotionSettings {
    /// Builds settings from the `[motion]` config section.
    #[must_use]
    pub fn from_config(config: &MotionConfig) -> Self {
        Self {
            left: Quantizer::new(config.left_radius, config.left_step),
            right: Quantizer::new(config.right_radius, config.right_step),
            default_offset: Transform::from_x_translation(config.default_offset_x),
            animation_duration_s: config.animation_duration_s,
        }
    }
}

/// Lifecycle phase of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerPhase {
    /// Frame and look-at are being built.
    Initializing,
    /// Initialization failed; motion requests are ignored.
    Failed,
    Stopped,
    Running,
}

/// Point-in-time view of the controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSnapshot {
    pub phase: ControllerPhase,
    /// `start()` was requested before initialization completed.
    pub start_pending: bool,
    /// A translation is being set up or executed.
    pub moving: bool,
    pub animation_in_flight: bool,
    pub left: Direction,
    pub right: Direction,
}

/// How an asynchronous robot operation ended.
#[derive(Debug)]
enum Outcome {
    Success,
    Failed(PepperGamepadError),
    Cancelled,
}

impl Outcome {
    fn from_join(
        result: std::result::Result<Result<()>, JoinError>,
        panicked: fn(String) -> PepperGamepadError,
    ) -> Self {
        match result {
            Ok(Ok(())) => Outcome::Success,
            Ok(Err(PepperGamepadError::AnimationCancelled)) => Outcome::Cancelled,
            Ok(Err(e)) => Outcome::Failed(e),
            Err(e) if e.is_cancelled() => Outcome::Cancelled,
            Err(e) => Outcome::Failed(panicked(format!("task panicked: {}", e))),
        }
    }
}

#[derive(Debug)]
enum Request {
    UpdateTarget(JoystickSample),
    Start,
    Stop,
    Snapshot(oneshot::Sender<ControllerSnapshot>),
    Shutdown,
}

#[derive(Debug)]
enum Event {
    Initialized(Result<Scene>),
    LookAtFinished(Outcome),
    AnimationStarted { generation: u64 },
    AnimationFinished { generation: u64, outcome: Outcome },
}

/// Robot-side objects built during initialization.
#[derive(Debug, Clone, Copy)]
struct Scene {
    target_frame: AttachedFrameHandle,
    look_at: LookAtHandle,
}

#[derive(Debug)]
struct InFlight {
    generation: u64,
    /// Left-stick direction the animation was built for.
    target: Direction,
    abort: AbortHandle,
    cancel_requested: bool,
    /// Whether the completion re-evaluates the left stick. Cleared by `stop()`.
    reevaluate: bool,
}

impl InFlight {
    fn cancel(&mut self) {
        if !self.cancel_requested {
            debug!("Requesting cancellation of animation {}", self.generation);
            self.cancel_requested = true;
        }
        self.abort.abort();
    }
}

/// Cloneable front end of a running [`RemoteRobotController`].
///
/// All methods return immediately; failures on the robot side are logged by
/// the controller and never reported to the caller.
#[derive(Debug, Clone)]
pub struct ControllerHandle {
    requests: mpsc::UnboundedSender<Request>,
}

impl ControllerHandle {
    /// Feeds one joystick sample.
    pub fn update_target(&self, sample: JoystickSample) {
        self.send(Request::UpdateTarget(sample));
    }

    /// Starts the look-at behaviour and accepts motion (deferred until
    /// initialization completes).
    pub fn start(&self) {
        self.send(Request::Start);
    }

    /// Cancels the look-at behaviour and any translation in flight.
    pub fn stop(&self) {
        self.send(Request::Stop);
    }

    /// Stops and terminates the controller task.
    pub fn shutdown(&self) {
        self.send(Request::Shutdown);
    }

    /// Returns the state after every request sent before this call was handled.
    ///
    /// # Errors
    ///
    /// Returns `ControllerUnavailable` if the controller task has ended.
    pub async fn snapshot(&self) -> Result<ControllerSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.requests
            .send(Request::Snapshot(reply_tx))
            .map_err(|_| PepperGamepadError::ControllerUnavailable)?;
        reply_rx
            .await
            .map_err(|_| PepperGamepadError::ControllerUnavailable)
    }

    fn send(&self, request: Request) {
        if self.requests.send(request).is_err() {
            warn!("Motion controller is gone, dropping request");
        }
    }
}

/// Joystick-to-robot motion state machine.
pub struct RemoteRobotController<P: RobotActuationPort + 'static> {
    port: Arc<P>,
    settings: MotionSettings,
    events: mpsc::UnboundedSender<Event>,

    scene: Option<Scene>,
    init_failed: bool,
    start_pending: bool,
    running: bool,
    moving: bool,

    left: Direction,
    right: Direction,

    look_at_run: Option<AbortHandle>,
    animation: Option<InFlight>,
    next_generation: u64,
}

impl<P: RobotActuationPort + 'static> RemoteRobotController<P> {
    /// Spawns the controller task and starts building the robot frames.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use std::time::Duration;
    /// use pepper_gamepad::motion::{JoystickSample, MotionSettings, RemoteRobotController};
    /// use pepper_gamepad::robot::sim::SimulatedRobot;
    ///
    /// #[tokio::main]
    /// async fn main() {
    ///     let robot = Arc::new(SimulatedRobot::new(Duration::from_millis(50)));
    ///     let controller = RemoteRobotController::spawn(robot, MotionSettings::default());
    ///     controller.start();
    ///     controller.update_target(JoystickSample::new(0.0, -1.0, 0.0, 0.0));
    /// }
    /// ```
    pub fn spawn(port: Arc<P>, settings: MotionSettings) -> ControllerHandle {
        let (requests_tx, requests_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let init_port = Arc::clone(&port);
        let init_events = events_tx.clone();
        let default_offset = settings.default_offset;
        tokio::spawn(async move {
            let result = build_scene(init_port.as_ref(), default_offset).await;
            let _ = init_events.send(Event::Initialized(result));
        });

        let controller = Self::new(port, settings, events_tx);
        tokio::spawn(controller.run(requests_rx, events_rx));

        ControllerHandle {
            requests: requests_tx,
        }
    }

    fn new(port: Arc<P>, settings: MotionSettings, events: mpsc::UnboundedSender<Event>) -> Self {
        Self {
            port,
            settings,
            events,
            scene: None,
            init_failed: false,
            start_pending: false,
            running: false,
            moving: false,
            left: Direction::ZERO,
            right: Direction::ZERO,
            look_at_run: None,
            animation: None,
            next_generation: 0,
        }
    }

    async fn run(
        mut self,
        mut requests: mpsc::UnboundedReceiver<Request>,
        mut events: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                biased;

                Some(event) = events.recv() => self.handle_event(event).await,

                request = requests.recv() => match request {
                    Some(Request::Shutdown) | None => break,
                    Some(request) => self.handle_request(request).await,
                },
            }
        }

        self.stop();

        // Let the cancelled animation finish so the look-at policy is restored.
        while self.animation.is_some() {
            match events.recv().await {
                Some(event) => self.handle_event(event).await,
                None => break,
            }
        }
        info!("Motion controller shut down");
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::UpdateTarget(sample) => self.update_target(sample).await,
            Request::Start => self.start(),
            Request::Stop => self.stop(),
            Request::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Request::Shutdown => {}
        }
    }

    async fn handle_event(&mut self, event: Event) {
        match event {
            Event::Initialized(result) => self.on_initialized(result),
            Event::LookAtFinished(outcome) => match outcome {
                Outcome::Success => info!("LookAt done"),
                Outcome::Failed(e) => error!("LookAt error: {}", e),
                Outcome::Cancelled => info!("LookAt cancelled"),
            },
            Event::AnimationStarted { generation } => self.on_animation_started(generation),
            Event::AnimationFinished {
                generation,
                outcome,
            } => self.on_animation_finished(generation, outcome).await,
        }
    }

    fn snapshot(&self) -> ControllerSnapshot {
        let phase = if self.running {
            ControllerPhase::Running
        } else if self.scene.is_some() {
            ControllerPhase::Stopped
        } else if self.init_failed {
            ControllerPhase::Failed
        } else {
            ControllerPhase::Initializing
        };

        ControllerSnapshot {
            phase,
            start_pending: self.start_pending,
            moving: self.moving,
            animation_in_flight: self.animation.is_some(),
            left: self.left,
            right: self.right,
        }
    }

    fn on_initialized(&mut self, result: Result<Scene>) {
        match result {
            Ok(scene) => {
                info!("Robot frames ready");
                self.scene = Some(scene);
                if self.start_pending {
                    info!("Starting deferred motion controller");
                    self.start();
                }
            }
            Err(e) => {
                error!("Failed to initialize motion controller: {}", e);
                self.init_failed = true;
            }
        }
    }

    fn start(&mut self) {
        if self.running {
            return;
        }

        let Some(scene) = self.scene else {
            if self.init_failed {
                warn!("Start requested but initialization failed; it will stay pending");
            } else {
                debug!("Start requested before initialization, deferring");
            }
            self.start_pending = true;
            return;
        };
        self.start_pending = false;

        let port = Arc::clone(&self.port);
        let look_at = scene.look_at;
        let task = tokio::spawn(async move { port.run_look_at(&look_at).await });
        let abort = task.abort_handle();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = Outcome::from_join(task.await, PepperGamepadError::LookAt);
            let _ = events.send(Event::LookAtFinished(outcome));
        });

        self.look_at_run = Some(abort);
        self.running = true;
        info!("Motion controller started");
    }

    fn stop(&mut self) {
        self.start_pending = false;
        if !self.running {
            return;
        }

        if let Some(look_at) = self.look_at_run.take() {
            look_at.abort();
        }
        if let Some(animation) = self.animation.as_mut() {
            animation.reevaluate = false;
            animation.cancel();
        }
        self.running = false;
        info!("Motion controller stopped");
    }

    async fn update_target(&mut self, sample: JoystickSample) {
        debug!(
            "update_target left=({}, {}) right=({}, {})",
            sample.left_x, sample.left_y, sample.right_x, sample.right_y
        );

        let left = self.settings.left.quantize(sample.left_x, sample.left_y);
        let right = self.settings.right.quantize(sample.right_x, sample.right_y);

        // Only act on changes; analog noise would otherwise flood the robot.
        if left != self.left {
            self.left = left;
            self.make_translation().await;
        }
        if right != self.right {
            self.right = right;
            self.make_rotation().await;
        }
    }

    async fn make_translation(&mut self) {
        debug!("make_translation left=({}, {})", self.left.x, self.left.y);

        if !self.running {
            return;
        }
        let Some(scene) = self.scene else {
            return;
        };

        if let Some(animation) = self.animation.as_mut() {
            // The completion event re-evaluates once the robot has stopped.
            animation.reevaluate = true;
            animation.cancel();
            return;
        }
        if self.left.is_zero() || self.moving {
            return;
        }

        self.moving = true;
        if let Err(e) = self
            .port
            .set_look_at_policy(&scene.look_at, LookAtPolicy::HeadOnly)
            .await
        {
            error!("Failed to switch LookAt to head only: {}", e);
        }

        let target = self.left;
        let line = HolonomicLine::new(
            -f64::from(target.y),
            -f64::from(target.x),
            self.settings.animation_duration_s,
        );
        let animation = match self.port.build_holonomic_line(line).await {
            Ok(animation) => animation,
            Err(e) => {
                error!("Failed to build animation {}: {}", line.to_animation_text(), e);
                self.restore_head_and_base(&scene).await;
                self.moving = false;
                return;
            }
        };

        let generation = self.next_generation;
        self.next_generation += 1;

        let (started_tx, started_rx) = oneshot::channel();
        let events = self.events.clone();
        tokio::spawn(async move {
            if started_rx.await.is_ok() {
                let _ = events.send(Event::AnimationStarted { generation });
            }
        });

        let port = Arc::clone(&self.port);
        let task = tokio::spawn(async move { port.run_animation(&animation, started_tx).await });
        let abort = task.abort_handle();
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = Outcome::from_join(task.await, PepperGamepadError::Animation);
            let _ = events.send(Event::AnimationFinished {
                generation,
                outcome,
            });
        });

        self.animation = Some(InFlight {
            generation,
            target,
            abort,
            cancel_requested: false,
            reevaluate: true,
        });
        info!("Animate {} issued: {}", generation, line.to_animation_text());
    }

    fn on_animation_started(&mut self, generation: u64) {
        let left = self.left;
        let Some(animation) = self.animation.as_mut() else {
            return;
        };
        if animation.generation != generation {
            return;
        }

        info!("Animate {} started", generation);
        if animation.target != left {
            debug!("Target changed before animation {} started", generation);
            animation.cancel();
        }
    }

    async fn on_animation_finished(&mut self, generation: u64, outcome: Outcome) {
        let reevaluate = match &self.animation {
            Some(animation) if animation.generation == generation => animation.reevaluate,
            _ => {
                debug!("Ignoring completion of stale animation {}", generation);
                return;
            }
        };
        self.animation = None;

        match outcome {
            Outcome::Success => info!("Animate {} finished with success", generation),
            Outcome::Failed(e) => error!("Animate {} error: {}", generation, e),
            Outcome::Cancelled => info!("Animate {} cancelled", generation),
        }

        if let Some(scene) = self.scene {
            self.restore_head_and_base(&scene).await;
        }
        self.moving = false;

        if reevaluate {
            self.make_translation().await;
        }
    }

    async fn restore_head_and_base(&self, scene: &Scene) {
        if let Err(e) = self
            .port
            .set_look_at_policy(&scene.look_at, LookAtPolicy::HeadAndBase)
            .await
        {
            error!("Failed to restore LookAt head and base policy: {}", e);
        }
    }

    async fn make_rotation(&mut self) {
        debug!("make_rotation right=({}, {})", self.right.x, self.right.y);

        if !self.running {
            return;
        }
        let Some(scene) = self.scene else {
            return;
        };

        let transform = if self.right.is_zero() {
            self.settings.default_offset
        } else {
            Transform::from_2d_translation(-f64::from(self.right.y), -f64::from(self.right.x))
        };

        if let Err(e) = self
            .port
            .update_attached_frame(&scene.target_frame, transform)
            .await
        {
            error!("Failed to move gaze target: {}", e);
        }
    }
}

async fn build_scene<P: RobotActuationPort + ?Sized>(
    port: &P,
    default_offset: Transform,
) -> Result<Scene> {
    let robot_frame = port.gaze_frame().await?;
    let target_frame = port.attach_frame(&robot_frame, default_offset).await?;
    let look_at = port.build_look_at(&target_frame).await?;
    Ok(Scene {
        target_frame,
        look_at,
    })
}
