//! # Robot Module
//!
//! Abstraction of the robot actuation SDK.
//!
//! The motion controller never talks to a robot directly. Everything it needs
//! (reference frames, the look-at behaviour, holonomic animations) goes through
//! [`RobotActuationPort`], and every object the port hands out is an opaque
//! handle that only means something to the port that created it.
//!
//! Long-running operations (`run_look_at`, `run_animation`) are plain futures:
//! they resolve when the robot is done, and dropping them requests
//! cancellation.

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::oneshot;

use crate::error::Result;

pub mod sim;

/// A reference frame owned by the robot (the robot base frame).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FrameHandle(pub u64);

/// A frame attached to another frame with an updatable transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttachedFrameHandle(pub u64);

/// A look-at behaviour bound to an attached frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LookAtHandle(pub u64);

/// A built, not yet running, animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationHandle(pub u64);

/// Planar translation relative to a parent frame, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Transform {
    /// Forward translation.
    pub x: f64,
    /// Leftward translation.
    pub y: f64,
}

impl Transform {
    /// Pure forward translation.
    ///
    /// # Examples
    ///
    /// ```
    /// use pepper_gamepad::robot::Transform;
    ///
    /// let t = Transform::from_x_translation(100.0);
    /// assert_eq!(t, Transform::from_2d_translation(100.0, 0.0));
    /// ```
    #[must_use]
    pub fn from_x_translation(x: f64) -> Self {
        Self { x, y: 0.0 }
    }

    /// Translation in the horizontal plane.
    #[must_use]
    pub fn from_2d_translation(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// How the robot may move to keep looking at its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LookAtPolicy {
    /// Head and base both turn towards the target.
    HeadAndBase,
    /// Only the head turns; the base is left to the navigation animation.
    HeadOnly,
}

/// One-shot straight-line motion of the base using omnidirectional drive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HolonomicLine {
    /// Forward displacement.
    pub x: f64,
    /// Leftward displacement.
    pub y: f64,
    /// Time to cover the line, in seconds.
    pub duration_s: f64,
}

impl HolonomicLine {
    #[must_use]
    pub fn new(x: f64, y: f64, duration_s: f64) -> Self {
        Self { x, y, duration_s }
    }

    /// Renders the line in the robot's textual animation format.
    ///
    /// # Examples
    ///
    /// ```
    /// use pepper_gamepad::robot::HolonomicLine;
    ///
    /// let line = HolonomicLine::new(-10.0, 0.0, 40.0);
    /// assert_eq!(
    ///     line.to_animation_text(),
    ///     r#"["Holonomic", ["Line", [-10.0, 0.0]], 0.0, 40.0]"#
    /// );
    /// ```
    #[must_use]
    pub fn to_animation_text(&self) -> String {
        format!(
            "[\"Holonomic\", [\"Line\", [{:?}, {:?}]], 0.0, {:?}]",
            self.x, self.y, self.duration_s
        )
    }
}

/// Trait for the robot actuation operations the motion controller relies on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RobotActuationPort: Send + Sync {
    /// Frame the gaze and the navigation target are expressed in.
    async fn gaze_frame(&self) -> Result<FrameHandle>;

    /// Attach a new frame to `base` at `transform`.
    async fn attach_frame(
        &self,
        base: &FrameHandle,
        transform: Transform,
    ) -> Result<AttachedFrameHandle>;

    /// Move an attached frame relative to its base.
    async fn update_attached_frame(
        &self,
        frame: &AttachedFrameHandle,
        transform: Transform,
    ) -> Result<()>;

    /// Build a look-at behaviour tracking `target`.
    async fn build_look_at(&self, target: &AttachedFrameHandle) -> Result<LookAtHandle>;

    /// Change the movement policy of a (possibly running) look-at.
    async fn set_look_at_policy(&self, look_at: &LookAtHandle, policy: LookAtPolicy) -> Result<()>;

    /// Run the look-at until it fails or the future is dropped.
    async fn run_look_at(&self, look_at: &LookAtHandle) -> Result<()>;

    /// Build a holonomic line animation.
    async fn build_holonomic_line(&self, line: HolonomicLine) -> Result<AnimationHandle>;

    /// Run an animation to completion.
    ///
    /// `started` must be fired once the robot actually begins moving.
    async fn run_animation(
        &self,
        animation: &AnimationHandle,
        started: oneshot::Sender<()>,
    ) -> Result<()>;
}

#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::mpsc;

    use crate::error::PepperGamepadError;

    /// A port call as observed by [`RobotProbe`].
    #[derive(Debug)]
    pub enum RobotCall {
        GazeFrame,
        AttachFrame(Transform),
        UpdateAttachedFrame(Transform),
        BuildLookAt,
        SetLookAtPolicy(LookAtPolicy),
        BuildHolonomicLine(HolonomicLine),
        /// The animation stays in flight until `finish` is used or the
        /// controller drops it.
        RunAnimation {
            line: HolonomicLine,
            started: oneshot::Sender<()>,
            finish: oneshot::Sender<Result<()>>,
        },
    }

    /// Port that reports every call to a [`RobotProbe`] and lets the test
    /// decide when animations start and finish.
    pub struct ScriptedRobot {
        calls: mpsc::UnboundedSender<RobotCall>,
        look_at_runs: mpsc::UnboundedSender<()>,
        gaze_gate: Mutex<Option<oneshot::Receiver<()>>>,
        lines: Mutex<HashMap<u64, HolonomicLine>>,
        next_id: AtomicU64,
    }

    /// Test side of a [`ScriptedRobot`].
    pub struct RobotProbe {
        calls: mpsc::UnboundedReceiver<RobotCall>,
        look_at_runs: mpsc::UnboundedReceiver<()>,
        gaze_release: Option<oneshot::Sender<()>>,
    }

    impl ScriptedRobot {
        /// Robot whose frame is available immediately.
        pub fn new() -> (Self, RobotProbe) {
            Self::build(false)
        }

        /// Robot whose frame only becomes available after
        /// [`RobotProbe::release_gaze_frame`].
        pub fn gated() -> (Self, RobotProbe) {
            Self::build(true)
        }

        fn build(gated: bool) -> (Self, RobotProbe) {
            let (calls_tx, calls_rx) = mpsc::unbounded_channel();
            let (runs_tx, runs_rx) = mpsc::unbounded_channel();
            let (gate_tx, gate_rx) = if gated {
                let (tx, rx) = oneshot::channel();
                (Some(tx), Some(rx))
            } else {
                (None, None)
            };

            let robot = Self {
                calls: calls_tx,
                look_at_runs: runs_tx,
                gaze_gate: Mutex::new(gate_rx),
                lines: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            };
            let probe = RobotProbe {
                calls: calls_rx,
                look_at_runs: runs_rx,
                gaze_release: gate_tx,
            };
            (robot, probe)
        }

        fn record(&self, call: RobotCall) {
            let _ = self.calls.send(call);
        }

        fn next_id(&self) -> u64 {
            self.next_id.fetch_add(1, Ordering::Relaxed)
        }
    }

    impl RobotProbe {
        /// Next port call; panics if none arrives.
        pub async fn next_call(&mut self) -> RobotCall {
            tokio::time::timeout(Duration::from_secs(5), self.calls.recv())
                .await
                .expect("timed out waiting for a robot call")
                .expect("robot dropped")
        }

        /// Asserts that the controller settles without calling the port.
        pub async fn assert_no_call(&mut self) {
            if let Ok(Some(call)) =
                tokio::time::timeout(Duration::from_millis(200), self.calls.recv()).await
            {
                panic!("unexpected robot call: {:?}", call);
            }
        }

        /// Waits until a look-at run begins.
        pub async fn next_look_at_run(&mut self) {
            tokio::time::timeout(Duration::from_secs(5), self.look_at_runs.recv())
                .await
                .expect("timed out waiting for look-at to run")
                .expect("robot dropped");
        }

        /// Asserts that no look-at run begins.
        pub async fn assert_no_look_at_run(&mut self) {
            let waited =
                tokio::time::timeout(Duration::from_millis(200), self.look_at_runs.recv()).await;
            assert!(!matches!(waited, Ok(Some(()))), "unexpected look-at run");
        }

        pub fn release_gaze_frame(&mut self) {
            if let Some(gate) = self.gaze_release.take() {
                let _ = gate.send(());
            }
        }

        /// Consumes the three initialization calls.
        pub async fn expect_initialization(&mut self, default_offset: Transform) {
            assert!(matches!(self.next_call().await, RobotCall::GazeFrame));
            match self.next_call().await {
                RobotCall::AttachFrame(t) => assert_eq!(t, default_offset),
                other => panic!("expected AttachFrame, got {:?}", other),
            }
            assert!(matches!(self.next_call().await, RobotCall::BuildLookAt));
        }
    }

    #[async_trait]
    impl RobotActuationPort for ScriptedRobot {
        async fn gaze_frame(&self) -> Result<FrameHandle> {
            self.record(RobotCall::GazeFrame);
            let gate = self.gaze_gate.lock().unwrap().take();
            if let Some(gate) = gate {
                gate.await
                    .map_err(|_| PepperGamepadError::FrameAcquisition("gate dropped".into()))?;
            }
            Ok(FrameHandle(self.next_id()))
        }

        async fn attach_frame(
            &self,
            _base: &FrameHandle,
            transform: Transform,
        ) -> Result<AttachedFrameHandle> {
            self.record(RobotCall::AttachFrame(transform));
            Ok(AttachedFrameHandle(self.next_id()))
        }

        async fn update_attached_frame(
            &self,
            _frame: &AttachedFrameHandle,
            transform: Transform,
        ) -> Result<()> {
            self.record(RobotCall::UpdateAttachedFrame(transform));
            Ok(())
        }

        async fn build_look_at(&self, _target: &AttachedFrameHandle) -> Result<LookAtHandle> {
            self.record(RobotCall::BuildLookAt);
            Ok(LookAtHandle(self.next_id()))
        }

        async fn set_look_at_policy(
            &self,
            _look_at: &LookAtHandle,
            policy: LookAtPolicy,
        ) -> Result<()> {
            self.record(RobotCall::SetLookAtPolicy(policy));
            Ok(())
        }

        async fn run_look_at(&self, _look_at: &LookAtHandle) -> Result<()> {
            let _ = self.look_at_runs.send(());
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn build_holonomic_line(&self, line: HolonomicLine) -> Result<AnimationHandle> {
            self.record(RobotCall::BuildHolonomicLine(line));
            let id = self.next_id();
            self.lines.lock().unwrap().insert(id, line);
            Ok(AnimationHandle(id))
        }

        async fn run_animation(
            &self,
            animation: &AnimationHandle,
            started: oneshot::Sender<()>,
        ) -> Result<()> {
            let line = self
                .lines
                .lock()
                .unwrap()
                .get(&animation.0)
                .copied()
                .ok_or_else(|| PepperGamepadError::Animation("unknown animation".into()))?;
            let (finish_tx, finish_rx) = oneshot::channel();
            self.record(RobotCall::RunAnimation {
                line,
                started,
                finish: finish_tx,
            });
            finish_rx
                .await
                .unwrap_or_else(|_| Err(PepperGamepadError::Animation("finish dropped".into())))
        }
    }
}
