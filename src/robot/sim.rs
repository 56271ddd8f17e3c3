//! Simulated robot.
//!
//! Implements [`RobotActuationPort`] without hardware: handles are sequential
//! ids, the attached frame and look-at policy are kept in memory, and
//! animations take as long as the line they describe.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::{debug, info};

use super::{
    AnimationHandle, AttachedFrameHandle, FrameHandle, HolonomicLine, LookAtHandle, LookAtPolicy,
    RobotActuationPort, Transform,
};
use crate::error::{PepperGamepadError, Result};

/// Frame id of the robot base.
const ROBOT_FRAME: FrameHandle = FrameHandle(0);

#[derive(Debug, Default)]
struct SimState {
    attached: HashMap<u64, Transform>,
    policies: HashMap<u64, LookAtPolicy>,
    animations: HashMap<u64, HolonomicLine>,
    completed_animations: u64,
}

/// In-memory robot used when no real robot backend is configured.
#[derive(Debug)]
pub struct SimulatedRobot {
    start_delay: Duration,
    next_id: AtomicU64,
    state: Mutex<SimState>,
}

impl SimulatedRobot {
    /// Creates a simulated robot.
    ///
    /// # Arguments
    ///
    /// * `start_delay` - Time between `run_animation` and the robot starting to move
    #[must_use]
    pub fn new(start_delay: Duration) -> Self {
        Self {
            start_delay,
            next_id: AtomicU64::new(1),
            state: Mutex::new(SimState::default()),
        }
    }

    /// Current transform of an attached frame.
    #[must_use]
    pub fn attached_transform(&self, frame: &AttachedFrameHandle) -> Option<Transform> {
        self.lock().attached.get(&frame.0).copied()
    }

    /// Current policy of a look-at.
    #[must_use]
    pub fn look_at_policy(&self, look_at: &LookAtHandle) -> Option<LookAtPolicy> {
        self.lock().policies.get(&look_at.0).copied()
    }

    /// Number of animations that ran to completion.
    #[must_use]
    pub fn completed_animations(&self) -> u64 {
        self.lock().completed_animations
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        // A poisoned lock only means a panicking test; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl RobotActuationPort for SimulatedRobot {
    async fn gaze_frame(&self) -> Result<FrameHandle> {
        Ok(ROBOT_FRAME)
    }

    async fn attach_frame(
        &self,
        base: &FrameHandle,
        transform: Transform,
    ) -> Result<AttachedFrameHandle> {
        if *base != ROBOT_FRAME {
            return Err(PepperGamepadError::FrameAcquisition(format!(
                "unknown base frame {}",
                base.0
            )));
        }
        let id = self.next_id();
        self.lock().attached.insert(id, transform);
        info!("[sim] Attached frame {} at ({:.1}, {:.1})", id, transform.x, transform.y);
        Ok(AttachedFrameHandle(id))
    }

    async fn update_attached_frame(
        &self,
        frame: &AttachedFrameHandle,
        transform: Transform,
    ) -> Result<()> {
        let mut state = self.lock();
        match state.attached.get_mut(&frame.0) {
            Some(current) => {
                *current = transform;
                info!("[sim] Gaze target moved to ({:.1}, {:.1})", transform.x, transform.y);
                Ok(())
            }
            None => Err(PepperGamepadError::FrameAcquisition(format!(
                "unknown attached frame {}",
                frame.0
            ))),
        }
    }

    async fn build_look_at(&self, target: &AttachedFrameHandle) -> Result<LookAtHandle> {
        let mut state = self.lock();
        if !state.attached.contains_key(&target.0) {
            return Err(PepperGamepadError::LookAt(format!(
                "unknown attached frame {}",
                target.0
            )));
        }
        let id = self.next_id();
        state.policies.insert(id, LookAtPolicy::HeadAndBase);
        Ok(LookAtHandle(id))
    }

    async fn set_look_at_policy(&self, look_at: &LookAtHandle, policy: LookAtPolicy) -> Result<()> {
        match self.lock().policies.get_mut(&look_at.0) {
            Some(current) => {
                *current = policy;
                debug!("[sim] LookAt {} policy {:?}", look_at.0, policy);
                Ok(())
            }
            None => Err(PepperGamepadError::LookAt(format!("unknown look-at {}", look_at.0))),
        }
    }

    async fn run_look_at(&self, look_at: &LookAtHandle) -> Result<()> {
        if !self.lock().policies.contains_key(&look_at.0) {
            return Err(PepperGamepadError::LookAt(format!("unknown look-at {}", look_at.0)));
        }
        info!("[sim] LookAt {} running", look_at.0);
        // Runs until cancelled, like the real behaviour.
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn build_holonomic_line(&self, line: HolonomicLine) -> Result<AnimationHandle> {
        if !line.duration_s.is_finite() || line.duration_s <= 0.0 {
            return Err(PepperGamepadError::Animation(format!(
                "invalid duration {}",
                line.duration_s
            )));
        }
        let id = self.next_id();
        self.lock().animations.insert(id, line);
        debug!("[sim] Built animation {}: {}", id, line.to_animation_text());
        Ok(AnimationHandle(id))
    }

    async fn run_animation(
        &self,
        animation: &AnimationHandle,
        started: oneshot::Sender<()>,
    ) -> Result<()> {
        let line = self
            .lock()
            .animations
            .remove(&animation.0)
            .ok_or_else(|| {
                PepperGamepadError::Animation(format!("unknown animation {}", animation.0))
            })?;

        tokio::time::sleep(self.start_delay).await;
        info!("[sim] Moving along ({:.1}, {:.1})", line.x, line.y);
        let _ = started.send(());

        tokio::time::sleep(Duration::from_secs_f64(line.duration_s)).await;
        self.lock().completed_animations += 1;
        Ok(())
    }
}
