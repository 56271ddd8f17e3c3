//! # Telemetry Module
//!
//! Journals the commands sent to the robot.
//!
//! This module handles:
//! - Formatting commands as JSONL (JSON Lines)
//! - Writing to rotating log files
//! - Decorating any [`RobotActuationPort`] so every command is recorded

pub mod journal;

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::sync::oneshot;
use tracing::warn;

use crate::error::Result;
use crate::robot::{
    AnimationHandle, AttachedFrameHandle, FrameHandle, HolonomicLine, LookAtHandle, LookAtPolicy,
    RobotActuationPort, Transform,
};
use journal::{CommandJournal, RobotCommand};

/// Port decorator that journals each command before forwarding it.
///
/// Journal failures are logged and never block the robot.
#[derive(Debug)]
pub struct JournaledPort<P> {
    inner: P,
    journal: Mutex<CommandJournal>,
}

impl<P: RobotActuationPort> JournaledPort<P> {
    #[must_use]
    pub fn new(inner: P, journal: CommandJournal) -> Self {
        Self {
            inner,
            journal: Mutex::new(journal),
        }
    }

    /// The wrapped port.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    fn record(&self, command: RobotCommand) {
        let mut journal = self.journal.lock().unwrap_or_else(|e| e.into_inner());
        if let Err(e) = journal.record(&command) {
            warn!("Failed to journal {:?}: {}", command, e);
        }
    }
}

#[async_trait]
impl<P: RobotActuationPort> RobotActuationPort for JournaledPort<P> {
    async fn gaze_frame(&self) -> Result<FrameHandle> {
        self.inner.gaze_frame().await
    }

    async fn attach_frame(
        &self,
        base: &FrameHandle,
        transform: Transform,
    ) -> Result<AttachedFrameHandle> {
        self.record(RobotCommand::AttachFrame {
            base: *base,
            transform,
        });
        self.inner.attach_frame(base, transform).await
    }

    async fn update_attached_frame(
        &self,
        frame: &AttachedFrameHandle,
        transform: Transform,
    ) -> Result<()> {
        self.record(RobotCommand::UpdateAttachedFrame {
            frame: *frame,
            transform,
        });
        self.inner.update_attached_frame(frame, transform).await
    }

    async fn build_look_at(&self, target: &AttachedFrameHandle) -> Result<LookAtHandle> {
        self.record(RobotCommand::BuildLookAt { target: *target });
        self.inner.build_look_at(target).await
    }

    async fn set_look_at_policy(&self, look_at: &LookAtHandle, policy: LookAtPolicy) -> Result<()> {
        self.record(RobotCommand::SetLookAtPolicy {
            look_at: *look_at,
            policy,
        });
        self.inner.set_look_at_policy(look_at, policy).await
    }

    async fn run_look_at(&self, look_at: &LookAtHandle) -> Result<()> {
        self.record(RobotCommand::RunLookAt { look_at: *look_at });
        self.inner.run_look_at(look_at).await
    }

    async fn build_holonomic_line(&self, line: HolonomicLine) -> Result<AnimationHandle> {
        self.record(RobotCommand::BuildHolonomicLine { line });
        self.inner.build_holonomic_line(line).await
    }

    async fn run_animation(
        &self,
        animation: &AnimationHandle,
        started: oneshot::Sender<()>,
    ) -> Result<()> {
        self.record(RobotCommand::RunAnimation {
            animation: *animation,
        });
        self.inner.run_animation(animation, started).await
    }
}
