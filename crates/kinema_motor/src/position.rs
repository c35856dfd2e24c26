//! Position state machine.
//!
//! `unknown` until the controller confirms a pose (or an admin forces one), then
//! `standing <-> sitting` only after a position-changing command succeeded.
//! Nothing here is optimistic: a command that was merely sent changes nothing.

use chrono::{DateTime, Utc};
use kinema_core::{Pose, PosePrerequisite, Skill};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// A position-changing command was confirmed by the controller.
    Dispatch,
    /// The controller reported the pose on its own.
    Report,
    /// Administrative override.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PoseTransition {
    pub from: Pose,
    pub to: Pose,
    pub cause: TransitionCause,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrerequisiteCheck {
    pub allowed: bool,
    /// Empty when allowed; otherwise a sentence fit to say out loud.
    pub reason: String,
}

impl PrerequisiteCheck {
    fn allowed() -> Self {
        Self {
            allowed: true,
            reason: String::new(),
        }
    }

    fn refused(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PositionTracker {
    pose: Pose,
    history: VecDeque<PoseTransition>,
    capacity: usize,
}

impl Default for PositionTracker {
    fn default() -> Self {
        Self::new(Pose::Unknown, 16)
    }
}

impl PositionTracker {
    pub fn new(initial: Pose, capacity: usize) -> Self {
        Self {
            pose: initial,
            history: VecDeque::with_capacity(capacity.max(1)),
            capacity: capacity.max(1),
        }
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    /// Most recent transitions, oldest first.
    pub fn history(&self) -> impl Iterator<Item = &PoseTransition> {
        self.history.iter()
    }

    pub fn check_prerequisite(&self, skill: &Skill) -> PrerequisiteCheck {
        self.check_pose(skill.prerequisite, &skill.name)
    }

    pub fn check_pose(&self, prerequisite: PosePrerequisite, what: &str) -> PrerequisiteCheck {
        let required = match prerequisite.required() {
            None => return PrerequisiteCheck::allowed(),
            Some(pose) => pose,
        };
        if self.pose == required {
            return PrerequisiteCheck::allowed();
        }
        let reason = match self.pose {
            Pose::Unknown => format!(
                "I can't {} right now because I'm not sure whether I'm {}.",
                what.replace('_', " "),
                required
            ),
            current => format!(
                "I can't {} while I'm {}. I need to be {} first.",
                what.replace('_', " "),
                current,
                required
            ),
        };
        PrerequisiteCheck::refused(reason)
    }

    /// Record the pose after a successful position-changing dispatch.
    /// Returns whether the pose changed.
    pub fn update(&mut self, new_pose: Pose) -> bool {
        self.transition(new_pose, TransitionCause::Dispatch)
    }

    /// Accept a pose confirmed by the controller.
    pub fn report_pose(&mut self, pose: Pose) -> bool {
        self.transition(pose, TransitionCause::Report)
    }

    /// Administrative override. `Unknown` is allowed here so an operator can
    /// mark the pose as unconfirmed after moving the robot by hand.
    pub fn force_reset(&mut self, pose: Pose) {
        tracing::info!("Position force-reset: {} -> {}", self.pose, pose);
        self.push(pose, TransitionCause::Reset);
    }

    fn transition(&mut self, new_pose: Pose, cause: TransitionCause) -> bool {
        if new_pose == Pose::Unknown {
            tracing::warn!("Ignoring pose update to 'unknown' ({:?})", cause);
            return false;
        }
        if new_pose == self.pose {
            return false;
        }
        tracing::info!("Pose {} -> {} ({:?})", self.pose, new_pose, cause);
        self.push(new_pose, cause);
        true
    }

    fn push(&mut self, to: Pose, cause: TransitionCause) {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(PoseTransition {
            from: self.pose,
            to,
            cause,
            at: Utc::now(),
        });
        self.pose = to;
    }
}
