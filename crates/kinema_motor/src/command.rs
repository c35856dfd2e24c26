//! Command requests and dispatch results.

use chrono::{DateTime, Utc};
use kinema_core::{ControllerCommand, Pose, Skill};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandClass {
    /// Gestures and speech. Dropped when the controller is still cooling down.
    General,
    /// Position and safety commands. Never dropped for rate limiting.
    Critical,
}

impl fmt::Display for CommandClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandClass::General => f.write_str("general"),
            CommandClass::Critical => f.write_str("critical"),
        }
    }
}

/// One outbound command with its dispatch metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandRequest {
    pub class: CommandClass,
    pub command: ControllerCommand,
    pub issued_at: DateTime<Utc>,
    /// Pose the robot is in once this command succeeds.
    pub resulting_pose: Option<Pose>,
    /// Pose the robot must be in for this command to be sent at all.
    pub required_pose: Option<Pose>,
}

impl CommandRequest {
    pub fn new(class: CommandClass, command: ControllerCommand) -> Self {
        Self {
            class,
            command,
            issued_at: Utc::now(),
            resulting_pose: None,
            required_pose: None,
        }
    }

    pub fn general(command: ControllerCommand) -> Self {
        Self::new(CommandClass::General, command)
    }

    pub fn critical(command: ControllerCommand) -> Self {
        Self::new(CommandClass::Critical, command)
    }

    /// A verbal utterance on the general lane.
    pub fn speech(text: &str) -> Self {
        Self::general(ControllerCommand::speech(text))
    }

    /// Request carrying a skill's command, lane, prerequisite and pose effect.
    pub fn from_skill(skill: &Skill) -> Self {
        let class = if skill.critical || skill.is_position_changing() {
            CommandClass::Critical
        } else {
            CommandClass::General
        };
        Self {
            resulting_pose: skill.resulting_pose,
            required_pose: skill.prerequisite.required(),
            ..Self::new(class, skill.command.clone())
        }
    }

    pub fn is_critical(&self) -> bool {
        self.class == CommandClass::Critical
    }

    /// Controller module this command targets.
    pub fn target(&self) -> &str {
        &self.command.module
    }

    pub fn payload(&self) -> String {
        self.command.payload()
    }

    /// Verbal commands carry no physical risk and don't count toward actuator health.
    pub fn is_physical(&self) -> bool {
        !self.command.is_speech()
    }
}

impl fmt::Display for CommandRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.class, self.command)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// Controller accepted the command.
    Sent,
    /// Identical request inside the dedup window; nothing sent.
    Duplicate,
    /// General lane still cooling down; nothing sent.
    RateLimited { retry_after_ms: u64 },
    /// Pose no longer matched the command's prerequisite at dispatch time.
    PrerequisiteFailed,
    /// Transport error, bad status or timeout on every attempt.
    Failed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Sent => "sent",
            DispatchOutcome::Duplicate => "duplicate",
            DispatchOutcome::RateLimited { .. } => "rate_limited",
            DispatchOutcome::PrerequisiteFailed => "prerequisite_failed",
            DispatchOutcome::Failed => "failed",
        }
    }

    pub fn rate_limited(retry_after: Duration) -> Self {
        DispatchOutcome::RateLimited {
            retry_after_ms: retry_after.as_millis().min(u64::MAX as u128) as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    pub ok: bool,
    pub outcome: DispatchOutcome,
    pub detail: String,
    /// Controller calls made for this request (0 when nothing was sent).
    pub attempts: u32,
    /// Pose recorded after a successful position-changing dispatch.
    pub pose_after: Option<Pose>,
}

impl DispatchResult {
    pub fn sent(detail: impl Into<String>, attempts: u32, pose_after: Option<Pose>) -> Self {
        Self {
            ok: true,
            outcome: DispatchOutcome::Sent,
            detail: detail.into(),
            attempts,
            pose_after,
        }
    }

    pub fn rejected(outcome: DispatchOutcome, detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            outcome,
            detail: detail.into(),
            attempts: 0,
            pose_after: None,
        }
    }

    pub fn failed(detail: impl Into<String>, attempts: u32) -> Self {
        Self {
            ok: false,
            outcome: DispatchOutcome::Failed,
            detail: detail.into(),
            attempts,
            pose_after: None,
        }
    }

    /// True when the controller was actually called and never succeeded.
    pub fn is_failure(&self) -> bool {
        self.outcome == DispatchOutcome::Failed
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::RateLimited { .. })
    }
}

/// Entry in the bounded dispatch log exposed to presentation layers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchRecord {
    pub at: DateTime<Utc>,
    pub class: CommandClass,
    pub command: String,
    pub outcome: &'static str,
    pub detail: String,
}

impl DispatchRecord {
    pub fn new(request: &CommandRequest, result: &DispatchResult) -> Self {
        Self {
            at: Utc::now(),
            class: request.class,
            command: request.command.to_string(),
            outcome: result.outcome.as_str(),
            detail: result.detail.clone(),
        }
    }
}
