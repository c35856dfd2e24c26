//! Immutable views published by the loop for presentation layers.

use crate::function::ProposedAction;
use crate::outbox::PendingSummary;
use crate::pipeline::Rationale;
use kinema_core::{AffectSnapshot, AffectiveState, FunctionKind, LenientF32, Pose, SessionSnapshot};
use kinema_motor::{DispatchRecord, DispatchResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::Running => f.write_str("running"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchSummary {
    pub command: String,
    pub ok: bool,
    pub outcome: &'static str,
    pub detail: String,
}

impl DispatchSummary {
    pub fn new(command: String, result: &DispatchResult) -> Self {
        Self {
            command,
            ok: result.ok,
            outcome: result.outcome.as_str(),
            detail: result.detail.clone(),
        }
    }
}

/// What the loop did with the last event it judged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecisionSummary {
    pub tick: u64,
    pub event: String,
    pub winner: Option<FunctionKind>,
    pub proposal: Option<ProposedAction>,
    /// Why the proposal was replaced by a verbal response, if it was.
    pub substitution: Option<String>,
    pub dispatches: Vec<DispatchSummary>,
    pub rationales: Vec<Rationale>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub session: SessionState,
    pub tick: u64,
    pub affect: AffectiveState,
    pub pose: Pose,
    pub degraded: bool,
    pub effectiveness: BTreeMap<String, f32>,
    pub last_decision: Option<DecisionSummary>,
    pub recent_dispatches: Vec<DispatchRecord>,
    pub outbox: Vec<PendingSummary>,
    pub handled_speech_acts: usize,
}

impl AgentSnapshot {
    pub fn initial(
        affect: AffectiveState,
        pose: Pose,
        effectiveness: BTreeMap<String, f32>,
    ) -> Self {
        Self {
            session: SessionState::Idle,
            tick: 0,
            affect,
            pose,
            degraded: false,
            effectiveness,
            last_decision: None,
            recent_dispatches: Vec::new(),
            outbox: Vec::new(),
            handled_speech_acts: 0,
        }
    }

    /// Plain values for the persistence collaborator.
    pub fn to_session(&self) -> SessionSnapshot {
        SessionSnapshot {
            affect: AffectSnapshot::from_axes(self.affect.axes()),
            pose: self.pose,
            effectiveness: self
                .effectiveness
                .iter()
                .map(|(k, v)| (k.clone(), LenientF32::from(*v)))
                .collect(),
        }
    }

    /// One-line status for terminals.
    pub fn status_line(&self) -> String {
        let mut line = format!(
            "[{} #{}] {} | pose: {}",
            self.session,
            self.tick,
            self.affect.describe(),
            self.pose
        );
        if self.degraded {
            line.push_str(" | actuators degraded");
        }
        if !self.outbox.is_empty() {
            line.push_str(&format!(" | {} pending", self.outbox.len()));
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::{Axis, AxisVector};

    #[test]
    fn test_to_session_carries_affect_pose_and_effectiveness() {
        let mut axes = AxisVector::default();
        axes.set(Axis::Dopamine, 0.8);
        let affect = AffectiveState::derive(axes, &AxisVector::default(), 0.08);
        let mut eff = BTreeMap::new();
        eff.insert("Ne".to_string(), 0.9);

        let snap = AgentSnapshot::initial(affect, Pose::Sitting, eff).to_session();
        assert_eq!(snap.pose, Pose::Sitting);
        assert!((snap.affect.axis(Axis::Dopamine).unwrap() - 0.8).abs() < 1e-6);
        assert_eq!(snap.effectiveness["Ne"].value(), Some(0.9));
    }

    #[test]
    fn test_status_line() {
        let affect = AffectiveState::neutral(&AxisVector::default());
        let mut snap = AgentSnapshot::initial(affect, Pose::Standing, BTreeMap::new());
        assert_eq!(snap.status_line(), "[idle #0] emotionally steady | pose: standing");
        snap.degraded = true;
        assert!(snap.status_line().ends_with("actuators degraded"));
    }

    #[test]
    fn test_snapshot_serializes() {
        let affect = AffectiveState::neutral(&AxisVector::default());
        let snap = AgentSnapshot::initial(affect, Pose::Unknown, BTreeMap::new());
        let json = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["session"], "idle");
        assert_eq!(json["pose"], "unknown");
    }
}
