use kinema_core::{AffectDelta, AffectiveState, FunctionKind, PerceivedEvent};
use serde::Serialize;
use std::fmt;

// ============================================================================
// Proposals and votes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposedAction {
    /// Perform a named skill, optionally saying something alongside it.
    Skill {
        name: String,
        utterance: Option<String>,
    },
    /// Verbal-only response.
    Speak { text: String },
}

impl ProposedAction {
    pub fn skill(name: &str) -> Self {
        ProposedAction::Skill {
            name: name.to_string(),
            utterance: None,
        }
    }

    pub fn skill_saying(name: &str, utterance: impl Into<String>) -> Self {
        ProposedAction::Skill {
            name: name.to_string(),
            utterance: Some(utterance.into()),
        }
    }

    pub fn speak(text: impl Into<String>) -> Self {
        ProposedAction::Speak { text: text.into() }
    }
}

impl fmt::Display for ProposedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProposedAction::Skill {
                name,
                utterance: Some(u),
            } => write!(f, "skill '{}' saying \"{}\"", name, u),
            ProposedAction::Skill { name, .. } => write!(f, "skill '{}'", name),
            ProposedAction::Speak { text } => write!(f, "say \"{}\"", text),
        }
    }
}

/// What one function thinks about an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunctionVote {
    /// `None` means defer to the next function.
    pub candidate: Option<ProposedAction>,
    /// Raw deltas, before effectiveness scaling.
    pub deltas: AffectDelta,
    pub rationale: String,
}

impl FunctionVote {
    pub fn defer(rationale: impl Into<String>) -> Self {
        Self {
            candidate: None,
            deltas: AffectDelta::new(),
            rationale: rationale.into(),
        }
    }

    pub fn propose(action: ProposedAction, rationale: impl Into<String>) -> Self {
        Self {
            candidate: Some(action),
            deltas: AffectDelta::new(),
            rationale: rationale.into(),
        }
    }

    pub fn with_deltas(mut self, deltas: AffectDelta) -> Self {
        self.deltas = deltas;
        self
    }
}

/// Read-only inputs every function sees.
pub struct JudgmentContext<'a> {
    pub event: &'a PerceivedEvent,
    pub affect: &'a AffectiveState,
    pub greeting_skill: &'a str,
    pub farewell_skill: &'a str,
}

// ============================================================================
// FunctionEvaluator trait
// ============================================================================

pub trait FunctionEvaluator: Send + Sync {
    /// Judge the event. An error counts as a deferral.
    fn evaluate(&self, ctx: &JudgmentContext<'_>) -> anyhow::Result<FunctionVote>;

    /// Which attitude-qualified function this evaluator implements.
    fn kind(&self) -> FunctionKind;
}
