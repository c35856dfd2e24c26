//! Judgment pipeline: runs the function stack over one event.

use crate::evaluators::default_evaluator;
use crate::function::{FunctionEvaluator, JudgmentContext, ProposedAction};
use kinema_core::config::PersonalityConfig;
use kinema_core::{
    AffectDelta, AffectiveState, CognitiveFunction, FunctionKind, FunctionRole, LenientF32,
    PerceivedEvent, PersonalityProfile, Reinforcement,
};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rationale {
    pub function: FunctionKind,
    pub role: FunctionRole,
    pub text: String,
    pub deferred: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JudgmentResult {
    pub action: Option<ProposedAction>,
    /// Function whose candidate won.
    pub winner: Option<FunctionKind>,
    /// Sum of every function's deltas, each scaled by its effectiveness.
    pub deltas: AffectDelta,
    /// One entry per function, in evaluation order.
    pub rationales: Vec<Rationale>,
}

pub struct JudgmentPipeline {
    functions: Vec<CognitiveFunction>,
    evaluators: BTreeMap<FunctionKind, Box<dyn FunctionEvaluator>>,
    reinforcement_rate: f32,
    greeting_skill: String,
    farewell_skill: String,
}

impl JudgmentPipeline {
    /// Pipeline over `profile` with the built-in evaluator for every function.
    pub fn new(profile: PersonalityProfile) -> Self {
        let functions = profile.into_functions();
        let evaluators = functions
            .iter()
            .map(|f| (f.kind, default_evaluator(f.kind)))
            .collect();
        Self {
            functions,
            evaluators,
            reinforcement_rate: 0.05,
            greeting_skill: "wave".to_string(),
            farewell_skill: "bow".to_string(),
        }
    }

    pub fn from_config(config: &PersonalityConfig, profile: PersonalityProfile) -> Self {
        let mut pipeline = Self::new(profile);
        pipeline.reinforcement_rate = config.reinforcement_rate;
        pipeline.greeting_skill = config.greeting_skill.clone();
        pipeline.farewell_skill = config.farewell_skill.clone();
        pipeline
    }

    /// Replace the evaluator for its function kind.
    pub fn with_evaluator(mut self, evaluator: Box<dyn FunctionEvaluator>) -> Self {
        self.evaluators.insert(evaluator.kind(), evaluator);
        self
    }

    pub fn functions(&self) -> &[CognitiveFunction] {
        &self.functions
    }

    /// Run every function in order. The first non-deferring candidate wins, which
    /// means any conflict resolves toward the dominant function.
    pub fn judge(&self, event: &PerceivedEvent, affect: &AffectiveState) -> JudgmentResult {
        let ctx = JudgmentContext {
            event,
            affect,
            greeting_skill: &self.greeting_skill,
            farewell_skill: &self.farewell_skill,
        };

        let mut result = JudgmentResult {
            action: None,
            winner: None,
            deltas: AffectDelta::new(),
            rationales: Vec::with_capacity(self.functions.len()),
        };

        for function in &self.functions {
            let vote = match self.evaluators.get(&function.kind) {
                Some(evaluator) => evaluator.evaluate(&ctx),
                None => Err(anyhow::anyhow!("no evaluator registered")),
            };
            let vote = match vote {
                Ok(vote) => vote,
                Err(e) => {
                    tracing::warn!("Judgment: {} failed, treating as defer: {}", function.kind, e);
                    result.rationales.push(Rationale {
                        function: function.kind,
                        role: function.role,
                        text: format!("evaluation failed: {}", e),
                        deferred: true,
                    });
                    continue;
                }
            };

            result.deltas.merge_scaled(&vote.deltas, function.effectiveness);
            let deferred = vote.candidate.is_none();
            if result.action.is_none() {
                if let Some(candidate) = vote.candidate {
                    result.action = Some(candidate);
                    result.winner = Some(function.kind);
                }
            }
            result.rationales.push(Rationale {
                function: function.kind,
                role: function.role,
                text: vote.rationale,
                deferred,
            });
        }

        tracing::debug!(
            "Judgment on '{}': winner={:?} action={:?}",
            event.content,
            result.winner,
            result.action
        );
        result
    }

    /// Nudge the effectiveness of the function whose proposal was dispatched.
    pub fn reinforce(&mut self, kind: FunctionKind, outcome: Reinforcement) -> Option<f32> {
        let rate = self.reinforcement_rate;
        let function = self.functions.iter_mut().find(|f| f.kind == kind)?;
        let value = function.reinforce(outcome, rate);
        tracing::debug!("Reinforced {} ({:?}) -> {:.3}", kind, outcome, value);
        Some(value)
    }

    /// Learned effectiveness keyed by function code, for persistence.
    pub fn effectiveness(&self) -> BTreeMap<String, f32> {
        self.functions
            .iter()
            .map(|f| (f.kind.code().to_string(), f.effectiveness))
            .collect()
    }

    /// Restore persisted effectiveness. Unknown codes and malformed values keep
    /// the profile's nominal value.
    pub fn restore_effectiveness(&mut self, saved: &BTreeMap<String, LenientF32>) {
        for function in &mut self.functions {
            match saved.get(function.kind.code()).map(|v| v.value()) {
                Some(Some(v)) => {
                    *function = CognitiveFunction::new(function.kind, function.role, v);
                }
                Some(None) => tracing::warn!(
                    "Persisted effectiveness for {} is malformed, keeping {:.2}",
                    function.kind,
                    function.effectiveness
                ),
                None => {}
            }
        }
    }
}
