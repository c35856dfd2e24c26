pub mod cognitive_loop;
pub mod dedup;
pub mod evaluators;
pub mod function;
pub mod health;
pub mod outbox;
pub mod perception;
pub mod pipeline;
pub mod snapshot;

pub use cognitive_loop::{AdminCommand, CognitiveLoop, LoopHandle};
pub use dedup::{RespondedKey, SpeechActTracker};
pub use function::{FunctionEvaluator, FunctionVote, JudgmentContext, ProposedAction};
pub use perception::PerceptionSlot;
pub use pipeline::{JudgmentPipeline, JudgmentResult, Rationale};
pub use snapshot::{AgentSnapshot, DecisionSummary, DispatchSummary, SessionState};
