pub mod affect;
pub mod config;
pub mod event;
pub mod persona;
pub mod skill;
pub mod state;

pub use affect::{AffectDelta, AffectiveState, Axis, AxisVector, Emotion, AXIS_COUNT};
pub use config::KinemaConfig;
pub use event::{EventSource, Intent, PerceivedEvent};
pub use persona::{
    CognitiveFunction, FunctionKind, FunctionRole, FunctionWeights, PersonalityProfile,
    ProfileError, Reinforcement,
};
pub use skill::{ControllerCommand, Pose, PosePrerequisite, Skill, SkillRegistry};
pub use state::{AffectSnapshot, LenientF32, SessionSnapshot};
