//! Skills, poses and controller commands.
//!
//! A skill is a named capability the robot can perform. Keyword matching from
//! utterances to skills happens in the (external) resolver; the core only looks
//! skills up by their resolved name.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Controller module that turns text into speech.
pub const SPEECH_MODULE: &str = "speech";

/// Physical pose of the robot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pose {
    Standing,
    Sitting,
    #[default]
    #[serde(other)]
    Unknown,
}

impl Pose {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pose::Standing => "standing",
            Pose::Sitting => "sitting",
            Pose::Unknown => "unknown",
        }
    }

    /// Parse a pose label. Returns `None` for anything that is not a known pose.
    pub fn parse(label: &str) -> Option<Pose> {
        match label.trim().to_ascii_lowercase().as_str() {
            "standing" | "stand" => Some(Pose::Standing),
            "sitting" | "sit" => Some(Pose::Sitting),
            "unknown" => Some(Pose::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pose a skill needs before it may run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PosePrerequisite {
    #[default]
    Any,
    Standing,
    Sitting,
}

impl PosePrerequisite {
    pub fn required(&self) -> Option<Pose> {
        match self {
            PosePrerequisite::Any => None,
            PosePrerequisite::Standing => Some(Pose::Standing),
            PosePrerequisite::Sitting => Some(Pose::Sitting),
        }
    }
}

/// `(target_module, command_name[, argument])` as understood by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControllerCommand {
    pub module: String,
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argument: Option<String>,
}

impl ControllerCommand {
    pub fn new(module: &str, command: &str) -> Self {
        Self {
            module: module.to_string(),
            command: command.to_string(),
            argument: None,
        }
    }

    pub fn with_argument(mut self, argument: &str) -> Self {
        self.argument = Some(argument.to_string());
        self
    }

    /// A verbal utterance.
    pub fn speech(text: &str) -> Self {
        Self::new(SPEECH_MODULE, "say").with_argument(text)
    }

    pub fn is_speech(&self) -> bool {
        self.module == SPEECH_MODULE
    }

    /// Command name plus argument, the part compared for deduplication.
    pub fn payload(&self) -> String {
        match &self.argument {
            Some(arg) => format!("{}:{}", self.command, arg),
            None => self.command.clone(),
        }
    }
}

impl fmt::Display for ControllerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.argument {
            Some(arg) => write!(f, "{}/{}({})", self.module, self.command, arg),
            None => write!(f, "{}/{}", self.module, self.command),
        }
    }
}

/// A named capability request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skill {
    pub name: String,
    #[serde(default)]
    pub prerequisite: PosePrerequisite,
    pub command: ControllerCommand,
    /// Triggers for the external intent matcher. Never read by the core.
    #[serde(default)]
    pub activation_keywords: Vec<String>,
    /// Pose the robot ends up in when the command succeeds.
    #[serde(default)]
    pub resulting_pose: Option<Pose>,
    /// Position and safety commands travel in the critical lane.
    #[serde(default)]
    pub critical: bool,
}

impl Skill {
    pub fn new(name: &str, prerequisite: PosePrerequisite, command: ControllerCommand) -> Self {
        Self {
            name: name.to_string(),
            prerequisite,
            command,
            activation_keywords: Vec::new(),
            resulting_pose: None,
            critical: false,
        }
    }

    pub fn with_keywords(mut self, keywords: &[&str]) -> Self {
        self.activation_keywords = keywords.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Mark as position-changing. Position commands are always critical.
    pub fn changes_pose_to(mut self, pose: Pose) -> Self {
        self.resulting_pose = Some(pose);
        self.critical = true;
        self
    }

    pub fn is_position_changing(&self) -> bool {
        self.resulting_pose.is_some()
    }
}

/// Lookup table from resolved skill name to skill definition.
#[derive(Debug, Clone, Default)]
pub struct SkillRegistry {
    skills: BTreeMap<String, Skill>,
}

impl SkillRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_skills(skills: Vec<Skill>) -> Self {
        let mut registry = Self::new();
        for skill in skills {
            registry.insert(skill);
        }
        registry
    }

    /// Built-in table used when the configuration lists no skills.
    pub fn with_defaults() -> Self {
        Self::from_skills(default_skills())
    }

    /// Insert or replace a skill. Names are case-insensitive.
    pub fn insert(&mut self, skill: Skill) {
        let key = skill.name.to_ascii_lowercase();
        if self.skills.insert(key, skill).is_some() {
            tracing::debug!("SkillRegistry: replaced an existing skill definition");
        }
    }

    pub fn get(&self, name: &str) -> Option<&Skill> {
        self.skills.get(&name.trim().to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.skills.len()
    }

    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.skills.values().map(|s| s.name.as_str())
    }
}

pub fn default_skills() -> Vec<Skill> {
    vec![
        Skill::new(
            "wave",
            PosePrerequisite::Standing,
            ControllerCommand::new("motion", "play").with_argument("wave"),
        )
        .with_keywords(&["wave", "hi", "hello"]),
        Skill::new(
            "nod",
            PosePrerequisite::Any,
            ControllerCommand::new("head", "nod"),
        )
        .with_keywords(&["nod", "yes"]),
        Skill::new(
            "bow",
            PosePrerequisite::Standing,
            ControllerCommand::new("motion", "play").with_argument("bow"),
        )
        .with_keywords(&["bow", "goodbye"]),
        Skill::new(
            "dance",
            PosePrerequisite::Standing,
            ControllerCommand::new("motion", "play").with_argument("dance"),
        )
        .with_keywords(&["dance"]),
        Skill::new(
            "shake_hand",
            PosePrerequisite::Sitting,
            ControllerCommand::new("motion", "play").with_argument("shake_hand"),
        )
        .with_keywords(&["paw", "shake"]),
        Skill::new(
            "sit_down",
            PosePrerequisite::Standing,
            ControllerCommand::new("posture", "sit"),
        )
        .with_keywords(&["sit"])
        .changes_pose_to(Pose::Sitting),
        Skill::new(
            "stand_up",
            PosePrerequisite::Any,
            ControllerCommand::new("posture", "stand"),
        )
        .with_keywords(&["stand", "get up"])
        .changes_pose_to(Pose::Standing),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pose_parse() {
        assert_eq!(Pose::parse("Standing"), Some(Pose::Standing));
        assert_eq!(Pose::parse("sit"), Some(Pose::Sitting));
        assert_eq!(Pose::parse("floating"), None);
    }

    #[test]
    fn test_prerequisite_required() {
        assert_eq!(PosePrerequisite::Any.required(), None);
        assert_eq!(PosePrerequisite::Sitting.required(), Some(Pose::Sitting));
    }

    #[test]
    fn test_command_payload_and_display() {
        let cmd = ControllerCommand::new("motion", "play").with_argument("wave");
        assert_eq!(cmd.payload(), "play:wave");
        assert_eq!(cmd.to_string(), "motion/play(wave)");
        assert_eq!(ControllerCommand::new("head", "nod").payload(), "nod");
        assert!(ControllerCommand::speech("hi").is_speech());
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = SkillRegistry::with_defaults();
        assert!(registry.get("WAVE").is_some());
        assert!(registry.get(" sit_down ").is_some());
        assert!(registry.get("backflip").is_none());
    }

    #[test]
    fn test_default_position_skills_are_critical() {
        let registry = SkillRegistry::with_defaults();
        let sit = registry.get("sit_down").unwrap();
        assert!(sit.critical);
        assert_eq!(sit.resulting_pose, Some(Pose::Sitting));
        let wave = registry.get("wave").unwrap();
        assert!(!wave.critical);
        assert!(!wave.is_position_changing());
    }

    #[test]
    fn test_skill_from_toml() {
        let toml_str = r#"
name = "roll_over"
prerequisite = "sitting"
activation_keywords = ["roll"]
[command]
module = "motion"
command = "play"
argument = "roll"
"#;
        let skill: Skill = toml::from_str(toml_str).unwrap();
        assert_eq!(skill.prerequisite, PosePrerequisite::Sitting);
        assert_eq!(skill.command.argument.as_deref(), Some("roll"));
        assert!(!skill.critical);
    }
}
