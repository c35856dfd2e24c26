//! Perceived events: the structured stimulus handed over by perception front ends.
//!
//! Front ends (speech capture, image captioning, the agent's own thoughts) are
//! responsible for turning raw input into a `PerceivedEvent`. Intent detection and
//! skill resolution happen there too; the core only reads the resolved values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Where a stimulus came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    Speech,
    Vision,
    SelfGenerated,
}

impl fmt::Display for EventSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventSource::Speech => "speech",
            EventSource::Vision => "vision",
            EventSource::SelfGenerated => "self_generated",
        };
        f.write_str(s)
    }
}

/// Categorical intent as detected by the (external) language front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Inform,
    Query,
    Command,
    Greet,
    Farewell,
    Praise,
    Insult,
    #[serde(other)]
    Unknown,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Inform => "inform",
            Intent::Query => "query",
            Intent::Command => "command",
            Intent::Greet => "greet",
            Intent::Farewell => "farewell",
            Intent::Praise => "praise",
            Intent::Insult => "insult",
            Intent::Unknown => "unknown",
        }
    }

    /// Parse a front-end intent label. Unrecognised labels map to `Unknown`.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "inform" | "statement" => Intent::Inform,
            "query" | "question" => Intent::Query,
            "command" | "request" => Intent::Command,
            "greet" | "greeting" => Intent::Greet,
            "farewell" | "goodbye" => Intent::Farewell,
            "praise" | "compliment" => Intent::Praise,
            "insult" => Intent::Insult,
            _ => Intent::Unknown,
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of stimulus.
///
/// Owned by the cognitive loop for its whole lifetime. Judgment functions only ever
/// see `&PerceivedEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceivedEvent {
    pub source: EventSource,
    /// Who or what produced the stimulus ("alice", "camera", "self").
    pub actor: String,
    /// Free-text description: the utterance, or a caption for vision events.
    pub content: String,
    pub detected_intent: Intent,
    #[serde(default)]
    pub participants: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
    /// Skill name already resolved by the external intent matcher, if any.
    #[serde(default)]
    pub requested_skill: Option<String>,
}

impl PerceivedEvent {
    pub fn new(source: EventSource, actor: &str, content: &str, intent: Intent) -> Self {
        Self {
            source,
            actor: actor.to_string(),
            content: content.to_string(),
            detected_intent: intent,
            participants: BTreeSet::new(),
            timestamp: Utc::now(),
            requested_skill: None,
        }
    }

    pub fn speech(actor: &str, content: &str, intent: Intent) -> Self {
        Self::new(EventSource::Speech, actor, content, intent)
    }

    pub fn vision(content: &str) -> Self {
        Self::new(EventSource::Vision, "camera", content, Intent::Inform)
    }

    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants = participants.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_skill(mut self, skill: &str) -> Self {
        self.requested_skill = Some(skill.to_string());
        self
    }

    pub fn is_speech(&self) -> bool {
        self.source == EventSource::Speech
    }

    /// Content with surrounding whitespace trimmed, inner runs collapsed and
    /// lowercased. Two utterances that differ only in spacing or case normalise
    /// to the same text.
    pub fn normalized_content(&self) -> String {
        self.content
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}
