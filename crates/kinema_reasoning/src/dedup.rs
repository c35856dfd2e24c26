//! Speech-act deduplication.
//!
//! A front end may hand the same utterance to the loop several times (the slot
//! is re-filled, a tick re-reads it). Each distinct speech act is judged once
//! until the tracker is reset by genuinely new input or a session stop.

use kinema_core::PerceivedEvent;
use std::collections::HashSet;
use uuid::Uuid;

/// Stable key over actor, normalised content, intent and the sorted participant set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RespondedKey(Uuid);

impl RespondedKey {
    pub fn from_event(event: &PerceivedEvent) -> Self {
        // BTreeSet iterates sorted, so participant order never matters.
        let participants: Vec<&str> = event.participants.iter().map(|p| p.trim()).collect();
        let material = format!(
            "kinema:speech:{}\u{1f}{}\u{1f}{}\u{1f}{}",
            event.actor.trim().to_lowercase(),
            event.normalized_content(),
            event.detected_intent.as_str(),
            participants.join(",")
        );
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, material.as_bytes()))
    }
}

#[derive(Debug, Default)]
pub struct SpeechActTracker {
    handled: HashSet<RespondedKey>,
}

impl SpeechActTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn already_handled(&self, event: &PerceivedEvent) -> bool {
        self.handled.contains(&RespondedKey::from_event(event))
    }

    pub fn mark_handled(&mut self, event: &PerceivedEvent) {
        self.handled.insert(RespondedKey::from_event(event));
    }

    pub fn reset(&mut self) {
        if !self.handled.is_empty() {
            tracing::debug!("Speech-act tracker cleared ({} keys)", self.handled.len());
        }
        self.handled.clear();
    }

    pub fn len(&self) -> usize {
        self.handled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::Intent;

    #[test]
    fn test_key_ignores_spacing_case_and_participant_order() {
        let a = PerceivedEvent::speech("Ada", "  Hello   There", Intent::Greet)
            .with_participants(["bob", "carol"]);
        let b = PerceivedEvent::speech("ada", "hello there", Intent::Greet)
            .with_participants(["carol", "bob"]);
        assert_eq!(RespondedKey::from_event(&a), RespondedKey::from_event(&b));
    }

    #[test]
    fn test_key_distinguishes_intent_actor_and_participants() {
        let base = PerceivedEvent::speech("Ada", "hello", Intent::Greet);
        let other_intent = PerceivedEvent::speech("Ada", "hello", Intent::Inform);
        let other_actor = PerceivedEvent::speech("Bob", "hello", Intent::Greet);
        let with_people = base.clone().with_participants(["carol"]);

        let key = RespondedKey::from_event(&base);
        assert_ne!(key, RespondedKey::from_event(&other_intent));
        assert_ne!(key, RespondedKey::from_event(&other_actor));
        assert_ne!(key, RespondedKey::from_event(&with_people));
    }

    #[test]
    fn test_mark_and_reset() {
        let mut tracker = SpeechActTracker::new();
        let event = PerceivedEvent::speech("Ada", "hello", Intent::Greet);
        assert!(!tracker.already_handled(&event));
        tracker.mark_handled(&event);
        tracker.mark_handled(&event);
        assert!(tracker.already_handled(&event));
        assert_eq!(tracker.len(), 1);

        tracker.reset();
        assert!(tracker.is_empty());
        assert!(!tracker.already_handled(&event));
    }

    #[test]
    fn test_timestamp_does_not_matter() {
        let a = PerceivedEvent::speech("Ada", "hello", Intent::Greet);
        let mut b = a.clone();
        b.timestamp = b.timestamp + chrono::Duration::seconds(30);
        assert_eq!(RespondedKey::from_event(&a), RespondedKey::from_event(&b));
    }
}
