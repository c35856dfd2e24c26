//! Terminal front end: slash commands for the operator, anything else is heard
//! as speech.
//!
//! Intent detection and skill matching live here, outside the core, as a
//! keyword matcher over the registry's activation keywords.

use kinema_core::{Intent, PerceivedEvent, Pose, SkillRegistry};
use kinema_reasoning::AdminCommand;

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    Empty,
    Help,
    Status,
    Quit,
    Admin(AdminCommand),
    Perceive(PerceivedEvent),
    Invalid(String),
}

pub const HELP: &str = "\
Commands:
  /start              resume the session
  /stop               pause the session and forget handled speech acts
  /reset <pose>       force the tracked pose (standing, sitting, unknown)
  /pose <pose>        report a pose confirmed by the controller
  /see <description>  describe something the camera sees
  /status             show the current state
  /help               show this help
  /quit               save and exit
Anything else is heard as speech.";

pub fn parse_line(line: &str, actor: &str, skills: &SkillRegistry) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Input::Perceive(hear(line, actor, skills));
    };

    let (command, argument) = match rest.split_once(char::is_whitespace) {
        Some((c, a)) => (c, a.trim()),
        None => (rest, ""),
    };
    match command.to_ascii_lowercase().as_str() {
        "start" => Input::Admin(AdminCommand::Start),
        "stop" => Input::Admin(AdminCommand::Stop),
        "reset" => match Pose::parse(argument) {
            Some(pose) => Input::Admin(AdminCommand::ForcePositionReset(pose)),
            None => Input::Invalid(format!("unknown pose '{}'", argument)),
        },
        "pose" => match Pose::parse(argument) {
            Some(Pose::Unknown) | None => {
                Input::Invalid(format!("'{}' is not a pose the controller can confirm", argument))
            }
            Some(pose) => Input::Admin(AdminCommand::ReportPose(pose)),
        },
        "see" if !argument.is_empty() => Input::Perceive(PerceivedEvent::vision(argument)),
        "see" => Input::Invalid("/see needs a description".to_string()),
        "status" => Input::Status,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Invalid(format!("unknown command '/{}'", other)),
    }
}

/// Build a speech event, resolving intent and requested skill.
pub fn hear(text: &str, actor: &str, skills: &SkillRegistry) -> PerceivedEvent {
    let words = normalize(text);
    let intent = classify(&words, text.trim_end().ends_with('?'));
    let mut event = PerceivedEvent::speech(actor, text, intent);

    // Greetings and farewells pick their own gesture.
    if !matches!(intent, Intent::Greet | Intent::Farewell) {
        if let Some(skill) = match_skill(&words, skills) {
            event.detected_intent = Intent::Command;
            event = event.with_skill(&skill);
        }
    }
    event
}

fn normalize(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    format!(" {} ", cleaned.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn contains_phrase(words: &str, phrase: &str) -> bool {
    words.contains(&format!(" {} ", phrase))
}

fn classify(words: &str, question_mark: bool) -> Intent {
    let any = |phrases: &[&str]| phrases.iter().any(|p| contains_phrase(words, p));

    if any(&["hello", "hi", "hey", "good morning", "good evening"]) {
        Intent::Greet
    } else if any(&["bye", "goodbye", "see you", "good night"]) {
        Intent::Farewell
    } else if any(&["thank you", "thanks", "good job", "well done", "great job"]) {
        Intent::Praise
    } else if any(&["stupid", "idiot", "useless", "hate you", "shut up"]) {
        Intent::Insult
    } else if question_mark || any(&["what", "why", "how", "who", "where", "when"]) {
        Intent::Query
    } else {
        Intent::Inform
    }
}

fn match_skill(words: &str, skills: &SkillRegistry) -> Option<String> {
    skills.names().find_map(|name| {
        let skill = skills.get(name)?;
        skill
            .activation_keywords
            .iter()
            .any(|k| contains_phrase(words, &k.to_lowercase()))
            .then(|| skill.name.clone())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::EventSource;

    fn skills() -> SkillRegistry {
        SkillRegistry::with_defaults()
    }

    fn heard(line: &str) -> PerceivedEvent {
        match parse_line(line, "ada", &skills()) {
            Input::Perceive(event) => event,
            other => panic!("expected speech, got {:?}", other),
        }
    }

    #[test]
    fn test_admin_commands() {
        let s = skills();
        assert_eq!(parse_line("/stop", "ada", &s), Input::Admin(AdminCommand::Stop));
        assert_eq!(parse_line("  /START ", "ada", &s), Input::Admin(AdminCommand::Start));
        assert_eq!(
            parse_line("/reset sitting", "ada", &s),
            Input::Admin(AdminCommand::ForcePositionReset(Pose::Sitting))
        );
        assert_eq!(
            parse_line("/pose stand", "ada", &s),
            Input::Admin(AdminCommand::ReportPose(Pose::Standing))
        );
        assert_eq!(parse_line("/quit", "ada", &s), Input::Quit);
        assert_eq!(parse_line("", "ada", &s), Input::Empty);
    }

    #[test]
    fn test_invalid_commands() {
        let s = skills();
        assert!(matches!(parse_line("/reset floating", "ada", &s), Input::Invalid(_)));
        assert!(matches!(parse_line("/pose unknown", "ada", &s), Input::Invalid(_)));
        assert!(matches!(parse_line("/see", "ada", &s), Input::Invalid(_)));
        assert!(matches!(parse_line("/fly", "ada", &s), Input::Invalid(_)));
    }

    #[test]
    fn test_see_is_vision() {
        match parse_line("/see a red ball", "ada", &skills()) {
            Input::Perceive(event) => {
                assert_eq!(event.source, EventSource::Vision);
                assert_eq!(event.content, "a red ball");
            }
            other => panic!("expected vision, got {:?}", other),
        }
    }

    #[test]
    fn test_greeting_keeps_greet_intent() {
        let event = heard("Hello!");
        assert_eq!(event.detected_intent, Intent::Greet);
        assert!(event.requested_skill.is_none());
        assert_eq!(event.actor, "ada");
    }

    #[test]
    fn test_keyword_resolves_skill() {
        let event = heard("could you sit, please");
        assert_eq!(event.detected_intent, Intent::Command);
        assert_eq!(event.requested_skill.as_deref(), Some("sit_down"));

        let event = heard("time to get up");
        assert_eq!(event.requested_skill.as_deref(), Some("stand_up"));
    }

    #[test]
    fn test_keywords_match_whole_words() {
        // "situation" must not trigger "sit".
        let event = heard("the situation is fine");
        assert!(event.requested_skill.is_none());
        assert_eq!(event.detected_intent, Intent::Inform);
    }

    #[test]
    fn test_other_intents() {
        assert_eq!(heard("what time is it").detected_intent, Intent::Query);
        assert_eq!(heard("is it raining?").detected_intent, Intent::Query);
        assert_eq!(heard("thanks a lot").detected_intent, Intent::Praise);
        assert_eq!(heard("you are useless").detected_intent, Intent::Insult);
        assert_eq!(heard("see you tomorrow").detected_intent, Intent::Farewell);
    }
}
