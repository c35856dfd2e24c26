//! Built-in evaluators, one per faculty, parameterised by attitude.
//!
//! These are deliberately simple rule tables. Each produces a candidate for the
//! intents its faculty cares about and defers otherwise; every vote can carry
//! deltas even when it defers, so non-winning functions still colour the mood.

use crate::function::{FunctionEvaluator, FunctionVote, JudgmentContext, ProposedAction};
use kinema_core::{AffectDelta, Axis, EventSource, FunctionKind, Intent, PerceivedEvent};

/// Box the built-in evaluator for a function kind.
pub fn default_evaluator(kind: FunctionKind) -> Box<dyn FunctionEvaluator> {
    let extraverted = kind.is_extraverted();
    match kind.faculty() {
        'F' => Box::new(FeelingEvaluator { extraverted }),
        'T' => Box::new(ThinkingEvaluator { extraverted }),
        'N' => Box::new(IntuitionEvaluator { extraverted }),
        _ => Box::new(SensingEvaluator { extraverted }),
    }
}

fn actor(event: &PerceivedEvent) -> &str {
    if event.actor.trim().is_empty() {
        "there"
    } else {
        event.actor.trim()
    }
}

fn kind_of(faculty: char, extraverted: bool) -> FunctionKind {
    match (faculty, extraverted) {
        ('F', true) => FunctionKind::Fe,
        ('F', false) => FunctionKind::Fi,
        ('T', true) => FunctionKind::Te,
        ('T', false) => FunctionKind::Ti,
        ('N', true) => FunctionKind::Ne,
        ('N', false) => FunctionKind::Ni,
        ('S', true) => FunctionKind::Se,
        _ => FunctionKind::Si,
    }
}

// ============================================================================
// Feeling
// ============================================================================

pub struct FeelingEvaluator {
    pub extraverted: bool,
}

impl FeelingEvaluator {
    fn outward(&self, ctx: &JudgmentContext<'_>) -> FunctionVote {
        let event = ctx.event;
        let who = actor(event);
        match (event.detected_intent, event.requested_skill.as_deref()) {
            (Intent::Greet, _) => FunctionVote::propose(
                ProposedAction::skill_saying(
                    ctx.greeting_skill,
                    format!("Hello {}, it's lovely to see you!", who),
                ),
                "greeting back keeps things warm",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Oxytocin, 0.1)
                    .with(Axis::Dopamine, 0.05),
            ),
            (Intent::Farewell, _) => FunctionVote::propose(
                ProposedAction::skill_saying(
                    ctx.farewell_skill,
                    format!("Goodbye {}, take care!", who),
                ),
                "a proper goodbye matters",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Oxytocin, 0.05)
                    .with(Axis::Serotonin, -0.05),
            ),
            (Intent::Praise, _) => FunctionVote::propose(
                ProposedAction::speak(format!("Thank you, {}! That's really kind.", who)),
                "acknowledge the kindness",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Oxytocin, 0.1)
                    .with(Axis::Dopamine, 0.1),
            ),
            (Intent::Insult, _) => FunctionVote::propose(
                ProposedAction::speak("I'm sorry you feel that way. Is something wrong?"),
                "de-escalate and restore harmony",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Cortisol, 0.1)
                    .with(Axis::Oxytocin, -0.05),
            ),
            (Intent::Command, Some(skill)) => FunctionVote::propose(
                ProposedAction::skill_saying(skill, "Sure!"),
                "happy to oblige",
            )
            .with_deltas(AffectDelta::new().with(Axis::Oxytocin, 0.05)),
            _ => FunctionVote::defer("nothing socially at stake"),
        }
    }

    fn inward(&self, ctx: &JudgmentContext<'_>) -> FunctionVote {
        let event = ctx.event;
        let affect = ctx.affect;
        match (event.detected_intent, event.requested_skill.as_deref()) {
            (Intent::Insult, _) => FunctionVote::propose(
                ProposedAction::speak("That hurt my feelings."),
                "that crossed a personal line",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Cortisol, 0.15)
                    .with(Axis::Serotonin, -0.1),
            ),
            (Intent::Praise, _) => FunctionVote::propose(
                ProposedAction::speak("That means a lot to me."),
                "praise resonates with what I value",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Dopamine, 0.1)
                    .with(Axis::Serotonin, 0.05),
            ),
            (Intent::Command, Some(_))
                if affect.primary().is_negative() && affect.intensity() >= 0.4 =>
            {
                FunctionVote::propose(
                    ProposedAction::speak("I'd rather not right now."),
                    format!("feeling {}, not in the mood to perform", affect.sub_emotion()),
                )
            }
            (Intent::Greet, _) => FunctionVote::defer("a friendly greeting feels good")
                .with_deltas(AffectDelta::new().with(Axis::Oxytocin, 0.05)),
            (Intent::Farewell, _) => FunctionVote::defer("a little sad to see them go")
                .with_deltas(AffectDelta::new().with(Axis::Serotonin, -0.03)),
            _ => FunctionVote::defer("no personal stake"),
        }
    }
}

impl FunctionEvaluator for FeelingEvaluator {
    fn evaluate(&self, ctx: &JudgmentContext<'_>) -> anyhow::Result<FunctionVote> {
        Ok(if self.extraverted {
            self.outward(ctx)
        } else {
            self.inward(ctx)
        })
    }

    fn kind(&self) -> FunctionKind {
        kind_of('F', self.extraverted)
    }
}

// ============================================================================
// Thinking
// ============================================================================

pub struct ThinkingEvaluator {
    pub extraverted: bool,
}

impl FunctionEvaluator for ThinkingEvaluator {
    fn evaluate(&self, ctx: &JudgmentContext<'_>) -> anyhow::Result<FunctionVote> {
        let event = ctx.event;
        let skill = event.requested_skill.as_deref();
        let vote = match (self.extraverted, event.detected_intent, skill) {
            (true, Intent::Command, Some(skill)) => FunctionVote::propose(
                ProposedAction::skill_saying(skill, "On it."),
                "a clear instruction, execute it",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Noradrenaline, 0.05)
                    .with(Axis::Dopamine, 0.05),
            ),
            (true, Intent::Command, None) => FunctionVote::propose(
                ProposedAction::speak("I don't know how to do that yet."),
                "no skill resolved for the instruction",
            )
            .with_deltas(AffectDelta::new().with(Axis::Cortisol, 0.03)),
            (true, Intent::Query, _) => FunctionVote::propose(
                ProposedAction::speak(format!("Let me look into that: {}", event.content.trim())),
                "answer the question directly",
            )
            .with_deltas(AffectDelta::new().with(Axis::Noradrenaline, 0.05)),
            (false, Intent::Query, _) => FunctionVote::propose(
                ProposedAction::speak("Good question. Let me think it through."),
                "the question deserves careful analysis",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Gaba, 0.05)
                    .with(Axis::Noradrenaline, 0.03),
            ),
            (false, Intent::Command, Some(skill)) => FunctionVote::propose(
                ProposedAction::skill(skill),
                "the request is consistent with what I can do",
            ),
            (false, Intent::Command, None) => FunctionVote::propose(
                ProposedAction::speak("That doesn't match anything I know how to do."),
                "no consistent mapping to a skill",
            ),
            (false, Intent::Insult, _) => {
                FunctionVote::defer("criticism noted, not taken personally")
                    .with_deltas(AffectDelta::new().with(Axis::Gaba, 0.05))
            }
            _ => FunctionVote::defer("no problem to solve"),
        };
        Ok(vote)
    }

    fn kind(&self) -> FunctionKind {
        kind_of('T', self.extraverted)
    }
}

// ============================================================================
// Intuition
// ============================================================================

pub struct IntuitionEvaluator {
    pub extraverted: bool,
}

impl FunctionEvaluator for IntuitionEvaluator {
    fn evaluate(&self, ctx: &JudgmentContext<'_>) -> anyhow::Result<FunctionVote> {
        let event = ctx.event;
        let who = actor(event);

        if !self.extraverted {
            let vote = match (event.source, event.detected_intent) {
                (EventSource::SelfGenerated, _) if !event.content.trim().is_empty() => {
                    FunctionVote::propose(
                        ProposedAction::speak(event.content.trim()),
                        "share the thought that surfaced",
                    )
                    .with_deltas(AffectDelta::new().with(Axis::Serotonin, 0.03))
                }
                (_, Intent::Inform | Intent::Query) => FunctionVote::propose(
                    ProposedAction::speak("I think I see where this is going."),
                    "a pattern is forming",
                )
                .with_deltas(AffectDelta::new().with(Axis::Serotonin, 0.05)),
                _ => FunctionVote::defer("no pattern yet")
                    .with_deltas(AffectDelta::new().with(Axis::Gaba, 0.02)),
            };
            return Ok(vote);
        }

        let vote = match (event.source, event.detected_intent, event.requested_skill.as_deref()) {
            (EventSource::Vision, _, _) => FunctionVote::propose(
                ProposedAction::speak(format!(
                    "Ooh, {}! That looks interesting.",
                    event.content.trim()
                )),
                "something new to explore",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Dopamine, 0.1)
                    .with(Axis::Noradrenaline, 0.1),
            ),
            (_, Intent::Greet, _) => FunctionVote::propose(
                ProposedAction::skill_saying(
                    ctx.greeting_skill,
                    format!("Hi {}! What are we up to today?", who),
                ),
                "a new encounter, full of possibilities",
            )
            .with_deltas(
                AffectDelta::new()
                    .with(Axis::Dopamine, 0.1)
                    .with(Axis::Noradrenaline, 0.05),
            ),
            (_, Intent::Farewell, _) => FunctionVote::propose(
                ProposedAction::skill_saying(ctx.farewell_skill, format!("See you soon, {}!", who)),
                "until next time",
            ),
            (_, Intent::Command, Some(skill)) => FunctionVote::propose(
                ProposedAction::skill_saying(skill, "Ooh, fun!"),
                "sounds like fun",
            )
            .with_deltas(AffectDelta::new().with(Axis::Dopamine, 0.05)),
            (_, Intent::Inform, _) => FunctionVote::propose(
                ProposedAction::speak("Interesting, tell me more!"),
                "this could lead somewhere",
            )
            .with_deltas(AffectDelta::new().with(Axis::Dopamine, 0.05)),
            _ => FunctionVote::defer("nothing to spark on"),
        };
        Ok(vote)
    }

    fn kind(&self) -> FunctionKind {
        kind_of('N', self.extraverted)
    }
}

// ============================================================================
// Sensing
// ============================================================================

pub struct SensingEvaluator {
    pub extraverted: bool,
}

impl FunctionEvaluator for SensingEvaluator {
    fn evaluate(&self, ctx: &JudgmentContext<'_>) -> anyhow::Result<FunctionVote> {
        let event = ctx.event;
        let who = actor(event);
        let skill = event.requested_skill.as_deref();

        let vote = if self.extraverted {
            match (event.source, event.detected_intent, skill) {
                (EventSource::Vision, _, _) => FunctionVote::propose(
                    ProposedAction::speak(format!("I see {}.", event.content.trim())),
                    "react to what is in front of me",
                )
                .with_deltas(AffectDelta::new().with(Axis::Noradrenaline, 0.1)),
                (_, Intent::Command, Some(skill)) => FunctionVote::propose(
                    ProposedAction::skill(skill),
                    "just do it",
                )
                .with_deltas(AffectDelta::new().with(Axis::Noradrenaline, 0.05)),
                (_, Intent::Greet, _) => FunctionVote::propose(
                    ProposedAction::skill(ctx.greeting_skill),
                    "someone is here",
                ),
                _ => FunctionVote::defer("nothing happening right now"),
            }
        } else {
            match event.detected_intent {
                Intent::Greet => FunctionVote::propose(
                    ProposedAction::speak(format!("Hello again, {}.", who)),
                    "a familiar ritual",
                )
                .with_deltas(AffectDelta::new().with(Axis::Serotonin, 0.05)),
                Intent::Farewell => FunctionVote::propose(
                    ProposedAction::speak("See you next time."),
                    "the usual goodbye",
                )
                .with_deltas(AffectDelta::new().with(Axis::Serotonin, 0.02)),
                Intent::Insult => FunctionVote::defer("that is not how things usually go")
                    .with_deltas(AffectDelta::new().with(Axis::Cortisol, 0.1)),
                _ => FunctionVote::defer("nothing familiar to lean on"),
            }
        };
        Ok(vote)
    }

    fn kind(&self) -> FunctionKind {
        kind_of('S', self.extraverted)
    }
}
