//! Property-based tests for kinema_core.
//!
//! Uses proptest to verify invariants that must hold for ALL possible inputs,
//! not just hand-picked examples.

use kinema_core::persona::{MAX_EFFECTIVENESS, MIN_EFFECTIVENESS};
use kinema_core::{
    AffectSnapshot, AffectiveState, Axis, AxisVector, CognitiveFunction, FunctionKind,
    FunctionRole, FunctionWeights, Intent, LenientF32, PerceivedEvent, PersonalityProfile,
    Reinforcement,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

/// Any f32 including NaN and infinities.
fn any_f32() -> impl Strategy<Value = f32> {
    prop_oneof![
        -10.0f32..10.0,
        Just(f32::NAN),
        Just(f32::INFINITY),
        Just(f32::NEG_INFINITY),
    ]
}

fn arb_axes() -> impl Strategy<Value = AxisVector> {
    prop::array::uniform6(0.0f32..=1.0).prop_map(AxisVector::new)
}

fn arb_type_code() -> impl Strategy<Value = String> {
    (
        prop::sample::select(vec!['E', 'I']),
        prop::sample::select(vec!['S', 'N']),
        prop::sample::select(vec!['T', 'F']),
        prop::sample::select(vec!['J', 'P']),
    )
        .prop_map(|(a, b, c, d)| [a, b, c, d].iter().collect())
}

// ============================================================================
// Affect vector
// ============================================================================

proptest! {
    #[test]
    fn axis_vector_always_in_unit_range(values in prop::array::uniform6(any_f32())) {
        let v = AxisVector::new(values);
        for (axis, value) in v.iter() {
            prop_assert!((0.0..=1.0).contains(&value), "{} = {}", axis, value);
        }
    }

    #[test]
    fn intensity_is_normalised(axes in arb_axes(), baseline in arb_axes()) {
        let state = AffectiveState::derive(axes, &baseline, 0.08);
        prop_assert!(state.intensity() >= 0.0 && state.intensity() <= 1.0);
        prop_assert!(!state.sub_emotion().is_empty());
    }

    #[test]
    fn baseline_itself_is_neutral(baseline in arb_axes()) {
        let state = AffectiveState::derive(baseline, &baseline, 0.08);
        prop_assert_eq!(state.primary(), kinema_core::Emotion::Neutral);
    }
}

// ============================================================================
// Persistence boundary
// ============================================================================

proptest! {
    #[test]
    fn lenient_f32_never_yields_non_finite(text in ".{0,12}") {
        let json = serde_json::to_string(&text).unwrap();
        let parsed: LenientF32 = serde_json::from_str(&json).unwrap();
        if let Some(v) = parsed.value() {
            prop_assert!(v.is_finite());
        }
    }

    #[test]
    fn restored_axes_always_valid(
        dopamine in prop_oneof![
            Just(serde_json::json!("junk")),
            (-5.0f64..5.0).prop_map(|v| serde_json::json!(v)),
        ],
        cortisol in prop_oneof![
            Just(serde_json::Value::Null),
            (0.0f64..1.0).prop_map(|v| serde_json::json!(v.to_string())),
        ],
    ) {
        let json = serde_json::json!({ "axes": { "dopamine": dopamine, "cortisol": cortisol } });
        let snap: AffectSnapshot = serde_json::from_value(json).unwrap();
        let (axes, fell_back) = snap.to_axes(&AxisVector::default());
        for (_, value) in axes.iter() {
            prop_assert!((0.0..=1.0).contains(&value));
        }
        // Axes never mentioned always fall back.
        prop_assert!(fell_back.contains(&Axis::Gaba));
    }
}

// ============================================================================
// Personality
// ============================================================================

proptest! {
    #[test]
    fn every_type_code_yields_a_valid_stack(code in arb_type_code()) {
        let p = PersonalityProfile::from_type_code(&code, &FunctionWeights::default()).unwrap();
        let fns = p.functions();
        prop_assert_eq!(fns.len(), 4);
        prop_assert_eq!(fns.iter().filter(|f| f.role == FunctionRole::Dominant).count(), 1);
        prop_assert_eq!(fns.iter().filter(|f| f.role == FunctionRole::Auxiliary).count(), 1);

        let mut kinds: Vec<FunctionKind> = fns.iter().map(|f| f.kind).collect();
        kinds.sort();
        kinds.dedup();
        prop_assert_eq!(kinds.len(), 4);
        // Dominant and auxiliary face opposite attitudes.
        prop_assert_ne!(p.dominant().kind.is_extraverted(), p.auxiliary().kind.is_extraverted());
    }

    #[test]
    fn reinforce_stays_bounded(
        start in any_f32(),
        rate in any_f32(),
        outcomes in prop::collection::vec(any::<bool>(), 0..50),
    ) {
        let mut f = CognitiveFunction::new(FunctionKind::Ni, FunctionRole::Auxiliary, start);
        for success in outcomes {
            let outcome = if success { Reinforcement::Success } else { Reinforcement::Failure };
            let v = f.reinforce(outcome, rate);
            prop_assert!((MIN_EFFECTIVENESS..=MAX_EFFECTIVENESS).contains(&v));
        }
    }
}

// ============================================================================
// Events
// ============================================================================

proptest! {
    #[test]
    fn normalized_content_is_idempotent(content in "[ a-zA-Z\t]{0,30}") {
        let once = PerceivedEvent::speech("bob", &content, Intent::Inform).normalized_content();
        let twice = PerceivedEvent::speech("bob", &once, Intent::Inform).normalized_content();
        prop_assert_eq!(&once, &twice);
        prop_assert!(!once.starts_with(' ') && !once.ends_with(' '));
        prop_assert!(!once.contains("  "));
    }
}
