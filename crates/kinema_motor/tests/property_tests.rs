//! Property-based tests for kinema_motor.
//!
//! Dispatcher properties run on a paused current-thread runtime so that
//! generated gaps between requests are exact.

use kinema_core::{ControllerCommand, Pose, PosePrerequisite, Skill};
use kinema_motor::{
    CommandRequest, DispatchOutcome, DispatchSettings, Dispatcher, MockTransport, PositionTracker,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn paused_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .unwrap()
}

fn arb_pose() -> impl Strategy<Value = Pose> {
    prop::sample::select(vec![Pose::Standing, Pose::Sitting, Pose::Unknown])
}

fn arb_prerequisite() -> impl Strategy<Value = PosePrerequisite> {
    prop::sample::select(vec![
        PosePrerequisite::Any,
        PosePrerequisite::Standing,
        PosePrerequisite::Sitting,
    ])
}

// ============================================================================
// Position prerequisites
// ============================================================================

proptest! {
    #[test]
    fn prerequisite_check_matches_pose(pose in arb_pose(), prerequisite in arb_prerequisite()) {
        let skill = Skill::new("gesture", prerequisite, ControllerCommand::new("motion", "play"));
        let check = PositionTracker::new(pose, 4).check_prerequisite(&skill);

        match prerequisite.required() {
            None => prop_assert!(check.allowed),
            Some(required) if required == pose => prop_assert!(check.allowed),
            Some(_) => {
                prop_assert!(!check.allowed);
                prop_assert!(!check.reason.is_empty());
            }
        }
    }

    #[test]
    fn update_never_accepts_unknown(
        start in arb_pose(),
        updates in prop::collection::vec(arb_pose(), 0..20),
    ) {
        let mut tracker = PositionTracker::new(start, 4);
        let mut expected = start;
        for pose in updates {
            tracker.update(pose);
            if pose != Pose::Unknown {
                expected = pose;
            }
            prop_assert_eq!(tracker.pose(), expected);
        }
    }
}

// ============================================================================
// Dispatcher timing
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn identical_requests_in_dedup_window_send_once(
        critical in any::<bool>(),
        gaps in prop::collection::vec(0u64..40, 1..8),
    ) {
        // Total gap stays under the 400 ms window.
        let rt = paused_runtime();
        let attempts = rt.block_on(async {
            let mock = Arc::new(MockTransport::new());
            let d = Dispatcher::new(
                mock.clone(),
                DispatchSettings::default(),
                PositionTracker::default(),
            );
            let cmd = ControllerCommand::new("head", "nod");
            let make = || if critical {
                CommandRequest::critical(cmd.clone())
            } else {
                CommandRequest::general(cmd.clone())
            };

            d.dispatch(make()).await;
            for gap in gaps {
                tokio::time::advance(Duration::from_millis(gap)).await;
                let r = d.dispatch(make()).await;
                assert_eq!(r.outcome, DispatchOutcome::Duplicate);
            }
            mock.attempts().await.len()
        });
        prop_assert_eq!(attempts, 1);
    }

    #[test]
    fn critical_passes_where_general_is_rejected(gap_ms in 0u64..1999) {
        let rt = paused_runtime();
        let (general, critical) = rt.block_on(async {
            let settings = DispatchSettings::default();
            let build = |settings: DispatchSettings| {
                let mock = Arc::new(MockTransport::new());
                Dispatcher::new(mock, settings, PositionTracker::default())
            };
            let general_d = build(settings.clone());
            let critical_d = build(settings);

            for d in [&general_d, &critical_d] {
                d.dispatch(CommandRequest::speech("hello")).await;
            }
            tokio::time::advance(Duration::from_millis(gap_ms)).await;

            let posture = ControllerCommand::new("posture", "stand");
            let general = general_d.dispatch(CommandRequest::general(posture.clone())).await;
            let critical = critical_d.dispatch(CommandRequest::critical(posture)).await;
            (general, critical)
        });
        prop_assert!(general.is_rate_limited());
        prop_assert!(critical.ok);
    }
}
