//! The single choke point for outbound commands.

use crate::command::{CommandRequest, DispatchOutcome, DispatchRecord, DispatchResult};
use crate::limiter::{Admission, RateLimiter, RateLimits};
use crate::position::{PoseTransition, PositionTracker, PrerequisiteCheck};
use crate::transport::ControllerTransport;
use kinema_core::config::DispatchConfig;
use kinema_core::{KinemaConfig, Pose, Skill};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub limits: RateLimits,
    /// Upper bound on a single controller call.
    pub timeout: Duration,
    /// Retry a failed critical command once, immediately.
    pub retry_critical: bool,
    pub log_capacity: usize,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            limits: RateLimits::default(),
            timeout: Duration::from_secs(3),
            retry_critical: true,
            log_capacity: 64,
        }
    }
}

impl DispatchSettings {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            limits: RateLimits::from_config(config),
            timeout: config.timeout(),
            retry_critical: config.retry_critical,
            log_capacity: config.log_capacity.max(1),
        }
    }
}

/// Everything guarded by the dispatch mutex.
struct DispatchState {
    limiter: RateLimiter,
    position: PositionTracker,
    log: VecDeque<DispatchRecord>,
    log_capacity: usize,
}

impl DispatchState {
    fn push_log(&mut self, record: DispatchRecord) {
        if self.log.len() >= self.log_capacity {
            self.log.pop_front();
        }
        self.log.push_back(record);
    }
}

pub struct Dispatcher {
    transport: Arc<dyn ControllerTransport>,
    timeout: Duration,
    retry_critical: bool,
    state: Mutex<DispatchState>,
}

impl Dispatcher {
    pub fn new(
        transport: Arc<dyn ControllerTransport>,
        settings: DispatchSettings,
        position: PositionTracker,
    ) -> Self {
        Self {
            transport,
            timeout: settings.timeout,
            retry_critical: settings.retry_critical,
            state: Mutex::new(DispatchState {
                limiter: RateLimiter::new(settings.limits),
                position,
                log: VecDeque::with_capacity(settings.log_capacity),
                log_capacity: settings.log_capacity.max(1),
            }),
        }
    }

    pub fn from_config(config: &KinemaConfig, transport: Arc<dyn ControllerTransport>) -> Self {
        Self::new(
            transport,
            DispatchSettings::from_config(&config.dispatch),
            PositionTracker::new(config.position.initial, config.position.history_capacity),
        )
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Submit one request. Never queues: the result says what happened to it.
    ///
    /// The state lock is held across the controller call, so concurrent callers
    /// (and pose resets) wait for an in-flight dispatch to finish.
    pub async fn dispatch(&self, request: CommandRequest) -> DispatchResult {
        let mut state = self.state.lock().await;
        let result = self.dispatch_locked(&mut state, &request).await;
        state.push_log(DispatchRecord::new(&request, &result));
        result
    }

    async fn dispatch_locked(
        &self,
        state: &mut DispatchState,
        request: &CommandRequest,
    ) -> DispatchResult {
        let now = Instant::now();

        if state.limiter.is_duplicate(request, now) {
            tracing::debug!("Dropping duplicate {}", request);
            return DispatchResult::rejected(
                DispatchOutcome::Duplicate,
                "identical command inside dedup window",
            );
        }

        if let Some(required) = request.required_pose {
            let pose = state.position.pose();
            if pose != required {
                tracing::warn!("Refusing {}: requires {}, robot is {}", request, required, pose);
                return DispatchResult::rejected(
                    DispatchOutcome::PrerequisiteFailed,
                    format!("requires {}, robot is {}", required, pose),
                );
            }
        }

        match state.limiter.admit(request.class, now) {
            Admission::Now => {}
            Admission::Wait(delay) => {
                tracing::debug!("Critical {} waiting {:?} for spacing", request, delay);
                tokio::time::sleep(delay).await;
            }
            Admission::Reject { retry_after } => {
                tracing::debug!("Rate limited {} (retry in {:?})", request, retry_after);
                return DispatchResult::rejected(
                    DispatchOutcome::rate_limited(retry_after),
                    format!("general lane cooling down for {:?}", retry_after),
                );
            }
        }

        let max_attempts = if request.is_critical() && self.retry_critical {
            2
        } else {
            1
        };
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            let outcome =
                tokio::time::timeout(self.timeout, self.transport.send(&request.command)).await;
            state.limiter.record(request, Instant::now());

            match outcome {
                Ok(Ok(())) => {
                    if attempt > 1 {
                        tracing::info!("{} succeeded on attempt {}", request, attempt);
                    }
                    let pose_after = request.resulting_pose.map(|pose| {
                        state.position.update(pose);
                        state.position.pose()
                    });
                    return DispatchResult::sent(
                        format!("accepted by {}", self.transport.name()),
                        attempt,
                        pose_after,
                    );
                }
                Ok(Err(e)) => last_error = e.to_string(),
                Err(_) => last_error = format!("controller timed out after {:?}", self.timeout),
            }
            tracing::warn!(
                "Dispatch of {} failed (attempt {}/{}): {}",
                request,
                attempt,
                max_attempts,
                last_error
            );
        }

        DispatchResult::failed(last_error, max_attempts)
    }

    pub async fn check_prerequisite(&self, skill: &Skill) -> PrerequisiteCheck {
        self.state.lock().await.position.check_prerequisite(skill)
    }

    pub async fn pose(&self) -> Pose {
        self.state.lock().await.position.pose()
    }

    /// Controller-confirmed pose. Waits for any in-flight dispatch.
    pub async fn report_pose(&self, pose: Pose) -> bool {
        self.state.lock().await.position.report_pose(pose)
    }

    /// Administrative override. Waits for any in-flight dispatch.
    pub async fn force_reset(&self, pose: Pose) {
        self.state.lock().await.position.force_reset(pose);
    }

    pub async fn recent_log(&self) -> Vec<DispatchRecord> {
        self.state.lock().await.log.iter().cloned().collect()
    }

    pub async fn pose_history(&self) -> Vec<PoseTransition> {
        self.state.lock().await.position.history().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockTransport;
    use kinema_core::{ControllerCommand, SkillRegistry};

    fn dispatcher(mock: Arc<MockTransport>, pose: Pose) -> Dispatcher {
        Dispatcher::new(mock, DispatchSettings::default(), PositionTracker::new(pose, 8))
    }

    fn skill_request(name: &str) -> CommandRequest {
        let registry = SkillRegistry::with_defaults();
        CommandRequest::from_skill(registry.get(name).unwrap())
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_requests_dispatch_once() {
        let mock = Arc::new(MockTransport::new());
        let d = dispatcher(mock.clone(), Pose::Standing);

        let first = d.dispatch(skill_request("wave")).await;
        let second = d.dispatch(skill_request("wave")).await;

        assert!(first.ok);
        assert_eq!(second.outcome, DispatchOutcome::Duplicate);
        assert_eq!(mock.attempts().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_check_precedes_critical_lane() {
        let mock = Arc::new(MockTransport::new());
        let d = dispatcher(mock.clone(), Pose::Unknown);

        let first = d.dispatch(skill_request("stand_up")).await;
        let second = d.dispatch(skill_request("stand_up")).await;
        assert!(first.ok);
        assert_eq!(second.outcome, DispatchOutcome::Duplicate);
        assert_eq!(mock.attempts().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_overrides_general_cooldown() {
        let mock = Arc::new(MockTransport::new());
        let d = dispatcher(mock.clone(), Pose::Standing);

        assert!(d.dispatch(skill_request("wave")).await.ok);

        let general = d
            .dispatch(CommandRequest::general(ControllerCommand::new("head", "nod")))
            .await;
        assert!(general.is_rate_limited());

        let critical = d.dispatch(skill_request("sit_down")).await;
        assert!(critical.ok, "critical dropped: {}", critical.detail);
        assert_eq!(critical.pose_after, Some(Pose::Sitting));
        assert_eq!(d.pose().await, Pose::Sitting);
        assert_eq!(mock.sent().await.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_general_window_reopens() {
        let mock = Arc::new(MockTransport::new());
        let d = dispatcher(mock.clone(), Pose::Standing);

        assert!(d.dispatch(CommandRequest::speech("hi")).await.ok);
        tokio::time::advance(Duration::from_millis(2001)).await;
        assert!(d.dispatch(CommandRequest::speech("how are you")).await.ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_failure() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(10)));
        let d = dispatcher(mock.clone(), Pose::Standing);

        let result = d.dispatch(skill_request("wave")).await;
        assert!(!result.ok);
        assert!(result.is_failure());
        assert!(result.detail.contains("timed out"));
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_retried_once() {
        let mock = Arc::new(MockTransport::failing_first(1));
        let d = dispatcher(mock.clone(), Pose::Sitting);

        let result = d.dispatch(skill_request("stand_up")).await;
        assert!(result.ok);
        assert_eq!(result.attempts, 2);
        assert_eq!(d.pose().await, Pose::Standing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_general_not_retried() {
        let mock = Arc::new(MockTransport::failing_first(1));
        let d = dispatcher(mock.clone(), Pose::Standing);

        let result = d.dispatch(skill_request("wave")).await;
        assert!(result.is_failure());
        assert_eq!(mock.attempts().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_position_change_leaves_pose() {
        let mock = Arc::new(MockTransport::failing());
        let d = dispatcher(mock.clone(), Pose::Standing);

        let result = d.dispatch(skill_request("sit_down")).await;
        assert!(!result.ok);
        assert_eq!(result.attempts, 2);
        assert_eq!(d.pose().await, Pose::Standing);
        assert!(d.pose_history().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_prerequisite_rechecked_at_dispatch() {
        let mock = Arc::new(MockTransport::new());
        let d = dispatcher(mock.clone(), Pose::Sitting);

        let result = d.dispatch(skill_request("wave")).await;
        assert_eq!(result.outcome, DispatchOutcome::PrerequisiteFailed);
        assert!(mock.attempts().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_log_is_bounded_and_ordered() {
        let mock = Arc::new(MockTransport::new());
        let settings = DispatchSettings {
            log_capacity: 2,
            ..DispatchSettings::default()
        };
        let d = Dispatcher::new(mock, settings, PositionTracker::default());

        for text in ["a", "b", "c"] {
            d.dispatch(CommandRequest::speech(text)).await;
            tokio::time::advance(Duration::from_secs(3)).await;
        }
        let log = d.recent_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].command, "speech/say(b)");
        assert_eq!(log[1].outcome, "sent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_admin_pose_operations() {
        let d = dispatcher(Arc::new(MockTransport::new()), Pose::Unknown);
        assert!(d.report_pose(Pose::Standing).await);
        d.force_reset(Pose::Sitting).await;
        assert_eq!(d.pose().await, Pose::Sitting);
        assert_eq!(d.pose_history().await.len(), 2);

        let registry = SkillRegistry::with_defaults();
        assert!(d.check_prerequisite(registry.get("shake_hand").unwrap()).await.allowed);
    }
}
