use crate::dedup::SpeechActTracker;
use crate::function::ProposedAction;
use crate::health::ActuatorHealth;
use crate::outbox::Outbox;
use crate::perception::PerceptionSlot;
use crate::pipeline::{JudgmentPipeline, JudgmentResult};
use crate::snapshot::{AgentSnapshot, DecisionSummary, DispatchSummary, SessionState};
use anyhow::{Context, Result};
use kinema_core::{
    KinemaConfig, PerceivedEvent, Pose, Reinforcement, SessionSnapshot, SkillRegistry,
};
use kinema_limbic::{AffectModel, HomeostasisConfig};
use kinema_motor::{
    CommandRequest, ControllerTransport, DispatchOutcome, DispatchResult, Dispatcher,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, MissedTickBehavior};

// ============================================================================
// Administrative surface
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminCommand {
    Start,
    Stop,
    ForcePositionReset(Pose),
    /// Pose confirmed by the controller.
    ReportPose(Pose),
    Shutdown,
}

/// Cloneable handle for front ends and hosts. Admin commands are applied by the
/// loop between ticks, never in the middle of one.
#[derive(Clone)]
pub struct LoopHandle {
    admin_tx: mpsc::Sender<AdminCommand>,
    snapshot_rx: watch::Receiver<AgentSnapshot>,
    slot: Arc<PerceptionSlot>,
}

impl LoopHandle {
    pub async fn send_admin(&self, command: AdminCommand) -> Result<()> {
        self.admin_tx
            .send(command)
            .await
            .map_err(|_| anyhow::anyhow!("cognitive loop has shut down"))
    }

    pub async fn start(&self) -> Result<()> {
        self.send_admin(AdminCommand::Start).await
    }

    pub async fn stop(&self) -> Result<()> {
        self.send_admin(AdminCommand::Stop).await
    }

    pub async fn force_position_reset(&self, pose: Pose) -> Result<()> {
        self.send_admin(AdminCommand::ForcePositionReset(pose)).await
    }

    pub async fn report_pose(&self, pose: Pose) -> Result<()> {
        self.send_admin(AdminCommand::ReportPose(pose)).await
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send_admin(AdminCommand::Shutdown).await
    }

    /// Hand over genuinely new raw input.
    pub fn deliver_new(&self, event: PerceivedEvent) {
        self.slot.deliver_new(event);
    }

    /// Hand over the same input again.
    pub fn redeliver(&self, event: PerceivedEvent) {
        self.slot.redeliver(event);
    }

    /// The slot itself, for front ends running on plain threads.
    pub fn slot(&self) -> Arc<PerceptionSlot> {
        Arc::clone(&self.slot)
    }

    pub fn subscribe(&self) -> watch::Receiver<AgentSnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn snapshot(&self) -> AgentSnapshot {
        self.snapshot_rx.borrow().clone()
    }
}

// ============================================================================
// Per-event plan
// ============================================================================

#[derive(Debug, Default)]
struct Plan {
    primary: Option<CommandRequest>,
    /// Primary is the winning proposal itself, not a substitute.
    from_proposal: bool,
    follow_up: Option<CommandRequest>,
    substitution: Option<String>,
}

impl Plan {
    fn proposal(primary: CommandRequest, follow_up: Option<CommandRequest>) -> Self {
        Self {
            primary: Some(primary),
            from_proposal: true,
            follow_up,
            substitution: None,
        }
    }

    /// Verbal-only response standing in for a skill that can't run.
    fn substitute(utterance: Option<&str>, explanation: String) -> Self {
        let text = match utterance {
            Some(u) => format!("{} {}", u, explanation),
            None => explanation.clone(),
        };
        Self {
            primary: Some(CommandRequest::speech(&text)),
            from_proposal: false,
            follow_up: None,
            substitution: Some(explanation),
        }
    }
}

fn describe_event(event: &PerceivedEvent) -> String {
    format!(
        "{} from {}: \"{}\" ({})",
        event.source, event.actor, event.content, event.detected_intent
    )
}

// ============================================================================
// CognitiveLoop
// ============================================================================

pub struct CognitiveLoop {
    affect: AffectModel,
    pipeline: JudgmentPipeline,
    skills: SkillRegistry,
    dispatcher: Arc<Dispatcher>,
    tracker: SpeechActTracker,
    slot: Arc<PerceptionSlot>,
    outbox: Outbox,
    health: ActuatorHealth,
    tick_interval: Duration,
    session: SessionState,
    tick: u64,
    last_decision: Option<DecisionSummary>,
    admin_rx: mpsc::Receiver<AdminCommand>,
    snapshot_tx: watch::Sender<AgentSnapshot>,
}

impl CognitiveLoop {
    /// Create a new loop in the idle state.
    ///
    /// Returns `(CognitiveLoop, LoopHandle)`; the handle is how everything else
    /// talks to the loop once it is spawned.
    pub fn new(
        config: &KinemaConfig,
        pipeline: JudgmentPipeline,
        dispatcher: Arc<Dispatcher>,
    ) -> (Self, LoopHandle) {
        let affect = AffectModel::new(HomeostasisConfig::from_config(&config.affect));
        let (admin_tx, admin_rx) = mpsc::channel(16);
        let initial = AgentSnapshot::initial(
            affect.current(),
            config.position.initial,
            pipeline.effectiveness(),
        );
        let (snapshot_tx, snapshot_rx) = watch::channel(initial);
        let slot = Arc::new(PerceptionSlot::new());

        let agent = Self {
            affect,
            pipeline,
            skills: config.skill_registry(),
            dispatcher,
            tracker: SpeechActTracker::new(),
            slot: Arc::clone(&slot),
            outbox: Outbox::new(config.agent.max_reproposals, config.agent.outbox_capacity),
            health: ActuatorHealth::from_config(&config.agent),
            tick_interval: config.agent.tick_interval(),
            session: SessionState::Idle,
            tick: 0,
            last_decision: None,
            admin_rx,
            snapshot_tx,
        };
        let handle = LoopHandle {
            admin_tx,
            snapshot_rx,
            slot,
        };
        (agent, handle)
    }

    /// Build every component from configuration.
    pub fn from_config(
        config: &KinemaConfig,
        transport: Arc<dyn ControllerTransport>,
    ) -> Result<(Self, LoopHandle)> {
        let profile = config
            .personality
            .build_profile()
            .context("Invalid personality profile")?;
        tracing::info!(
            "Personality {}: {}",
            profile.type_code.as_deref().unwrap_or("custom"),
            profile
                .functions()
                .iter()
                .map(|f| format!("{}({}, {:.2})", f.kind, f.role, f.effectiveness))
                .collect::<Vec<_>>()
                .join(" > ")
        );
        let pipeline = JudgmentPipeline::from_config(&config.personality, profile);
        let dispatcher = Arc::new(Dispatcher::from_config(config, transport));
        Ok(Self::new(config, pipeline, dispatcher))
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Apply persisted state before the loop starts.
    pub async fn restore(&mut self, snapshot: &SessionSnapshot) {
        let fell_back = self.affect.restore(&snapshot.affect);
        self.pipeline.restore_effectiveness(&snapshot.effectiveness);
        if snapshot.pose != Pose::Unknown {
            self.dispatcher.report_pose(snapshot.pose).await;
        }
        tracing::info!(
            "Restored session: {} ({} axes at baseline), pose {}",
            self.affect.current().describe(),
            fell_back.len(),
            snapshot.pose
        );
        self.publish().await;
    }

    /// Spawn the loop. The task ends on `Shutdown` or when every handle is
    /// dropped, and yields the final snapshot.
    pub fn spawn(self) -> tokio::task::JoinHandle<AgentSnapshot> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> AgentSnapshot {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(
            "Cognitive loop ready (tick {:?}, transport: {})",
            self.tick_interval,
            self.dispatcher.transport_name()
        );
        self.publish().await;

        loop {
            tokio::select! {
                biased;
                command = self.admin_rx.recv() => match command {
                    Some(AdminCommand::Shutdown) | None => break,
                    Some(command) => self.handle_admin(command).await,
                },
                _ = interval.tick(), if self.session == SessionState::Running => {
                    self.tick().await;
                }
            }
        }

        tracing::info!("Cognitive loop shutting down after {} ticks", self.tick);
        self.session = SessionState::Idle;
        self.publish().await;
        let final_snapshot = self.snapshot_tx.borrow().clone();
        final_snapshot
    }

    async fn handle_admin(&mut self, command: AdminCommand) {
        match command {
            AdminCommand::Start => {
                if self.session != SessionState::Running {
                    self.session = SessionState::Running;
                    tracing::info!("Session started");
                }
            }
            AdminCommand::Stop => {
                if self.session == SessionState::Running {
                    self.session = SessionState::Idle;
                    self.tracker.reset();
                    self.outbox.clear();
                    tracing::info!("Session stopped");
                }
            }
            AdminCommand::ForcePositionReset(pose) => self.dispatcher.force_reset(pose).await,
            AdminCommand::ReportPose(pose) => {
                self.dispatcher.report_pose(pose).await;
            }
            AdminCommand::Shutdown => {}
        }
        self.publish().await;
    }

    /// One pass: judge the pending event (or drain the outbox), then decay.
    async fn tick(&mut self) {
        self.tick += 1;

        let (reset, pending) = self.slot.take();
        if reset {
            self.tracker.reset();
        }

        match pending {
            Some((seq, event)) if event.is_speech() && self.tracker.already_handled(&event) => {
                tracing::debug!("Tick {}: '{}' already handled", self.tick, event.content);
                self.slot.clear_if(seq);
                self.drain_outbox().await;
            }
            Some((seq, event)) => {
                self.process_event(&event).await;
                if event.is_speech() {
                    self.tracker.mark_handled(&event);
                }
                self.slot.clear_if(seq);
            }
            None => self.drain_outbox().await,
        }

        self.affect.decay(1);
        self.publish().await;
    }

    async fn process_event(&mut self, event: &PerceivedEvent) {
        let affect = self.affect.current();
        let judgment = self.pipeline.judge(event, &affect);
        let plan = self.plan(&judgment).await;

        let mut summary = DecisionSummary {
            tick: self.tick,
            event: describe_event(event),
            winner: judgment.winner,
            proposal: judgment.action.clone(),
            substitution: plan.substitution.clone(),
            dispatches: Vec::new(),
            rationales: judgment.rationales.clone(),
        };

        if let Some(request) = plan.primary {
            let command = request.command.to_string();
            let result = self.submit(request, 0).await;
            if plan.from_proposal {
                self.reinforce(&judgment, &result);
            }
            summary.dispatches.push(DispatchSummary::new(command, &result));
        }
        if let Some(request) = plan.follow_up {
            let command = request.command.to_string();
            let result = self.submit(request, 0).await;
            summary.dispatches.push(DispatchSummary::new(command, &result));
        }

        let after = self.affect.apply(&judgment.deltas);
        tracing::info!(
            "Tick {}: {} -> {} [{}]",
            self.tick,
            summary.event,
            summary
                .dispatches
                .iter()
                .map(|d| format!("{} {}", d.command, d.outcome))
                .collect::<Vec<_>>()
                .join(", "),
            after.describe()
        );
        self.last_decision = Some(summary);
    }

    /// Turn the winning proposal into requests, substituting a verbal response
    /// when the skill is unknown, the actuators are degraded, or the pose is wrong.
    async fn plan(&self, judgment: &JudgmentResult) -> Plan {
        let (name, utterance) = match &judgment.action {
            None => return Plan::default(),
            Some(ProposedAction::Speak { text }) => {
                return Plan::proposal(CommandRequest::speech(text), None)
            }
            Some(ProposedAction::Skill { name, utterance }) => (name, utterance.as_deref()),
        };
        let spoken = name.replace('_', " ");

        let skill = match self.skills.get(name) {
            Some(skill) => skill,
            None => {
                tracing::warn!("Requested skill '{}' is not registered", name);
                return Plan::substitute(utterance, format!("I don't know how to {} yet.", spoken));
            }
        };

        if !self.health.allow_physical(self.tick) {
            return Plan::substitute(
                utterance,
                format!("I'd like to {}, but my motors aren't responding right now.", spoken),
            );
        }

        let check = self.dispatcher.check_prerequisite(skill).await;
        if !check.allowed {
            tracing::info!("Skill '{}' refused: {}", skill.name, check.reason);
            return Plan::substitute(utterance, check.reason);
        }

        Plan::proposal(
            CommandRequest::from_skill(skill),
            utterance.map(CommandRequest::speech),
        )
    }

    /// Dispatch, feed actuator health, and park rate-limited utterances. A
    /// rate-limited physical skill is rejected outright.
    async fn submit(&mut self, request: CommandRequest, reproposals: u32) -> DispatchResult {
        let result = self.dispatcher.dispatch(request.clone()).await;

        if request.is_physical() && (result.ok || result.is_failure()) {
            self.health.record(result.ok, self.tick);
        }
        if let DispatchOutcome::RateLimited { retry_after_ms } = result.outcome {
            let not_before = Instant::now() + Duration::from_millis(retry_after_ms);
            self.outbox.requeue(request, reproposals, not_before);
        }
        result
    }

    fn reinforce(&mut self, judgment: &JudgmentResult, result: &DispatchResult) {
        let winner = match judgment.winner {
            Some(kind) => kind,
            None => return,
        };
        let outcome = match result.outcome {
            DispatchOutcome::Sent => Reinforcement::Success,
            DispatchOutcome::Failed => Reinforcement::Failure,
            _ => return,
        };
        self.pipeline.reinforce(winner, outcome);
    }

    async fn drain_outbox(&mut self) {
        let (request, reproposals) = match self.outbox.pop_ready(Instant::now()) {
            Some(ready) => ready,
            None => return,
        };
        tracing::debug!("Re-proposing {} (#{})", request, reproposals);
        self.submit(request, reproposals).await;
    }

    async fn publish(&self) {
        let snapshot = AgentSnapshot {
            session: self.session,
            tick: self.tick,
            affect: self.affect.current(),
            pose: self.dispatcher.pose().await,
            degraded: self.health.is_degraded(),
            effectiveness: self.pipeline.effectiveness(),
            last_decision: self.last_decision.clone(),
            recent_dispatches: self.dispatcher.recent_log().await,
            outbox: self.outbox.summary(),
            handled_speech_acts: self.tracker.len(),
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::{Axis, ControllerCommand, FunctionKind, Intent, LenientF32};
    use kinema_motor::MockTransport;

    fn build(pose: Pose, transport: Arc<MockTransport>) -> (CognitiveLoop, LoopHandle) {
        let mut config = KinemaConfig::default();
        config.position.initial = pose;
        CognitiveLoop::from_config(&config, transport).unwrap()
    }

    fn hello() -> PerceivedEvent {
        PerceivedEvent::speech("Ada", "hello", Intent::Greet)
    }

    fn wave() -> ControllerCommand {
        ControllerCommand::new("motion", "play").with_argument("wave")
    }

    async fn count(mock: &MockTransport, cmd: &ControllerCommand) -> usize {
        mock.attempts().await.iter().filter(|c| *c == cmd).count()
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_dispatches_wave_and_applies_all_deltas() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());
        let baseline = agent.affect.current();

        handle.deliver_new(hello());
        agent.tick().await;

        assert_eq!(mock.sent().await.first(), Some(&wave()));
        assert_eq!(agent.dispatcher.pose().await, Pose::Standing);

        // Ne contributes dopamine, Fi (deferring) contributes oxytocin.
        let after = agent.affect.current();
        assert!(after.get(Axis::Dopamine) > baseline.get(Axis::Dopamine));
        assert!(after.get(Axis::Oxytocin) > baseline.get(Axis::Oxytocin));

        let decision = handle.snapshot().last_decision.unwrap();
        assert_eq!(decision.winner, Some(FunctionKind::Ne));
        assert!(decision.rationales[1].deferred);
        assert!(decision.substitution.is_none());
        assert!(decision.dispatches[0].ok);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wrong_pose_substitutes_verbal_response() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Sitting, mock.clone());

        handle.deliver_new(hello());
        agent.tick().await;

        assert_eq!(count(&mock, &wave()).await, 0);
        let sent = mock.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].is_speech());
        assert!(sent[0].argument.as_deref().unwrap().contains("sitting"));

        let decision = handle.snapshot().last_decision.unwrap();
        assert!(decision.substitution.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_pose_blocks_pose_requiring_skill() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Unknown, mock.clone());

        handle.deliver_new(hello());
        agent.tick().await;
        assert_eq!(count(&mock, &wave()).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_redelivery_is_not_rejudged() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        handle.deliver_new(hello());
        agent.tick().await;
        for _ in 0..5 {
            tokio::time::advance(Duration::from_secs(3)).await;
            handle.redeliver(hello());
            agent.tick().await;
        }

        assert_eq!(count(&mock, &wave()).await, 1);
        assert_eq!(handle.snapshot().last_decision.unwrap().tick, 1);
        assert!(agent.slot.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_raw_input_resets_tracker() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        handle.deliver_new(hello());
        agent.tick().await;
        tokio::time::advance(Duration::from_secs(3)).await;
        handle.deliver_new(hello());
        agent.tick().await;

        assert_eq!(count(&mock, &wave()).await, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_clears_tracker() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        agent.handle_admin(AdminCommand::Start).await;
        handle.deliver_new(hello());
        agent.tick().await;
        assert_eq!(agent.tracker.len(), 1);

        agent.handle_admin(AdminCommand::Stop).await;
        assert!(agent.tracker.is_empty());
        assert_eq!(handle.snapshot().session, SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_controller_timeout_still_applies_deltas() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(10)));
        let (mut agent, handle) = build(Pose::Standing, mock.clone());
        let baseline = agent.affect.current();
        let ne_before = agent.pipeline.effectiveness()["Ne"];

        handle.deliver_new(hello());
        agent.tick().await;

        let decision = handle.snapshot().last_decision.unwrap();
        assert!(!decision.dispatches[0].ok);
        assert_eq!(decision.dispatches[0].outcome, "failed");
        assert!(agent.affect.current().get(Axis::Dopamine) > baseline.get(Axis::Dopamine));
        // The winning function is penalised.
        assert!(handle.snapshot().effectiveness["Ne"] < ne_before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_utterance_is_reproposed() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        handle.deliver_new(
            PerceivedEvent::speech("Ada", "sit down", Intent::Command).with_skill("sit_down"),
        );
        agent.tick().await;
        assert_eq!(agent.dispatcher.pose().await, Pose::Sitting);
        assert_eq!(agent.outbox.len(), 1);

        tokio::time::advance(Duration::from_secs(2)).await;
        agent.tick().await;

        assert!(agent.outbox.is_empty());
        assert!(mock.sent().await.iter().any(|c| c.is_speech()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sustained_greetings_keep_outbox_bounded() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());
        let capacity = KinemaConfig::default().agent.outbox_capacity;

        for i in 0..40 {
            let text = format!("hello {}", i);
            handle.deliver_new(PerceivedEvent::speech("Ada", &text, Intent::Greet));
            agent.tick().await;
            tokio::time::advance(Duration::from_millis(250)).await;

            assert!(agent.outbox.len() <= capacity);
            let queued = agent.outbox.summary();
            assert!(queued.iter().all(|p| p.command != wave().to_string()));
        }
        assert!(count(&mock, &wave()).await >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_input_arriving_mid_tick_is_judged_once() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_secs(1)));
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        handle.deliver_new(
            PerceivedEvent::speech("Ada", "nod please", Intent::Command).with_skill("nod"),
        );
        tokio::join!(agent.tick(), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            handle.deliver_new(hello());
        });
        assert!(!agent.slot.is_empty());

        tokio::time::advance(Duration::from_secs(3)).await;
        agent.tick().await;
        assert_eq!(count(&mock, &wave()).await, 1);

        for _ in 0..3 {
            tokio::time::advance(Duration::from_secs(3)).await;
            handle.redeliver(hello());
            agent.tick().await;
        }
        assert_eq!(count(&mock, &wave()).await, 1);
        assert_eq!(handle.snapshot().last_decision.unwrap().tick, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_skill_gets_verbal_substitute() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());

        handle.deliver_new(
            PerceivedEvent::speech("Ada", "do a backflip", Intent::Command).with_skill("backflip"),
        );
        agent.tick().await;

        let sent = mock.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].argument.as_deref().unwrap().contains("don't know how to backflip"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_failures_degrade_to_verbal() {
        let mock = Arc::new(MockTransport::failing());
        let (mut agent, handle) = build(Pose::Standing, mock.clone());
        let nod = ControllerCommand::new("head", "nod");

        let nod_request = |text: &str| {
            PerceivedEvent::speech("Ada", text, Intent::Command).with_skill("nod")
        };

        for i in 0..3 {
            handle.deliver_new(nod_request(&format!("nod {}", i)));
            agent.tick().await;
            tokio::time::advance(Duration::from_secs(3)).await;
        }
        assert!(agent.health.is_degraded());
        assert_eq!(count(&mock, &nod).await, 3);

        handle.deliver_new(nod_request("nod again"));
        agent.tick().await;
        assert_eq!(count(&mock, &nod).await, 3);
        let decision = handle.snapshot().last_decision.unwrap();
        assert!(decision.substitution.unwrap().contains("motors"));
        assert!(handle.snapshot().degraded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restore_session_snapshot() {
        let mock = Arc::new(MockTransport::new());
        let (mut agent, handle) = build(Pose::Unknown, mock);

        let json = r#"{
            "affect": {"axes": {"cortisol": "0.9", "gaba": "calm"}},
            "pose": "sitting",
            "effectiveness": {"Fi": 0.6}
        }"#;
        let snapshot: SessionSnapshot = serde_json::from_str(json).unwrap();
        agent.restore(&snapshot).await;

        let snap = handle.snapshot();
        assert_eq!(snap.pose, Pose::Sitting);
        assert!((snap.affect.get(Axis::Cortisol) - 0.9).abs() < 1e-6);
        assert_eq!(snap.affect.get(Axis::Gaba), agent.affect.baseline().get(Axis::Gaba));
        assert!((snap.effectiveness["Fi"] - 0.6).abs() < 1e-6);
        assert_eq!(snap.to_session().effectiveness["Fi"], LenientF32::from(0.6));
    }

    #[test]
    fn test_invalid_personality_is_error() {
        let mut config = KinemaConfig::default();
        config.personality.type_code = "XYZW".to_string();
        let result = CognitiveLoop::from_config(&config, Arc::new(MockTransport::new()));
        assert!(result.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_loop_lifecycle() {
        let mock = Arc::new(MockTransport::new());
        let (agent, handle) = build(Pose::Standing, mock.clone());
        let task = agent.spawn();

        handle.start().await.unwrap();
        handle.deliver_new(hello());
        tokio::time::sleep(Duration::from_millis(600)).await;

        let snap = handle.snapshot();
        assert_eq!(snap.session, SessionState::Running);
        assert!(snap.tick >= 1);
        assert_eq!(count(&mock, &wave()).await, 1);

        handle.force_position_reset(Pose::Sitting).await.unwrap();
        handle.stop().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let stopped_at = handle.snapshot().tick;
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(handle.snapshot().tick, stopped_at);

        handle.shutdown().await.unwrap();
        let last = task.await.unwrap();
        assert_eq!(last.session, SessionState::Idle);
        assert_eq!(last.pose, Pose::Sitting);
    }
}
