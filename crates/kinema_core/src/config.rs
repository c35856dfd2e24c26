use crate::affect::{Axis, AxisVector};
use crate::persona::{FunctionKind, FunctionRole, FunctionWeights, PersonalityProfile, ProfileError};
use crate::skill::{Pose, Skill, SkillRegistry};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// ============================================================================
// Top-level config
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct KinemaConfig {
    pub agent: AgentConfig,
    pub affect: AffectConfig,
    pub dispatch: DispatchConfig,
    pub controller: ControllerConfig,
    pub personality: PersonalityConfig,
    pub position: PositionConfig,
    pub skills: Vec<Skill>,
    pub persistence: PersistenceConfig,
}

impl KinemaConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    /// After loading, env var overrides are applied and values are validated.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let mut config: KinemaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse TOML config")?;
        config.apply_env_overrides();
        config.validate();
        Ok(config)
    }

    /// Try to load from path; if the file doesn't exist or is invalid, return
    /// defaults with env overrides.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::info!("Config file not found or invalid ({}), using defaults", e);
                let mut cfg = Self::default();
                cfg.apply_env_overrides();
                cfg.validate();
                cfg
            }
        }
    }

    /// Apply environment variable overrides on top of file-based config.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `KINEMA_*` overrides resolved through `lookup`.
    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("KINEMA_CONTROLLER_URL") {
            self.controller.base_url = v;
        }
        if let Some(v) = lookup("KINEMA_PERSONALITY") {
            self.personality.type_code = v;
            self.personality.functions.clear();
        }
        if let Some(v) = lookup("KINEMA_TICK_MS") {
            if let Ok(n) = v.parse() {
                self.agent.tick_interval_ms = n;
            }
        }
        if let Some(v) = lookup("KINEMA_DRY_RUN") {
            self.controller.dry_run = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }

    /// Coerce malformed values back to documented defaults, once, at load time.
    pub fn validate(&mut self) {
        let d = AgentConfig::default();
        if self.agent.tick_interval_ms == 0 {
            tracing::warn!("agent.tick_interval_ms must be positive, using {}", d.tick_interval_ms);
            self.agent.tick_interval_ms = d.tick_interval_ms;
        }
        if self.agent.degrade_after_failures == 0 {
            self.agent.degrade_after_failures = d.degrade_after_failures;
        }
        if self.agent.degraded_probe_ticks == 0 {
            self.agent.degraded_probe_ticks = d.degraded_probe_ticks;
        }
        if self.agent.outbox_capacity == 0 {
            tracing::warn!("agent.outbox_capacity must be positive, using {}", d.outbox_capacity);
            self.agent.outbox_capacity = d.outbox_capacity;
        }

        let d = AffectConfig::default();
        coerce("affect.decay_rate", &mut self.affect.decay_rate, 0.0, 1.0, d.decay_rate);
        coerce(
            "affect.neutral_threshold",
            &mut self.affect.neutral_threshold,
            0.0,
            1.0,
            d.neutral_threshold,
        );

        let d = DispatchConfig::default();
        coerce(
            "dispatch.general_interval_secs",
            &mut self.dispatch.general_interval_secs,
            0.0,
            60.0,
            d.general_interval_secs,
        );
        coerce(
            "dispatch.critical_interval_secs",
            &mut self.dispatch.critical_interval_secs,
            0.0,
            60.0,
            d.critical_interval_secs,
        );
        coerce(
            "dispatch.dedup_window_secs",
            &mut self.dispatch.dedup_window_secs,
            0.0,
            10.0,
            d.dedup_window_secs,
        );
        coerce(
            "dispatch.timeout_secs",
            &mut self.dispatch.timeout_secs,
            0.01,
            120.0,
            d.timeout_secs,
        );
        if self.dispatch.critical_interval_secs > self.dispatch.general_interval_secs {
            tracing::warn!(
                "dispatch.critical_interval_secs ({}) exceeds general interval ({}), clamping",
                self.dispatch.critical_interval_secs,
                self.dispatch.general_interval_secs
            );
            self.dispatch.critical_interval_secs = self.dispatch.general_interval_secs;
        }
        if self.dispatch.log_capacity == 0 {
            self.dispatch.log_capacity = d.log_capacity;
        }

        let d = PersonalityConfig::default();
        coerce_f32(
            "personality.auxiliary_weight",
            &mut self.personality.auxiliary_weight,
            0.3,
            1.0,
            d.auxiliary_weight,
        );
        coerce_f32(
            "personality.inferior_weight",
            &mut self.personality.inferior_weight,
            0.3,
            1.0,
            d.inferior_weight,
        );
        coerce_f32(
            "personality.inferior_falloff",
            &mut self.personality.inferior_falloff,
            0.0,
            1.0,
            d.inferior_falloff,
        );
        coerce_f32(
            "personality.reinforcement_rate",
            &mut self.personality.reinforcement_rate,
            0.0,
            1.0,
            d.reinforcement_rate,
        );

        if self.position.history_capacity == 0 {
            self.position.history_capacity = PositionConfig::default().history_capacity;
        }
    }

    /// Skill table from config, or the built-in table when none is configured.
    pub fn skill_registry(&self) -> SkillRegistry {
        if self.skills.is_empty() {
            SkillRegistry::with_defaults()
        } else {
            SkillRegistry::from_skills(self.skills.clone())
        }
    }
}

fn coerce(name: &str, value: &mut f64, min: f64, max: f64, default: f64) {
    if !value.is_finite() || *value < min || *value > max {
        tracing::warn!(
            "{} = {} outside [{}, {}], using default {}",
            name,
            value,
            min,
            max,
            default
        );
        *value = default;
    }
}

fn coerce_f32(name: &str, value: &mut f32, min: f32, max: f32, default: f32) {
    let mut wide = *value as f64;
    coerce(name, &mut wide, min as f64, max as f64, default as f64);
    *value = wide as f32;
}

// ============================================================================
// Sub-configs
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub tick_interval_ms: u64,
    /// How many later ticks a rate-limited command is re-proposed on.
    pub max_reproposals: u32,
    /// Most re-proposals held at once; the oldest is dropped to make room.
    pub outbox_capacity: usize,
    /// Consecutive failed physical dispatches before degrading to verbal-only.
    pub degrade_after_failures: u32,
    /// While degraded, let one physical action through every this many ticks.
    pub degraded_probe_ticks: u64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            max_reproposals: 3,
            outbox_capacity: 4,
            degrade_after_failures: 3,
            degraded_probe_ticks: 20,
        }
    }
}

impl AgentConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AffectConfig {
    /// Per-axis resting values. Axes not listed keep the built-in baseline.
    pub baseline: BTreeMap<String, f32>,
    /// Fraction of the distance to baseline recovered per tick.
    pub decay_rate: f64,
    /// Minimum normalised intensity for a non-neutral label.
    pub neutral_threshold: f64,
}

impl Default for AffectConfig {
    fn default() -> Self {
        Self {
            baseline: BTreeMap::new(),
            decay_rate: 0.05,
            neutral_threshold: 0.08,
        }
    }
}

impl AffectConfig {
    pub fn baseline_vector(&self) -> AxisVector {
        let mut baseline = AxisVector::default();
        for (name, value) in &self.baseline {
            match name.parse::<Axis>() {
                Ok(axis) if value.is_finite() => baseline.set(axis, *value),
                Ok(axis) => tracing::warn!("affect.baseline.{} is not finite, ignoring", axis),
                Err(e) => tracing::warn!("affect.baseline: {}, ignoring", e),
            }
        }
        baseline
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub general_interval_secs: f64,
    pub critical_interval_secs: f64,
    pub dedup_window_secs: f64,
    pub timeout_secs: f64,
    pub retry_critical: bool,
    pub log_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            general_interval_secs: 2.0,
            critical_interval_secs: 0.5,
            dedup_window_secs: 0.4,
            timeout_secs: 3.0,
            retry_critical: true,
            log_capacity: 64,
        }
    }
}

impl DispatchConfig {
    pub fn general_interval(&self) -> Duration {
        Duration::from_secs_f64(self.general_interval_secs)
    }

    pub fn critical_interval(&self) -> Duration {
        Duration::from_secs_f64(self.critical_interval_secs)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs_f64(self.dedup_window_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    pub base_url: String,
    /// Log commands instead of sending them.
    pub dry_run: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionEntry {
    pub kind: String,
    pub role: FunctionRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersonalityConfig {
    pub type_code: String,
    /// Explicit stack. When non-empty it replaces the type code.
    pub functions: Vec<FunctionEntry>,
    pub auxiliary_weight: f32,
    pub inferior_weight: f32,
    pub inferior_falloff: f32,
    pub reinforcement_rate: f32,
    pub greeting_skill: String,
    pub farewell_skill: String,
}

impl Default for PersonalityConfig {
    fn default() -> Self {
        Self {
            type_code: "ENFP".to_string(),
            functions: Vec::new(),
            auxiliary_weight: 0.8,
            inferior_weight: 0.5,
            inferior_falloff: 1.0,
            reinforcement_rate: 0.05,
            greeting_skill: "wave".to_string(),
            farewell_skill: "bow".to_string(),
        }
    }
}

impl PersonalityConfig {
    pub fn weights(&self) -> FunctionWeights {
        FunctionWeights {
            dominant: 1.0,
            auxiliary: self.auxiliary_weight,
            inferior: self.inferior_weight,
            inferior_falloff: self.inferior_falloff,
        }
    }

    pub fn build_profile(&self) -> Result<PersonalityProfile, ProfileError> {
        let weights = self.weights();
        if self.functions.is_empty() {
            return PersonalityProfile::from_type_code(&self.type_code, &weights);
        }
        let ranked = self
            .functions
            .iter()
            .map(|entry| entry.kind.parse::<FunctionKind>().map(|k| (k, entry.role)))
            .collect::<Result<Vec<_>, _>>()?;
        PersonalityProfile::from_ranked(&ranked, &weights)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub initial: Pose,
    pub history_capacity: usize,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            initial: Pose::Unknown,
            history_capacity: 16,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub snapshot_path: PathBuf,
    pub save_every_ticks: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from("kinema_session.json"),
            save_every_ticks: 40,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
