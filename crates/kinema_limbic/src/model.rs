//! The affect model itself
//!
//! Holds the live axis vector and the labelled snapshot derived from it. Every
//! mutation re-derives the labels before returning, so `current()` is never stale.

use crate::homeostasis::HomeostasisConfig;
use kinema_core::state::sanitize_f32;
use kinema_core::{AffectDelta, AffectSnapshot, AffectiveState, Axis, AxisVector};

pub struct AffectModel {
    config: HomeostasisConfig,
    axes: AxisVector,
    current: AffectiveState,
}

impl AffectModel {
    /// Start at the baseline.
    pub fn new(config: HomeostasisConfig) -> Self {
        let axes = config.baseline;
        let current = AffectiveState::derive(axes, &config.baseline, config.neutral_threshold);
        Self {
            config,
            axes,
            current,
        }
    }

    pub fn config(&self) -> &HomeostasisConfig {
        &self.config
    }

    pub fn baseline(&self) -> &AxisVector {
        &self.config.baseline
    }

    /// Read-only snapshot.
    pub fn current(&self) -> AffectiveState {
        self.current.clone()
    }

    /// Apply signed deltas keyed by axis name.
    ///
    /// Unknown axis names and non-finite values are skipped one by one with a
    /// warning; the remaining entries still apply.
    pub fn apply_delta<I, K>(&mut self, deltas: I) -> AffectiveState
    where
        I: IntoIterator<Item = (K, f32)>,
        K: AsRef<str>,
    {
        let mut changed = false;
        for (name, value) in deltas {
            let name = name.as_ref();
            let axis = match name.parse::<Axis>() {
                Ok(axis) => axis,
                Err(e) => {
                    tracing::warn!("Ignoring affect delta: {}", e);
                    continue;
                }
            };
            if !value.is_finite() {
                tracing::warn!("Ignoring non-finite affect delta {} on {}", value, axis);
                continue;
            }
            if value == 0.0 {
                continue;
            }
            self.axes.set(axis, self.axes.get(axis) + value);
            changed = true;
        }
        if changed {
            self.rederive();
        }
        self.current()
    }

    /// Typed convenience over `apply_delta`.
    pub fn apply(&mut self, delta: &AffectDelta) -> AffectiveState {
        self.apply_delta(delta.named())
    }

    /// Pull every axis toward baseline for `elapsed_ticks` ticks of homeostasis.
    pub fn decay(&mut self, elapsed_ticks: u32) -> AffectiveState {
        let factor = self.config.decay_factor(elapsed_ticks);
        if factor <= 0.0 {
            return self.current();
        }
        for axis in Axis::ALL {
            let value = self.axes.get(axis);
            let target = self.config.baseline.get(axis);
            self.axes.set(axis, value + (target - value) * factor);
        }
        self.rederive();
        self.current()
    }

    /// Plain values for the persistence collaborator.
    pub fn snapshot(&self) -> AffectSnapshot {
        AffectSnapshot::from_axes(&self.axes)
    }

    /// Restore persisted values. Missing or malformed axes take the baseline value.
    /// Returns the axes that fell back.
    pub fn restore(&mut self, snapshot: &AffectSnapshot) -> Vec<Axis> {
        let (axes, fell_back) = snapshot.to_axes(&self.config.baseline);
        for axis in &fell_back {
            tracing::warn!(
                "Persisted affect axis '{}' missing or malformed, using baseline {}",
                axis,
                self.config.baseline.get(*axis)
            );
        }
        self.axes = axes;
        self.rederive();
        fell_back
    }

    fn rederive(&mut self) {
        for axis in Axis::ALL {
            let fallback = self.config.baseline.get(axis);
            self.axes.set(axis, sanitize_f32(self.axes.get(axis), fallback));
        }
        self.current = AffectiveState::derive(
            self.axes,
            &self.config.baseline,
            self.config.neutral_threshold,
        );
    }
}

impl Default for AffectModel {
    fn default() -> Self {
        Self::new(HomeostasisConfig::default())
    }
}
