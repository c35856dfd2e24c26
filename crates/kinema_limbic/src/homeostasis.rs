//! Homeostasis configuration for the affect model
//!
//! Determines where the axes rest and how fast they return there when nothing
//! is happening.

use kinema_core::config::AffectConfig;
use kinema_core::AxisVector;
use serde::Serialize;

/// Configuration for baseline decay
#[derive(Debug, Clone, Serialize)]
pub struct HomeostasisConfig {
    /// Resting point, also the neutral reference for labelling
    pub baseline: AxisVector,
    /// Fraction of the remaining distance to baseline recovered per tick
    pub decay_rate: f32,
    /// Minimum normalised intensity for a non-neutral label
    pub neutral_threshold: f32,
}

impl Default for HomeostasisConfig {
    fn default() -> Self {
        Self {
            baseline: AxisVector::default(),
            decay_rate: 0.05,
            neutral_threshold: 0.08,
        }
    }
}

impl HomeostasisConfig {
    pub fn from_config(config: &AffectConfig) -> Self {
        Self {
            baseline: config.baseline_vector(),
            decay_rate: config.decay_rate as f32,
            neutral_threshold: config.neutral_threshold as f32,
        }
    }

    /// No decay at all; useful when a test needs deltas to stick
    pub fn frozen() -> Self {
        Self {
            decay_rate: 0.0,
            ..Self::default()
        }
    }

    /// Fraction of the distance to baseline closed after `elapsed_ticks` ticks.
    ///
    /// Compounds per tick, so it is always in `[0, 1]` and decay can never
    /// overshoot the baseline however many ticks were skipped.
    pub fn decay_factor(&self, elapsed_ticks: u32) -> f32 {
        if elapsed_ticks == 0 || !self.decay_rate.is_finite() {
            return 0.0;
        }
        let rate = self.decay_rate.clamp(0.0, 1.0);
        let remaining = (1.0 - rate).powi(elapsed_ticks.min(i32::MAX as u32) as i32);
        (1.0 - remaining).clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decay_factor_bounds() {
        let cfg = HomeostasisConfig::default();
        assert_eq!(cfg.decay_factor(0), 0.0);
        assert!((cfg.decay_factor(1) - 0.05).abs() < 1e-6);
        assert!(cfg.decay_factor(10) > cfg.decay_factor(1));
        assert!(cfg.decay_factor(u32::MAX) <= 1.0);
    }

    #[test]
    fn test_frozen_never_decays() {
        assert_eq!(HomeostasisConfig::frozen().decay_factor(100), 0.0);
    }

    #[test]
    fn test_from_config_carries_baseline() {
        let mut affect = AffectConfig::default();
        affect.baseline.insert("gaba".to_string(), 0.9);
        affect.decay_rate = 0.2;
        let cfg = HomeostasisConfig::from_config(&affect);
        assert!((cfg.baseline.get(kinema_core::Axis::Gaba) - 0.9).abs() < 1e-6);
        assert!((cfg.decay_rate - 0.2).abs() < 1e-6);
    }
}
