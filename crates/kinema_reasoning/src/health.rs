//! Actuator health: when physical dispatches keep failing, stop trying to move
//! and answer verbally, probing now and then to see if the controller is back.

use kinema_core::config::AgentConfig;

#[derive(Debug, Clone)]
pub struct ActuatorHealth {
    degrade_after: u32,
    probe_every: u64,
    consecutive_failures: u32,
    degraded_since: Option<u64>,
}

impl Default for ActuatorHealth {
    fn default() -> Self {
        Self::new(3, 20)
    }
}

impl ActuatorHealth {
    pub fn new(degrade_after: u32, probe_every: u64) -> Self {
        Self {
            degrade_after: degrade_after.max(1),
            probe_every: probe_every.max(1),
            consecutive_failures: 0,
            degraded_since: None,
        }
    }

    pub fn from_config(config: &AgentConfig) -> Self {
        Self::new(config.degrade_after_failures, config.degraded_probe_ticks)
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded_since.is_some()
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Whether a physical action may be attempted on `tick`. While degraded only
    /// every `probe_every`-th tick is let through.
    pub fn allow_physical(&self, tick: u64) -> bool {
        match self.degraded_since {
            None => true,
            Some(since) => tick > since && (tick - since) % self.probe_every == 0,
        }
    }

    /// Feed the result of a physical dispatch that actually reached the transport.
    pub fn record(&mut self, ok: bool, tick: u64) {
        if ok {
            if self.degraded_since.take().is_some() {
                tracing::info!("Actuators responding again, physical actions restored");
            }
            self.consecutive_failures = 0;
            return;
        }
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        if self.consecutive_failures >= self.degrade_after && self.degraded_since.is_none() {
            tracing::warn!(
                "{} consecutive physical dispatch failures, degrading to verbal-only",
                self.consecutive_failures
            );
            self.degraded_since = Some(tick);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degrades_after_threshold() {
        let mut health = ActuatorHealth::new(3, 5);
        health.record(false, 1);
        health.record(false, 2);
        assert!(!health.is_degraded());
        health.record(false, 3);
        assert!(health.is_degraded());
        assert!(!health.allow_physical(4));
    }

    #[test]
    fn test_probe_ticks() {
        let mut health = ActuatorHealth::new(1, 5);
        health.record(false, 10);
        assert!(!health.allow_physical(10));
        assert!(!health.allow_physical(14));
        assert!(health.allow_physical(15));
        assert!(health.allow_physical(20));
    }

    #[test]
    fn test_success_restores() {
        let mut health = ActuatorHealth::new(1, 5);
        health.record(false, 1);
        assert!(health.is_degraded());
        health.record(true, 6);
        assert!(!health.is_degraded());
        assert_eq!(health.consecutive_failures(), 0);
        assert!(health.allow_physical(7));
    }

    #[test]
    fn test_success_resets_streak() {
        let mut health = ActuatorHealth::new(2, 5);
        health.record(false, 1);
        health.record(true, 2);
        health.record(false, 3);
        assert!(!health.is_degraded());
    }
}
