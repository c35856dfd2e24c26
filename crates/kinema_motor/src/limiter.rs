//! Timing discipline for the controller.
//!
//! Pure bookkeeping over `tokio::time::Instant`: the limiter never sleeps itself,
//! it only says whether a request may go now, must wait, or is rejected.

use crate::command::{CommandClass, CommandRequest};
use kinema_core::config::DispatchConfig;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimits {
    /// Minimum gap before a general command, measured from the last dispatch of any class.
    pub general_interval: Duration,
    /// Minimum gap before a critical command, measured from the last dispatch of any class.
    pub critical_interval: Duration,
    /// Identical `(target, payload)` inside this window collapse to one dispatch.
    pub dedup_window: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            general_interval: Duration::from_secs(2),
            critical_interval: Duration::from_millis(500),
            dedup_window: Duration::from_millis(400),
        }
    }
}

impl RateLimits {
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self {
            general_interval: config.general_interval(),
            critical_interval: config.critical_interval(),
            dedup_window: config.dedup_window(),
        }
    }
}

/// Verdict for a request that is not a duplicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Now,
    /// Critical lane only: send after this long.
    Wait(Duration),
    /// General lane only: drop; the window reopens after this long.
    Reject { retry_after: Duration },
}

#[derive(Debug)]
struct RecentCommand {
    target: String,
    payload: String,
    at: Instant,
}

#[derive(Debug)]
pub struct RateLimiter {
    limits: RateLimits,
    last_general: Option<Instant>,
    last_critical: Option<Instant>,
    recent: VecDeque<RecentCommand>,
}

impl RateLimiter {
    pub fn new(limits: RateLimits) -> Self {
        Self {
            limits,
            last_general: None,
            last_critical: None,
            recent: VecDeque::new(),
        }
    }

    fn last_any(&self) -> Option<Instant> {
        match (self.last_general, self.last_critical) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }

    /// Same target and payload already dispatched within the dedup window.
    pub fn is_duplicate(&self, request: &CommandRequest, now: Instant) -> bool {
        let payload = request.payload();
        self.recent.iter().any(|r| {
            r.target == request.target()
                && r.payload == payload
                && now.saturating_duration_since(r.at) < self.limits.dedup_window
        })
    }

    pub fn admit(&self, class: CommandClass, now: Instant) -> Admission {
        let since_last = match self.last_any() {
            Some(at) => now.saturating_duration_since(at),
            None => return Admission::Now,
        };
        match class {
            CommandClass::General if since_last < self.limits.general_interval => {
                Admission::Reject {
                    retry_after: self.limits.general_interval - since_last,
                }
            }
            CommandClass::Critical if since_last < self.limits.critical_interval => {
                Admission::Wait(self.limits.critical_interval - since_last)
            }
            _ => Admission::Now,
        }
    }

    /// Stamp a dispatch attempt. Failed attempts are stamped too: the controller
    /// still saw the traffic.
    pub fn record(&mut self, request: &CommandRequest, now: Instant) {
        match request.class {
            CommandClass::General => self.last_general = Some(now),
            CommandClass::Critical => self.last_critical = Some(now),
        }
        self.prune(now);
        self.recent.push_back(RecentCommand {
            target: request.target().to_string(),
            payload: request.payload(),
            at: now,
        });
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.recent.front() {
            if now.saturating_duration_since(front.at) >= self.limits.dedup_window {
                self.recent.pop_front();
            } else {
                break;
            }
        }
    }
}
