//! Commands the rate limiter turned away, waiting for the general lane to reopen.
//!
//! The dispatcher never queues; the loop does, briefly, so an utterance that
//! accompanies a gesture isn't lost just because the gesture used the window.
//! Only verbal requests wait here. A rate-limited physical skill is rejected,
//! and the queue is bounded: when full, the oldest utterance is dropped.

use kinema_motor::CommandRequest;
use serde::Serialize;
use std::collections::VecDeque;
use tokio::time::Instant;

#[derive(Debug, Clone)]
struct Pending {
    request: CommandRequest,
    reproposals: u32,
    not_before: Instant,
}

#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    pub command: String,
    pub reproposals: u32,
}

#[derive(Debug)]
pub struct Outbox {
    queue: VecDeque<Pending>,
    max_reproposals: u32,
    capacity: usize,
}

impl Outbox {
    /// `capacity` is raised to at least one.
    pub fn new(max_reproposals: u32, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            queue: VecDeque::with_capacity(capacity),
            max_reproposals,
            capacity,
        }
    }

    /// Queue a fresh request to try on a later tick.
    pub fn push(&mut self, request: CommandRequest, not_before: Instant) {
        self.requeue(request, 0, not_before);
    }

    /// Put a re-proposed request back after another rejection. Dropped once it
    /// has used up its re-proposals.
    pub fn requeue(&mut self, request: CommandRequest, reproposals: u32, not_before: Instant) {
        if request.is_physical() {
            tracing::debug!("Outbox: {} rejected, not queued", request);
            return;
        }
        if reproposals >= self.max_reproposals {
            if reproposals > 0 {
                tracing::debug!(
                    "Outbox: giving up on {} after {} re-proposals",
                    request,
                    reproposals
                );
            }
            return;
        }
        if self.queue.len() >= self.capacity {
            if let Some(oldest) = self.queue.pop_front() {
                tracing::debug!("Outbox full, dropping {}", oldest.request);
            }
        }
        self.queue.push_back(Pending {
            request,
            reproposals,
            not_before,
        });
    }

    /// Oldest request whose wait has elapsed, with the re-proposal count it will
    /// have once sent.
    pub fn pop_ready(&mut self, now: Instant) -> Option<(CommandRequest, u32)> {
        let index = self.queue.iter().position(|p| p.not_before <= now)?;
        self.queue
            .remove(index)
            .map(|p| (p.request, p.reproposals + 1))
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn summary(&self) -> Vec<PendingSummary> {
        self.queue
            .iter()
            .map(|p| PendingSummary {
                command: p.request.command.to_string(),
                reproposals: p.reproposals,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinema_core::ControllerCommand;
    use std::time::Duration;

    #[test]
    fn test_pop_respects_not_before() {
        let mut outbox = Outbox::new(3, 4);
        let now = Instant::now();
        outbox.push(CommandRequest::speech("later"), now + Duration::from_secs(1));
        outbox.push(CommandRequest::speech("soon"), now);

        let (req, n) = outbox.pop_ready(now).unwrap();
        assert_eq!(req.command.argument.as_deref(), Some("soon"));
        assert_eq!(n, 1);
        assert!(outbox.pop_ready(now).is_none());
        assert!(outbox.pop_ready(now + Duration::from_secs(1)).is_some());
    }

    #[test]
    fn test_reproposal_budget() {
        let mut outbox = Outbox::new(2, 4);
        let now = Instant::now();
        outbox.push(CommandRequest::speech("hi"), now);
        let (req, n) = outbox.pop_ready(now).unwrap();
        outbox.requeue(req, n, now);
        let (req, n) = outbox.pop_ready(now).unwrap();
        assert_eq!(n, 2);
        outbox.requeue(req, n, now);
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_zero_budget_never_queues() {
        let mut outbox = Outbox::new(0, 4);
        outbox.push(CommandRequest::speech("hi"), Instant::now());
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_physical_request_is_rejected() {
        let mut outbox = Outbox::new(3, 4);
        let wave = ControllerCommand::new("motion", "play").with_argument("wave");
        outbox.push(CommandRequest::general(wave), Instant::now());
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_full_outbox_drops_oldest() {
        let mut outbox = Outbox::new(3, 2);
        let now = Instant::now();
        for text in ["one", "two", "three"] {
            outbox.push(CommandRequest::speech(text), now);
        }
        assert_eq!(outbox.len(), 2);

        let (first, _) = outbox.pop_ready(now).unwrap();
        assert_eq!(first.command.argument.as_deref(), Some("two"));
        let (second, _) = outbox.pop_ready(now).unwrap();
        assert_eq!(second.command.argument.as_deref(), Some("three"));
    }
}
