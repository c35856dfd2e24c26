//! Single-slot handoff between perception front ends and the loop.
//!
//! Front ends run on their own tasks or plain threads, so the slot uses a
//! synchronous lock that is only ever held for a copy. A newer event replaces an
//! unconsumed older one. `deliver_new` also raises a reset flag that the loop
//! consumes to clear its speech-act tracker; `redeliver` does not. The flag and
//! the event it belongs to are always read together.

use kinema_core::PerceivedEvent;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct SlotState {
    event: Option<(u64, PerceivedEvent)>,
    next_seq: u64,
    reset_pending: bool,
}

#[derive(Debug, Default)]
pub struct PerceptionSlot {
    state: Mutex<SlotState>,
}

impl PerceptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Genuinely new raw input.
    pub fn deliver_new(&self, event: PerceivedEvent) {
        let mut state = self.state.lock();
        state.reset_pending = true;
        Self::put(&mut state, event);
    }

    /// The same input handed over again (re-read buffer, repeated caption, ...).
    pub fn redeliver(&self, event: PerceivedEvent) {
        let mut state = self.state.lock();
        Self::put(&mut state, event);
    }

    fn put(state: &mut SlotState, event: PerceivedEvent) {
        state.next_seq += 1;
        if let Some((_, dropped)) = state.event.replace((state.next_seq, event)) {
            tracing::debug!("PerceptionSlot: replaced unconsumed event '{}'", dropped.content);
        }
    }

    /// Consume the "new raw input" flag and copy the pending event with its
    /// sequence number, under one lock. The event stays in place until
    /// `clear_if`.
    pub fn take(&self) -> (bool, Option<(u64, PerceivedEvent)>) {
        let mut state = self.state.lock();
        let reset = std::mem::take(&mut state.reset_pending);
        (reset, state.event.clone())
    }

    /// Clear the slot, but only if it still holds event `seq`. A newer event
    /// delivered meanwhile survives. Returns whether anything was cleared.
    pub fn clear_if(&self, seq: u64) -> bool {
        let mut state = self.state.lock();
        let matches = matches!(state.event, Some((current, _)) if current == seq);
        if matches {
            state.event = None;
        }
        matches
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().event.is_none()
    }
}
