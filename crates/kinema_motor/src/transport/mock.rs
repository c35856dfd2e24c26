//! Mock controller with scripted responses, for testing without hardware.

use super::{ControllerTransport, TransportError};
use async_trait::async_trait;
use kinema_core::ControllerCommand;
use std::time::Duration;
use tokio::sync::Mutex;

#[derive(Debug, Default)]
struct MockState {
    attempts: Vec<ControllerCommand>,
    sent: Vec<ControllerCommand>,
    fail_next: u32,
    always_fail: bool,
}

#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call fails.
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(MockState {
                always_fail: true,
                ..MockState::default()
            }),
            delay: None,
        }
    }

    /// The first `n` calls fail, later ones succeed.
    pub fn failing_first(n: u32) -> Self {
        Self {
            state: Mutex::new(MockState {
                fail_next: n,
                ..MockState::default()
            }),
            delay: None,
        }
    }

    /// Each call takes this long before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn set_failing(&self, failing: bool) {
        self.state.lock().await.always_fail = failing;
    }

    /// Every call made, including failed ones.
    pub async fn attempts(&self) -> Vec<ControllerCommand> {
        self.state.lock().await.attempts.clone()
    }

    /// Calls that succeeded.
    pub async fn sent(&self) -> Vec<ControllerCommand> {
        self.state.lock().await.sent.clone()
    }
}

#[async_trait]
impl ControllerTransport for MockTransport {
    async fn send(&self, command: &ControllerCommand) -> Result<(), TransportError> {
        self.state.lock().await.attempts.push(command.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.always_fail {
            return Err(TransportError::Unavailable("mock controller is down".into()));
        }
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(TransportError::Unavailable("scripted failure".into()));
        }
        state.sent.push(command.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
