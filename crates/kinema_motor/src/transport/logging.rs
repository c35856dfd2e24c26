//! Dry-run transport: accepts everything, moves nothing.

use super::{ControllerTransport, TransportError};
use async_trait::async_trait;
use kinema_core::ControllerCommand;

#[derive(Debug, Clone, Default)]
pub struct LoggingTransport;

impl LoggingTransport {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ControllerTransport for LoggingTransport {
    async fn send(&self, command: &ControllerCommand) -> Result<(), TransportError> {
        tracing::info!("[dry-run] {}", command);
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}
