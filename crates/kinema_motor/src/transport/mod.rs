//! The seam between the dispatcher and the physical controller.

use async_trait::async_trait;
use kinema_core::ControllerCommand;
use thiserror::Error;

mod http;
mod logging;
mod mock;

pub use http::HttpTransport;
pub use logging::LoggingTransport;
pub use mock::MockTransport;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("controller unreachable: {0}")]
    Connection(#[from] reqwest::Error),
    #[error("controller rejected command ({status}): {body}")]
    Status { status: u16, body: String },
    #[error("controller unavailable: {0}")]
    Unavailable(String),
}

#[async_trait]
pub trait ControllerTransport: Send + Sync {
    /// Deliver one command. Returns once the controller has accepted it.
    async fn send(&self, command: &ControllerCommand) -> Result<(), TransportError>;

    /// Short label for logs.
    fn name(&self) -> &str;
}
