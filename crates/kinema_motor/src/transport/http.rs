//! JSON-over-HTTP controller transport.

use super::{ControllerTransport, TransportError};
use anyhow::{Context, Result};
use async_trait::async_trait;
use kinema_core::ControllerCommand;
use serde::Serialize;

#[derive(Serialize)]
struct CommandBody<'a> {
    module: &'a str,
    command: &'a str,
    argument: Option<&'a str>,
}

/// POSTs `{"module","command","argument"}` to `{base_url}/command`.
///
/// No timeout is configured on the client; the dispatcher bounds every call.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self> {
        let base = base_url.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            anyhow::bail!("Controller URL must start with http:// or https://: {}", base_url);
        }
        let client = reqwest::Client::builder()
            .build()
            .context("Failed to build controller HTTP client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/command", base),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ControllerTransport for HttpTransport {
    async fn send(&self, command: &ControllerCommand) -> Result<(), TransportError> {
        let body = CommandBody {
            module: &command.module,
            command: &command.command,
            argument: command.argument.as_deref(),
        };
        let response = self.client.post(&self.endpoint).json(&body).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
