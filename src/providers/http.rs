//! HTTP completion client
//!
//! Posts `{"text": <prompt>}` to a single configured URL and decodes whatever
//! comes back into a [`ReplyPayload`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use super::{CompletionClient, ReplyPayload, TransportError};

/// Endpoint configuration
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    /// Full URL the prompt is posted to
    pub url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl EndpointConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 60,
        }
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    text: &'a str,
}

pub struct HttpCompletionClient {
    config: EndpointConfig,
    client: Client,
}

impl HttpCompletionClient {
    pub fn new(config: EndpointConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, prompt: &str) -> Result<ReplyPayload, TransportError> {
        let response = self
            .client
            .post(&self.config.url)
            .json(&CompletionRequest { text: prompt })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(status = status.as_u16(), bytes = body.len(), "completion received");

        Ok(ReplyPayload::from_body(&body))
    }
}
