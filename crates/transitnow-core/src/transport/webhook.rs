//! Webhook transport -- POST each message as `{"content": ...}`.

use std::time::Duration;

use reqwest::Client;
use serde_json::json;

use super::Transport;
use crate::error::TransportError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebhookTransport {
    url: String,
    client: Client,
    runtime: tokio::runtime::Runtime,
}

impl WebhookTransport {
    /// Create a transport posting to `url`. Owns a single-threaded runtime
    /// so it can be driven from synchronous code.
    pub fn new(url: impl Into<String>) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TransportError::permanent("webhook", e.to_string()))?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| TransportError::permanent("webhook", e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Transport for WebhookTransport {
    fn name(&self) -> &str {
        "webhook"
    }

    fn post(&mut self, text: &str) -> Result<(), TransportError> {
        self.post_within(text, REQUEST_TIMEOUT)
    }

    fn post_within(&mut self, text: &str, limit: Duration) -> Result<(), TransportError> {
        let body = json!({ "content": text });
        let request = self
            .client
            .post(&self.url)
            .timeout(limit.min(REQUEST_TIMEOUT))
            .json(&body)
            .send();

        let resp = self
            .runtime
            .block_on(request)
            .map_err(|e| TransportError::retriable("webhook", e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let detail = self.runtime.block_on(resp.text()).unwrap_or_default();
        let message = format!("HTTP {status}: {detail}");
        if status.is_server_error() || status.as_u16() == 429 {
            Err(TransportError::retriable("webhook", message))
        } else {
            Err(TransportError::permanent("webhook", message))
        }
    }
}
