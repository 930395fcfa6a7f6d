//! Delivery channels for announcements.

mod console;
mod outbox;
mod webhook;

pub use console::ConsoleTransport;
pub use outbox::{OutboxRecord, OutboxTransport};
pub use webhook::WebhookTransport;

use std::time::Duration;

use crate::error::{ConfigError, TransportError};
use crate::storage::{EmitConfig, TransportKind};

/// Every output channel implements this trait.
/// The consumer decides whether to retry from [`TransportError::retriable`].
pub trait Transport {
    /// Short identifier used in logs (e.g. "console", "webhook").
    fn name(&self) -> &str;

    /// Deliver one message.
    fn post(&mut self, text: &str) -> Result<(), TransportError>;

    /// Deliver one message, giving up once `limit` has passed.
    ///
    /// Transports that cannot block for long may rely on the default, which
    /// ignores the limit.
    fn post_within(&mut self, text: &str, _limit: Duration) -> Result<(), TransportError> {
        self.post(text)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn post(&mut self, text: &str) -> Result<(), TransportError> {
        (**self).post(text)
    }

    fn post_within(&mut self, text: &str, limit: Duration) -> Result<(), TransportError> {
        (**self).post_within(text, limit)
    }
}

/// Build the transport selected in `[emit]`.
///
/// # Errors
///
/// Fails when the webhook transport is selected without a URL, or its HTTP
/// client cannot be created.
pub fn from_config(
    config: &EmitConfig,
    data_dir: &std::path::Path,
) -> Result<Box<dyn Transport>, ConfigError> {
    match config.transport {
        TransportKind::Console => Ok(Box::new(ConsoleTransport::stdout())),
        TransportKind::Outbox => Ok(Box::new(OutboxTransport::new(data_dir.join("outbox.jsonl")))),
        TransportKind::Webhook => {
            let url = config
                .webhook_url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ConfigError::InvalidValue {
                    key: "emit.webhook_url".into(),
                    message: "required when emit.transport = \"webhook\"".into(),
                })?;
            let transport = WebhookTransport::new(url).map_err(|e| ConfigError::InvalidValue {
                key: "emit.webhook_url".into(),
                message: e.to_string(),
            })?;
            Ok(Box::new(transport))
        }
    }
}
