//! Telegram bot API sink.
//!
//! Each message becomes one `sendMessage` call:
//!
//! ```text
//! POST {api_base}/bot{token}/sendMessage
//! Content-Type: application/x-www-form-urlencoded
//!
//! chat_id=<chat id>&text=<message>
//! ```
//!
//! Only transport failures are reported as delivery errors. A response with a
//! non-2xx status (bad token, unknown chat, rate limit) is logged and otherwise
//! treated as delivered; callers relying on delivery confirmation should not
//! use this sink.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{Sink, SinkError, SinkKind};
use crate::settings::DEFAULT_TELEGRAM_API_BASE;

pub struct TelegramSink {
    token: String,
    chat_id: String,
    api_base: String,
    client: reqwest::Client,
    closed: bool,
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("chat_id", &self.chat_id)
            .field("api_base", &self.api_base)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl TelegramSink {
    /// Store credentials; no connection is made until the first delivery.
    pub fn new(token: &str, chat_id: &str) -> Result<Self, SinkError> {
        Self::with_api_base(token, chat_id, DEFAULT_TELEGRAM_API_BASE)
    }

    /// Like [`TelegramSink::new`], against a different bot API server.
    pub fn with_api_base(token: &str, chat_id: &str, api_base: &str) -> Result<Self, SinkError> {
        if token.trim().is_empty() {
            return Err(SinkError::MissingCredentials("telegram.token".to_string()));
        }
        if chat_id.trim().is_empty() {
            return Err(SinkError::MissingCredentials("telegram.chat_id".to_string()));
        }

        Ok(Self {
            token: token.to_string(),
            chat_id: chat_id.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            closed: false,
        })
    }

    /// The `sendMessage` URL for this bot.
    pub fn endpoint(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base, self.token)
    }

    async fn send_message(&self, message: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .post(self.endpoint())
            .form(&[("chat_id", self.chat_id.as_str()), ("text", message)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // Reported, not escalated: see module docs.
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                "Telegram API answered {} for chat {}: {}",
                status,
                self.chat_id,
                body
            );
        }

        Ok(())
    }
}

#[async_trait]
impl Sink for TelegramSink {
    async fn deliver(&self, cancel: &CancellationToken, message: &str) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Closed);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SinkError::Cancelled),
            result = self.send_message(message) => result,
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        self.closed = true;
        Ok(())
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Telegram
    }
}
