//! Delivery sinks for observed clipboard changes.
//!
//! A sink accepts text messages one at a time and is closed exactly once when
//! the tracker drains. Two sinks ship with the crate:
//!
//! - [`LocalSink`]: appends each message as a line to a file, through a single
//!   writer task fed by a bounded mailbox.
//! - [`TelegramSink`]: posts each message to a chat through the Telegram bot API.
//!
//! Sinks are built through an explicit [`SinkRegistry`] rather than global
//! registration, so callers (and tests) decide which kinds are available.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

mod local;
mod registry;
mod telegram;

pub use local::{LocalSink, MAILBOX_CAPACITY};
pub use registry::{SinkConstructor, SinkRegistry};
pub use telegram::TelegramSink;

/// Sink-specific errors
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Unknown sink kind: {0}")]
    UnknownKind(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sink is closed")]
    Closed,

    #[error("Delivery cancelled")]
    Cancelled,

    #[error("Writer task stopped unexpectedly")]
    WriterStopped,
}

/// The available sink variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append to a local text file
    Local,
    /// Post to a Telegram chat
    Telegram,
}

impl SinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SinkKind::Local => "local",
            SinkKind::Telegram => "telegram",
        }
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SinkKind {
    type Err = SinkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(SinkKind::Local),
            "telegram" => Ok(SinkKind::Telegram),
            other => Err(SinkError::UnknownKind(other.to_string())),
        }
    }
}

/// A delivery target for clipboard changes.
///
/// # Contract
/// - `deliver` may be called any number of times before `close`.
/// - `close` is called exactly once by the owner; a second call is a no-op.
/// - `deliver` after `close` returns [`SinkError::Closed`].
/// - `deliver` gives up with [`SinkError::Cancelled`] once `cancel` fires.
///
/// # Object Safety
/// This trait is object-safe and intended to be used as `Box<dyn Sink>`.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Deliver one message.
    async fn deliver(&self, cancel: &CancellationToken, message: &str) -> Result<(), SinkError>;

    /// Release background resources.
    async fn close(&mut self) -> Result<(), SinkError>;

    /// Which variant this sink is (for logging).
    fn kind(&self) -> SinkKind;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_kind_from_str() {
        assert_eq!("local".parse::<SinkKind>().unwrap(), SinkKind::Local);
        assert_eq!("Telegram".parse::<SinkKind>().unwrap(), SinkKind::Telegram);
        assert_eq!(" local ".parse::<SinkKind>().unwrap(), SinkKind::Local);
    }

    #[test]
    fn test_sink_kind_from_str_unknown() {
        let err = "pigeon".parse::<SinkKind>().unwrap_err();
        assert!(matches!(err, SinkError::UnknownKind(ref kind) if kind == "pigeon"));
    }

    #[test]
    fn test_sink_kind_display_round_trips() {
        for kind in [SinkKind::Local, SinkKind::Telegram] {
            assert_eq!(kind.to_string().parse::<SinkKind>().unwrap(), kind);
        }
    }
}
