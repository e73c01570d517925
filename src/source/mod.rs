//! Change sources: where clipboard snapshots come from.
//!
//! The tracker only depends on the [`ChangeSource`] trait. [`ClipboardSource`]
//! is the production implementation; tests drive the tracker with scripted
//! sources instead.

use std::fmt;
use std::sync::Arc;

use futures::stream::BoxStream;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

mod clipboard;

pub use clipboard::ClipboardSource;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to initialize change source: {0}")]
    Init(String),

    #[error("Failed to read change source: {0}")]
    Read(String),
}

/// One observed content change. Immutable once created.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Snapshot(Arc<[u8]>);

impl Snapshot {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Text form of the snapshot; invalid UTF-8 is replaced.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl From<String> for Snapshot {
    fn from(text: String) -> Self {
        Self(Arc::from(text.into_bytes()))
    }
}

impl From<&str> for Snapshot {
    fn from(text: &str) -> Self {
        Self(Arc::from(text.as_bytes()))
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Snapshot({} bytes)", self.0.len())
    }
}

/// A producer of change snapshots.
///
/// `initialize` is called once before the first subscription. Each call to
/// `subscribe` starts a new, effectively infinite stream that ends once
/// `scope` is cancelled; a cancelled subscription is never resumed.
pub trait ChangeSource: Send {
    fn initialize(&mut self) -> Result<(), SourceError>;

    fn subscribe(&mut self, scope: CancellationToken) -> BoxStream<'static, Snapshot>;
}
