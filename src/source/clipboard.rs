//! System clipboard source backed by `arboard`.
//!
//! The clipboard handle is polled on a dedicated thread (it is not assumed to
//! be `Send` on every platform). Content present when the subscription starts
//! is remembered but not emitted; afterwards every text value that differs
//! from the previous one is forwarded.

use std::thread;
use std::time::Duration;

use arboard::Clipboard;
use futures::stream::{BoxStream, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use super::{ChangeSource, Snapshot, SourceError};
use crate::settings::DEFAULT_POLL_INTERVAL;

/// Snapshots buffered between the polling thread and the tracker.
const CHANNEL_CAPACITY: usize = 16;

#[derive(Debug, Clone)]
pub struct ClipboardSource {
    poll_interval: Duration,
}

impl Default for ClipboardSource {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl ClipboardSource {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl ChangeSource for ClipboardSource {
    fn initialize(&mut self) -> Result<(), SourceError> {
        let mut clipboard = Clipboard::new().map_err(|e| SourceError::Init(e.to_string()))?;
        // Probe once so missing display servers fail here rather than mid-run.
        match clipboard.get_text() {
            Ok(_) | Err(arboard::Error::ContentNotAvailable) => Ok(()),
            Err(e) => Err(SourceError::Init(e.to_string())),
        }
    }

    fn subscribe(&mut self, scope: CancellationToken) -> BoxStream<'static, Snapshot> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let interval = self.poll_interval;

        let spawned = thread::Builder::new()
            .name("clipboard-poll".to_string())
            .spawn(move || poll_clipboard(interval, scope, tx));
        if let Err(e) = spawned {
            // The sender was dropped with the closure, so the stream just ends.
            tracing::error!("Failed to start clipboard polling thread: {}", e);
        }

        ReceiverStream::new(rx).boxed()
    }
}

fn poll_clipboard(interval: Duration, scope: CancellationToken, tx: mpsc::Sender<Snapshot>) {
    let mut clipboard = match Clipboard::new() {
        Ok(clipboard) => clipboard,
        Err(e) => {
            tracing::error!("Clipboard unavailable in polling thread: {}", e);
            return;
        }
    };

    let mut detector = ChangeDetector::new(read_text(&mut clipboard));
    tracing::debug!("Clipboard polling started every {:?}", interval);

    loop {
        thread::sleep(interval);
        if scope.is_cancelled() || tx.is_closed() {
            break;
        }

        let Some(text) = read_text(&mut clipboard) else {
            continue;
        };
        if let Some(snapshot) = detector.observe(text) {
            if tx.blocking_send(snapshot).is_err() {
                break;
            }
        }
    }

    tracing::debug!("Clipboard polling stopped");
}

/// Current clipboard text, or `None` when empty or not text.
fn read_text(clipboard: &mut Clipboard) -> Option<String> {
    match clipboard.get_text() {
        Ok(text) if !text.is_empty() => Some(text),
        Ok(_) | Err(arboard::Error::ContentNotAvailable) => None,
        Err(e) => {
            tracing::debug!("Clipboard read failed: {}", e);
            None
        }
    }
}

/// Turns a series of clipboard reads into change snapshots.
#[derive(Debug, Default)]
struct ChangeDetector {
    last: Option<String>,
}

impl ChangeDetector {
    fn new(initial: Option<String>) -> Self {
        Self { last: initial }
    }

    fn observe(&mut self, current: String) -> Option<Snapshot> {
        if self.last.as_deref() == Some(current.as_str()) {
            return None;
        }
        let snapshot = Snapshot::from(current.as_str());
        self.last = Some(current);
        Some(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_content_is_not_emitted() {
        let mut detector = ChangeDetector::new(Some("already there".to_string()));
        assert_eq!(detector.observe("already there".to_string()), None);
    }

    #[test]
    fn test_changes_are_emitted_once() {
        let mut detector = ChangeDetector::default();

        assert_eq!(
            detector.observe("one".to_string()),
            Some(Snapshot::from("one"))
        );
        assert_eq!(detector.observe("one".to_string()), None);
        assert_eq!(
            detector.observe("two".to_string()),
            Some(Snapshot::from("two"))
        );
    }

    #[test]
    fn test_returning_to_previous_value_is_a_change() {
        let mut detector = ChangeDetector::new(Some("a".to_string()));

        assert!(detector.observe("b".to_string()).is_some());
        assert!(detector.observe("a".to_string()).is_some());
    }

    #[test]
    fn test_default_poll_interval() {
        assert_eq!(
            ClipboardSource::default().poll_interval(),
            Duration::from_millis(500)
        );
    }
}
