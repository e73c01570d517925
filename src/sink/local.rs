//! Local file sink.
//!
//! Messages are appended one per line to `<dir>/<name>`. A single writer task
//! owns the file handle and is fed through a bounded mailbox, so writes are
//! serialized in mailbox order without locks.
//!
//! The file is opened lazily by the writer on the first message. An open
//! failure is reported to the `deliver` call that triggered it, and the next
//! message retries the open.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{Sink, SinkError, SinkKind};
use crate::settings::expand_home;

/// Number of messages that can wait for the writer before `deliver` blocks.
pub const MAILBOX_CAPACITY: usize = 100;

/// One line for the writer, plus the channel it acknowledges on.
#[derive(Debug)]
struct WriteRequest {
    line: String,
    ack: oneshot::Sender<io::Result<()>>,
}

pub struct LocalSink {
    path: PathBuf,
    mailbox: Option<mpsc::Sender<WriteRequest>>,
    writer: Option<JoinHandle<()>>,
}

impl LocalSink {
    /// Create the sink and spawn its writer task.
    ///
    /// Does not touch the filesystem; must be called inside a Tokio runtime.
    pub fn spawn(dir: impl Into<PathBuf>, name: impl AsRef<Path>) -> Self {
        let path = dir.into().join(name);
        let (mailbox, requests) = mpsc::channel(MAILBOX_CAPACITY);

        let writer_path = path.clone();
        let writer = tokio::spawn(async move {
            run_writer(writer_path, requests).await;
        });

        Self {
            path,
            mailbox: Some(mailbox),
            writer: Some(writer),
        }
    }

    /// Target file, before `~` expansion.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Sink for LocalSink {
    async fn deliver(&self, cancel: &CancellationToken, message: &str) -> Result<(), SinkError> {
        let mailbox = self.mailbox.as_ref().ok_or(SinkError::Closed)?;

        let (ack, written) = oneshot::channel();
        let request = WriteRequest {
            line: message.to_owned(),
            ack,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(SinkError::Cancelled),
            sent = mailbox.send(request) => sent.map_err(|_| SinkError::WriterStopped)?,
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SinkError::Cancelled),
            result = written => result.map_err(|_| SinkError::WriterStopped)?.map_err(SinkError::from),
        }
    }

    async fn close(&mut self) -> Result<(), SinkError> {
        // Dropping the sender lets the writer drain what is queued and exit.
        let Some(mailbox) = self.mailbox.take() else {
            return Ok(());
        };
        drop(mailbox);

        if let Some(writer) = self.writer.take() {
            writer.await.map_err(|e| {
                tracing::error!("Local sink writer task failed: {}", e);
                SinkError::WriterStopped
            })?;
        }

        tracing::debug!("Closed local sink at {}", self.path.display());
        Ok(())
    }

    fn kind(&self) -> SinkKind {
        SinkKind::Local
    }
}

/// Writer loop: owns the file handle for the sink's whole lifetime.
async fn run_writer(path: PathBuf, mut requests: mpsc::Receiver<WriteRequest>) {
    let mut file: Option<File> = None;

    while let Some(WriteRequest { line, ack }) = requests.recv().await {
        let result = append_line(&mut file, &path, &line).await;
        if let Err(ref e) = result {
            tracing::warn!("Failed to append to {}: {}", path.display(), e);
        }
        // The caller may have given up (cancelled); the line is written regardless.
        let _ = ack.send(result);
    }

    tracing::debug!("Local sink writer for {} stopped", path.display());
}

async fn append_line(file: &mut Option<File>, path: &Path, line: &str) -> io::Result<()> {
    let mut handle = match file.take() {
        Some(handle) => handle,
        None => open_log_file(path).await?,
    };

    let result = write_line(&mut handle, line).await;
    *file = Some(handle);
    result
}

async fn write_line(handle: &mut File, line: &str) -> io::Result<()> {
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');

    handle.write_all(buf.as_bytes()).await?;
    handle.flush().await
}

/// Expand `~`, create the parent directory tree, and open in append mode.
async fn open_log_file(path: &Path) -> io::Result<File> {
    let path = expand_home(path, dirs::home_dir().as_deref()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            "could not determine the user's home directory",
        )
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await?;

    tracing::info!("Appending clipboard changes to {}", path.display());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_messages_are_appended_in_order() {
        let temp = TempDir::new().unwrap();
        let mut sink = LocalSink::spawn(temp.path(), "clips.txt");
        let cancel = CancellationToken::new();

        for message in ["a", "b", "c"] {
            sink.deliver(&cancel, message).await.unwrap();
        }
        sink.close().await.unwrap();

        let contents = std::fs::read_to_string(temp.path().join("clips.txt")).unwrap();
        assert_eq!(contents, "a\nb\nc\n");
    }

    #[tokio::test]
    async fn test_more_messages_than_mailbox_capacity() {
        let temp = TempDir::new().unwrap();
        let mut sink = LocalSink::spawn(temp.path(), "many.txt");
        let cancel = CancellationToken::new();

        let count = MAILBOX_CAPACITY * 2 + 7;
        for i in 0..count {
            sink.deliver(&cancel, &format!("line {}", i)).await.unwrap();
        }
        sink.close().await.unwrap();

        let contents = std::fs::read_to_string(temp.path().join("many.txt")).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), count);
        assert_eq!(lines[0], "line 0");
        assert_eq!(lines[count - 1], format!("line {}", count - 1));
    }

    #[tokio::test]
    async fn test_file_is_opened_lazily() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested").join("dir");
        let mut sink = LocalSink::spawn(&dir, "clips.txt");

        // Nothing is created until the first delivery
        tokio::task::yield_now().await;
        assert!(!dir.exists());

        sink.deliver(&CancellationToken::new(), "first").await.unwrap();
        assert!(dir.join("clips.txt").exists());
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_appends_to_existing_file() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("clips.txt"), "old\n").unwrap();

        let mut sink = LocalSink::spawn(temp.path(), "clips.txt");
        sink.deliver(&CancellationToken::new(), "new").await.unwrap();
        sink.close().await.unwrap();

        let contents = std::fs::read_to_string(temp.path().join("clips.txt")).unwrap();
        assert_eq!(contents, "old\nnew\n");
    }

    #[tokio::test]
    async fn test_open_failure_surfaces_on_first_deliver() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should be
        let blocker = temp.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let mut sink = LocalSink::spawn(&blocker, "clips.txt");
        let cancel = CancellationToken::new();

        let err = sink.deliver(&cancel, "a").await.unwrap_err();
        assert!(matches!(err, SinkError::Io(_)), "unexpected error: {:?}", err);

        // Still failing, but the sink stays usable and closes cleanly
        assert!(sink.deliver(&cancel, "b").await.is_err());
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_after_close_is_rejected() {
        let temp = TempDir::new().unwrap();
        let mut sink = LocalSink::spawn(temp.path(), "clips.txt");
        sink.close().await.unwrap();

        let err = sink
            .deliver(&CancellationToken::new(), "late")
            .await
            .unwrap_err();
        assert!(matches!(err, SinkError::Closed));
    }

    #[tokio::test]
    async fn test_close_twice_is_a_no_op() {
        let temp = TempDir::new().unwrap();
        let mut sink = LocalSink::spawn(temp.path(), "clips.txt");
        sink.close().await.unwrap();
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_deliver() {
        let temp = TempDir::new().unwrap();
        let mut sink = LocalSink::spawn(temp.path(), "clips.txt");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sink.deliver(&cancel, "never").await.unwrap_err();
        assert!(matches!(err, SinkError::Cancelled));
        sink.close().await.unwrap();

        assert!(!temp.path().join("clips.txt").exists());
    }
}
