//! The tracking run loop.
//!
//! A [`Tracker`] owns one sink for one run. It initializes the change source,
//! forwards every snapshot to the sink, and stops after `idle` without a
//! change, when the caller's cancellation token fires, or when the source
//! stream ends.
//!
//! ```text
//! Starting ──init ok──> Watching ──idle / cancel / source end──> Draining ──> Stopped
//!     └──────────────init failed (sink closed)──────────────────────────────────┘
//! ```
//!
//! Every exit from `Watching` goes through `Draining`, which cancels the
//! subscription scope and closes the sink exactly once.

use std::fmt;
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::TrackError;
use crate::settings::{resolve, TrackSettings, DEFAULT_IDLE};
use crate::sink::{Sink, SinkRegistry};
use crate::source::{ChangeSource, Snapshot};

/// Lifecycle of a tracker run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Starting,
    Watching,
    Draining,
    Stopped,
}

/// Why a run ended without a fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No change observed for the configured idle timeout
    IdleTimeout,
    /// The caller's cancellation token fired
    Cancelled,
    /// The change source stream ended
    SourceClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::IdleTimeout => f.write_str("idle timeout reached"),
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::SourceClosed => f.write_str("change source closed"),
        }
    }
}

pub struct Tracker {
    sink: Box<dyn Sink>,
    idle: Duration,
    debug: bool,
    state: watch::Sender<TrackerState>,
}

impl Tracker {
    pub fn new(sink: Box<dyn Sink>, idle: Duration) -> Self {
        let (state, _) = watch::channel(TrackerState::Starting);
        Self {
            sink,
            idle,
            debug: false,
            state,
        }
    }

    /// Tracker using the idle timeout and debug flag of resolved settings.
    pub fn from_settings(sink: Box<dyn Sink>, settings: &TrackSettings) -> Self {
        Self::new(sink, settings.app.idle.unwrap_or(DEFAULT_IDLE)).with_debug(settings.app.debug)
    }

    /// Log forwarded payloads at debug level.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn idle(&self) -> Duration {
        self.idle
    }

    /// Observe state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<TrackerState> {
        self.state.subscribe()
    }

    /// Run until idle timeout, cancellation of `shutdown`, or end of the source.
    ///
    /// The sink is closed exactly once before this returns, including when the
    /// source fails to initialize (returned as an error).
    pub async fn run<S>(
        mut self,
        source: &mut S,
        shutdown: CancellationToken,
    ) -> Result<StopReason, TrackError>
    where
        S: ChangeSource + ?Sized,
    {
        self.set_state(TrackerState::Starting);

        if let Err(e) = source.initialize() {
            tracing::error!("Change source initialization failed: {}", e);
            self.close_sink().await;
            self.set_state(TrackerState::Stopped);
            return Err(e.into());
        }

        let scope = shutdown.child_token();
        let mut changes = source.subscribe(scope.clone());

        let idle = tokio::time::sleep(self.idle);
        tokio::pin!(idle);

        self.set_state(TrackerState::Watching);
        tracing::info!(
            "Tracking clipboard changes (sink: {}, idle timeout: {:?})",
            self.sink.kind(),
            self.idle
        );

        let reason = loop {
            // Cancellation is checked first: sources end their stream once the
            // scope is cancelled, which must not read as the source closing.
            tokio::select! {
                biased;
                _ = scope.cancelled() => break StopReason::Cancelled,
                next = changes.next() => {
                    let Some(snapshot) = next else {
                        if scope.is_cancelled() {
                            break StopReason::Cancelled;
                        }
                        break StopReason::SourceClosed;
                    };
                    self.forward(&scope, snapshot).await;
                    // Failed attempts count as activity too.
                    idle.as_mut().reset(Instant::now() + self.idle);
                }
                _ = &mut idle => break StopReason::IdleTimeout,
            }
        };

        self.set_state(TrackerState::Draining);
        scope.cancel();
        drop(changes);
        self.close_sink().await;
        self.set_state(TrackerState::Stopped);

        tracing::info!("Stopped clipboard tracking: {}", reason);
        Ok(reason)
    }

    async fn forward(&self, scope: &CancellationToken, snapshot: Snapshot) {
        let kind = self.sink.kind();
        let message = snapshot.to_text();

        match self.sink.deliver(scope, &message).await {
            Ok(()) if self.debug => {
                tracing::debug!("{}: forwarded clipboard content => {}", kind, message);
            }
            Ok(()) => {
                tracing::trace!("{}: forwarded {} bytes", kind, snapshot.len());
            }
            Err(e) => {
                tracing::warn!("Failed to deliver clipboard change via {} sink: {}", kind, e);
            }
        }
    }

    async fn close_sink(&mut self) {
        if let Err(e) = self.sink.close().await {
            tracing::warn!("Error closing {} sink: {}", self.sink.kind(), e);
        }
    }

    fn set_state(&self, state: TrackerState) {
        tracing::debug!("Tracker state: {:?}", state);
        self.state.send_replace(state);
    }
}

/// Resolve `settings`, build its sink from `registry` and run a tracker on `source`.
pub async fn track<S>(
    settings: &TrackSettings,
    registry: &SinkRegistry,
    source: &mut S,
    shutdown: CancellationToken,
) -> Result<StopReason, TrackError>
where
    S: ChangeSource + ?Sized,
{
    let resolved = resolve(settings)?;
    let sink = registry.construct(&resolved)?;
    Tracker::from_settings(sink, &resolved)
        .run(source, shutdown)
        .await
}
