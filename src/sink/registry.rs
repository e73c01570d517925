//! Explicit sink factory: a table from [`SinkKind`] to constructor.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::Local;

use super::{LocalSink, Sink, SinkError, SinkKind, TelegramSink};
use crate::settings::{default_file_name, TrackSettings, DEFAULT_TELEGRAM_API_BASE};

/// Builds a sink from resolved settings.
pub type SinkConstructor = fn(&TrackSettings) -> Result<Box<dyn Sink>, SinkError>;

/// Maps sink kinds to their constructors.
///
/// Passed explicitly to whoever builds sinks; there is no process-wide registry.
#[derive(Clone, Default)]
pub struct SinkRegistry {
    constructors: HashMap<SinkKind, SinkConstructor>,
}

impl SinkRegistry {
    /// A registry with no sinks registered.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A registry with the local and Telegram sinks registered.
    pub fn builtin() -> Self {
        Self::empty()
            .with(SinkKind::Local, construct_local)
            .with(SinkKind::Telegram, construct_telegram)
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: SinkKind, constructor: SinkConstructor) {
        self.constructors.insert(kind, constructor);
    }

    /// Builder-style [`SinkRegistry::register`].
    pub fn with(mut self, kind: SinkKind, constructor: SinkConstructor) -> Self {
        self.register(kind, constructor);
        self
    }

    pub fn contains(&self, kind: SinkKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Construct the sink selected by `settings.app.sink` (local when unset).
    pub fn construct(&self, settings: &TrackSettings) -> Result<Box<dyn Sink>, SinkError> {
        let kind = settings.app.sink.unwrap_or(SinkKind::Local);
        let constructor = self
            .constructors
            .get(&kind)
            .ok_or_else(|| SinkError::UnknownKind(kind.to_string()))?;

        let sink = constructor(settings)?;
        tracing::debug!("Constructed {} sink", kind);
        Ok(sink)
    }
}

/// Never fails: problems opening the file surface on the first delivery.
fn construct_local(settings: &TrackSettings) -> Result<Box<dyn Sink>, SinkError> {
    Ok(Box::new(construct_local_sink(settings)))
}

/// Empty path or name count as unset.
fn construct_local_sink(settings: &TrackSettings) -> LocalSink {
    let dir = settings
        .file
        .path
        .clone()
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from("~/Downloads"));
    let name = settings
        .file
        .name
        .clone()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_file_name(Local::now()));

    LocalSink::spawn(dir, name)
}

/// Re-validates credentials even though the resolver already checked them.
fn construct_telegram(settings: &TrackSettings) -> Result<Box<dyn Sink>, SinkError> {
    let telegram = &settings.telegram;
    let token = telegram.token.as_deref().unwrap_or_default();
    let chat_id = telegram.chat_id.as_deref().unwrap_or_default();
    let api_base = telegram
        .api_base
        .as_deref()
        .filter(|base| !base.is_empty())
        .unwrap_or(DEFAULT_TELEGRAM_API_BASE);

    Ok(Box::new(TelegramSink::with_api_base(
        token, chat_id, api_base,
    )?))
}
