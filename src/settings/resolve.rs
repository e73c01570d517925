//! Configuration resolution: fill defaults on a partially-specified `TrackSettings`.
//!
//! Rules, applied in order:
//! 1. No sink selected → local file sink.
//! 2. Idle timeout unset or zero → 10 seconds (poll interval likewise → 500ms).
//! 3. Local sink: directory defaults to `<home>/Downloads`, a leading `~` is
//!    expanded, and the file name defaults to `resource-<timestamp>.txt`.
//! 4. Telegram sink: token and chat id must both be non-empty.
//!
//! Resolution works on a copy and is idempotent: resolving an already-resolved
//! value returns it unchanged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local};
use thiserror::Error;

use super::schema::TrackSettings;
use crate::sink::SinkKind;

/// Idle timeout used when none (or zero) is configured.
pub const DEFAULT_IDLE: Duration = Duration::from_secs(10);

/// Clipboard polling period used when none (or zero) is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Bot API host used when `telegram.api_base` is unset.
pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Directory under the home directory used when `file.path` is unset.
const DEFAULT_DOWNLOAD_DIR: &str = "Downloads";

/// Timestamp layout of generated file names.
const FILE_NAME_TIMESTAMP: &str = "%Y-%m-%d-%H-%M-%S";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Telegram sink requires {0}")]
    MissingCredentials(String),

    #[error("Could not determine the user's home directory")]
    HomeDirUnavailable,
}

/// Fills defaults on settings. Home directory and clock are injectable for tests.
#[derive(Debug, Clone)]
pub struct Resolver {
    home: Option<PathBuf>,
    now: fn() -> DateTime<Local>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self {
            home: dirs::home_dir(),
            now: Local::now,
        }
    }
}

impl Resolver {
    /// Resolver bound to the invoking user's home directory and the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver with an explicit home directory (`None` simulates an unknown home).
    pub fn with_home(home: Option<PathBuf>) -> Self {
        Self {
            home,
            now: Local::now,
        }
    }

    /// Override the clock used for generated file names.
    pub fn with_clock(mut self, now: fn() -> DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// Produce a fully-defaulted copy of `settings`.
    pub fn resolve(&self, settings: &TrackSettings) -> Result<TrackSettings, ConfigError> {
        let mut resolved = settings.clone();

        let kind = *resolved.app.sink.get_or_insert(SinkKind::Local);

        if resolved.app.idle.map_or(true, |d| d.is_zero()) {
            resolved.app.idle = Some(DEFAULT_IDLE);
        }
        if resolved.app.poll_interval.map_or(true, |d| d.is_zero()) {
            resolved.app.poll_interval = Some(DEFAULT_POLL_INTERVAL);
        }

        match kind {
            SinkKind::Local => {
                let path = resolved
                    .file
                    .path
                    .take()
                    .filter(|path| !path.as_os_str().is_empty());
                let path = match path {
                    None => self.home()?.join(DEFAULT_DOWNLOAD_DIR),
                    Some(path) => expand_home(&path, self.home.as_deref())
                        .ok_or(ConfigError::HomeDirUnavailable)?,
                };
                resolved.file.path = Some(path);

                if resolved.file.name.as_deref().map_or(true, str::is_empty) {
                    resolved.file.name = Some(default_file_name((self.now)()));
                }
            }
            SinkKind::Telegram => {
                let missing: Vec<&str> = [
                    ("telegram.token", &resolved.telegram.token),
                    ("telegram.chat_id", &resolved.telegram.chat_id),
                ]
                .into_iter()
                .filter(|(_, value)| value.as_deref().map_or(true, str::is_empty))
                .map(|(name, _)| name)
                .collect();

                if !missing.is_empty() {
                    return Err(ConfigError::MissingCredentials(missing.join(" and ")));
                }

                if resolved.telegram.api_base.as_deref().map_or(true, str::is_empty) {
                    resolved.telegram.api_base = Some(DEFAULT_TELEGRAM_API_BASE.to_string());
                }
            }
        }

        Ok(resolved)
    }

    fn home(&self) -> Result<&Path, ConfigError> {
        self.home.as_deref().ok_or(ConfigError::HomeDirUnavailable)
    }
}

/// Resolve `settings` against the current user's home directory and clock.
pub fn resolve(settings: &TrackSettings) -> Result<TrackSettings, ConfigError> {
    Resolver::new().resolve(settings)
}

/// Expand a leading `~` to `home`. Paths without one are returned as-is.
///
/// Returns `None` only when expansion is needed and `home` is unknown.
pub fn expand_home(path: &Path, home: Option<&Path>) -> Option<PathBuf> {
    let raw = path.to_string_lossy();
    let Some(rest) = raw.strip_prefix('~') else {
        return Some(path.to_path_buf());
    };

    let rest = rest.trim_start_matches(['/', '\\']);
    let home = home?;
    Some(if rest.is_empty() {
        home.to_path_buf()
    } else {
        home.join(rest)
    })
}

/// `resource-YYYY-MM-DD-HH-mm-ss.txt` for the given instant.
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("resource-{}.txt", now.format(FILE_NAME_TIMESTAMP))
}
