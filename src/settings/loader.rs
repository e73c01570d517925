//! Settings loading and environment variable handling.
//!
//! The `SettingsManager` handles:
//! - Loading settings from `~/.cliptrack/settings.toml` or an explicit path
//!   (`.yaml` / `.yml` files are parsed as YAML, anything else as TOML)
//! - Resolving `$VAR` and `${VAR}` environment variable references
//! - Filling unset fields from well-known environment variables
//! - First-run template generation

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

use super::schema::TrackSettings;
use crate::sink::SinkKind;

/// Embedded template for first-run generation.
const TEMPLATE: &str = include_str!("template.toml");

/// Environment variables consulted for fields the settings file leaves unset.
pub const ENV_SINK: &[&str] = &["APP_SINK", "APP_CHANNEL"];
pub const ENV_IDLE: &[&str] = &["APP_IDLE"];
pub const ENV_FILE_PATH: &[&str] = &["FILE_PATH"];
pub const ENV_FILE_NAME: &[&str] = &["FILE_NAME"];
pub const ENV_TELEGRAM_TOKEN: &[&str] = &["TELEGRAM_TOKEN"];
pub const ENV_TELEGRAM_CHAT_ID: &[&str] = &["TELEGRAM_CHAT_ID"];

/// Get the path to the global settings file.
pub fn settings_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cliptrack")
        .join("settings.toml")
}

/// Loads and caches settings from one file.
pub struct SettingsManager {
    /// Cached settings (with env vars resolved)
    settings: TrackSettings,

    /// Path to the settings file
    path: PathBuf,
}

impl SettingsManager {
    /// Load from the global settings path, if the file exists.
    pub async fn new() -> Result<Self> {
        Self::from_path(settings_path()).await
    }

    /// Load from a specific path. A missing file yields defaults.
    pub async fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let settings = Self::load_from_path(&path).await?;
        Ok(Self { settings, path })
    }

    async fn load_from_path(path: &Path) -> Result<TrackSettings> {
        if !path.exists() {
            tracing::debug!("Settings file not found at {:?}, using defaults", path);
            return Ok(TrackSettings::default());
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;

        let mut settings = parse_settings(path, &contents)?;

        // Resolve environment variable references
        resolve_env_vars(&mut settings);

        tracing::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Get the loaded settings.
    pub fn get(&self) -> TrackSettings {
        self.settings.clone()
    }

    /// Check if settings file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Get the settings file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure settings file exists, creating from template if needed.
    ///
    /// Returns `true` if a new file was created.
    pub async fn ensure_settings_file(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(&self.path, TEMPLATE).await?;
        tracing::info!("Generated settings template at {:?}", self.path);
        Ok(true)
    }

    /// Reload settings from disk.
    pub async fn reload(&mut self) -> Result<()> {
        self.settings = Self::load_from_path(&self.path).await?;
        Ok(())
    }
}

/// Parse settings text, choosing the format from the file extension.
pub fn parse_settings(path: &Path, contents: &str) -> Result<TrackSettings> {
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));

    if is_yaml {
        serde_yaml::from_str(contents).context("Failed to deserialize YAML settings")
    } else {
        toml::from_str(contents).context("Failed to deserialize TOML settings")
    }
}

/// Resolve $ENV_VAR references in string fields.
fn resolve_env_vars(settings: &mut TrackSettings) {
    fn resolve_opt(value: &mut Option<String>) {
        if let Some(v) = value {
            if let Some(resolved) = resolve_env_ref(v) {
                *v = resolved;
            }
        }
    }

    if let Some(path) = settings.file.path.as_mut() {
        let resolved = resolve_env_ref(&path.to_string_lossy());
        if let Some(resolved) = resolved {
            *path = PathBuf::from(resolved);
        }
    }
    resolve_opt(&mut settings.file.name);

    resolve_opt(&mut settings.telegram.token);
    resolve_opt(&mut settings.telegram.chat_id);
    resolve_opt(&mut settings.telegram.api_base);
}

/// Fill fields left unset by the settings file from the process environment.
pub fn apply_env_fallbacks(settings: &mut TrackSettings) -> Result<()> {
    apply_env_fallbacks_with(settings, |key| std::env::var(key).ok())
}

/// [`apply_env_fallbacks`] with an explicit variable lookup.
pub fn apply_env_fallbacks_with<F>(settings: &mut TrackSettings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let from_env = |current: &Option<String>, keys: &[&str]| -> Option<String> {
        if current.as_deref().is_some_and(|v| !v.is_empty()) {
            return current.clone();
        }
        keys.iter()
            .filter_map(|&key| lookup(key))
            .find(|v| !v.is_empty())
            .or_else(|| current.clone())
    };

    if settings.app.sink.is_none() {
        if let Some(raw) = from_env(&None, ENV_SINK) {
            let kind = raw
                .parse::<SinkKind>()
                .with_context(|| format!("Invalid sink in environment: {:?}", raw))?;
            settings.app.sink = Some(kind);
        }
    }

    if settings.app.idle.is_none() {
        if let Some(raw) = from_env(&None, ENV_IDLE) {
            settings.app.idle = Some(parse_duration(&raw).context("Invalid APP_IDLE")?);
        }
    }

    if settings.file.path.is_none() {
        settings.file.path = from_env(&None, ENV_FILE_PATH).map(PathBuf::from);
    }
    settings.file.name = from_env(&settings.file.name, ENV_FILE_NAME);
    settings.telegram.token = from_env(&settings.telegram.token, ENV_TELEGRAM_TOKEN);
    settings.telegram.chat_id = from_env(&settings.telegram.chat_id, ENV_TELEGRAM_CHAT_ID);

    Ok(())
}

/// Parse a human-readable duration such as `10s`, `1m 30s` or `250ms`.
pub fn parse_duration(raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw.trim())
        .with_context(|| format!("'{}' is not a duration (try e.g. 10s or 2m)", raw))
}

/// Resolve a $ENV_VAR or ${ENV_VAR} reference.
///
/// Returns `Some(resolved)` if the value starts with `$` and the env var exists.
/// Returns `None` if no env var reference or env var not set.
fn resolve_env_ref(value: &str) -> Option<String> {
    let trimmed = value.trim();

    if trimmed.starts_with('$') {
        let var_name = if trimmed.starts_with("${") && trimmed.ends_with('}') {
            &trimmed[2..trimmed.len() - 1]
        } else {
            &trimmed[1..]
        };

        return std::env::var(var_name).ok();
    }

    None
}
