//! Settings schema definitions for cliptrack.
//!
//! Every field is optional so partial files (or no file at all) load cleanly.
//! The resolver in `resolve.rs` turns a partial `TrackSettings` into one where
//! every field consumed downstream is set.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sink::SinkKind;

/// Root settings structure.
///
/// Loaded from `~/.cliptrack/settings.toml` (or YAML via `--config`) with
/// environment variable interpolation support.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackSettings {
    /// Sink selection and run-loop timing
    pub app: AppSettings,

    /// Local file sink settings
    pub file: FileSettings,

    /// Telegram bot API sink settings
    pub telegram: TelegramSettings,

    /// Advanced/debug settings
    pub advanced: AdvancedSettings,
}

/// Sink selection and run-loop timing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Active sink: "local" | "telegram"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sink: Option<SinkKind>,

    /// Stop after this long without a clipboard change (e.g. "10s", "2m")
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub idle: Option<Duration>,

    /// How often the clipboard is polled for changes
    #[serde(with = "humantime_serde", skip_serializing_if = "Option::is_none")]
    pub poll_interval: Option<Duration>,

    /// Log every forwarded payload at debug level
    pub debug: bool,
}

/// Local file sink settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    /// Directory holding the output file; a leading `~` is expanded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// File name inside `path`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Telegram bot API settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramSettings {
    /// Bot token (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Target chat identifier (supports $ENV_VAR syntax)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,

    /// Bot API base URL, for self-hosted bot API servers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
}

/// Advanced/debug settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    /// Log level: "error" | "warn" | "info" | "debug" | "trace"
    pub log_level: String,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = TrackSettings::default();
        assert_eq!(settings.app.sink, None);
        assert_eq!(settings.app.idle, None);
        assert!(!settings.app.debug);
        assert_eq!(settings.advanced.log_level, "info");
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            [app]
            sink = "telegram"
            idle = "30s"

            [telegram]
            token = "123:abc"
            chat_id = "42"
        "#;

        let settings: TrackSettings = toml::from_str(toml).unwrap();
        assert_eq!(settings.app.sink, Some(SinkKind::Telegram));
        assert_eq!(settings.app.idle, Some(Duration::from_secs(30)));
        assert_eq!(settings.telegram.chat_id.as_deref(), Some("42"));
        // Defaults should fill in missing sections
        assert_eq!(settings.file, FileSettings::default());
        assert_eq!(settings.advanced.log_level, "info");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
app:
  sink: local
  idle: 500ms
file:
  path: ~/clips
  name: today.txt
"#;

        let settings: TrackSettings = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(settings.app.sink, Some(SinkKind::Local));
        assert_eq!(settings.app.idle, Some(Duration::from_millis(500)));
        assert_eq!(settings.file.path, Some(PathBuf::from("~/clips")));
        assert_eq!(settings.file.name.as_deref(), Some("today.txt"));
    }

    #[test]
    fn test_unknown_sink_is_rejected() {
        let toml = r#"
            [app]
            sink = "carrier-pigeon"
        "#;

        assert!(toml::from_str::<TrackSettings>(toml).is_err());
    }

    #[test]
    fn test_serialize_settings() {
        let mut settings = TrackSettings::default();
        settings.app.idle = Some(Duration::from_secs(10));
        let toml_str = toml::to_string_pretty(&settings).unwrap();
        assert!(toml_str.contains("[app]"));
        assert!(toml_str.contains("idle = \"10s\""));
    }
}
