//! CLI bootstrap - load settings and prepare a tracking run.
//!
//! Settings are layered in this order, later layers winning:
//! resolver defaults, environment fallbacks, the settings file, CLI flags.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::filter::{Directive, EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, reload, Registry};

use crate::settings::{apply_env_fallbacks, resolve, SettingsManager, TrackSettings};
use crate::sink::SinkRegistry;
use crate::source::ClipboardSource;

use super::args::Args;

/// Level used until the settings file has been read.
const BOOTSTRAP_LOG_LEVEL: &str = "info";

type LogHandle = reload::Handle<EnvFilter, Registry>;

/// Context for CLI execution.
pub struct CliContext {
    /// Fully resolved settings
    pub settings: TrackSettings,

    /// Settings file the run was configured from
    pub settings_path: PathBuf,

    /// Sink constructors available to this run
    pub registry: SinkRegistry,

    /// Cancelled on Ctrl-C or when the run finishes
    pub shutdown: CancellationToken,

    /// Command-line arguments
    pub args: Args,
}

impl CliContext {
    /// Build the clipboard source with the resolved poll interval.
    pub fn build_source(&self) -> ClipboardSource {
        match self.settings.app.poll_interval {
            Some(interval) => ClipboardSource::new(interval),
            None => ClipboardSource::default(),
        }
    }

    /// The resolved settings with the bot token masked, for display.
    pub fn redacted_settings(&self) -> TrackSettings {
        redact(&self.settings)
    }
}

/// Initialize the CLI context.
pub async fn initialize(args: &Args) -> Result<CliContext> {
    let env_warning = load_env_file(args)?;

    // Installed before settings load so loader events are visible
    let log_handle = init_logging(args)?;
    if let Some(warning) = env_warning {
        tracing::warn!("Failed to load .env file: {}", warning);
    }

    let (settings, settings_path) = load_settings(args).await?;
    apply_log_level(&log_handle, args, &settings)?;

    tracing::debug!("Settings loaded from {}", settings_path.display());
    if let Some(sink) = settings.app.sink {
        tracing::debug!("Sink: {}", sink);
    }

    Ok(CliContext {
        settings,
        settings_path,
        registry: SinkRegistry::builtin(),
        shutdown: CancellationToken::new(),
        args: args.clone(),
    })
}

/// Load `.env` (or `--env-file`) into the process environment.
///
/// A malformed `./.env` is not fatal; its error is returned for logging.
fn load_env_file(args: &Args) -> Result<Option<dotenvy::Error>> {
    if let Some(ref path) = args.env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load env file {}", path.display()))?;
        return Ok(None);
    }

    match dotenvy::dotenv() {
        // Missing file is fine
        Err(dotenvy::Error::Io(_)) | Ok(_) => Ok(None),
        Err(e) => Ok(Some(e)),
    }
}

/// Load, layer and resolve settings for this invocation.
///
/// Returns the resolved settings and the path they were read from.
pub async fn load_settings(args: &Args) -> Result<(TrackSettings, PathBuf)> {
    let manager = match args.config {
        Some(ref path) => SettingsManager::from_path(path)
            .await
            .context("Failed to load settings")?,
        None => {
            let manager = SettingsManager::new()
                .await
                .context("Failed to initialize settings manager")?;

            // Creates a template on first run
            if let Err(e) = manager.ensure_settings_file().await {
                tracing::warn!("Failed to create settings template: {}", e);
            }
            manager
        }
    };

    let mut settings = manager.get();
    apply_env_fallbacks(&mut settings)?;
    args.apply_overrides(&mut settings);

    let resolved = resolve(&settings).context("Invalid configuration")?;
    Ok((resolved, manager.path().to_path_buf()))
}

/// Install the global subscriber at the bootstrap level (`debug` with
/// `--verbose`, otherwise `info`). The level can be changed later through
/// the returned handle.
fn init_logging(args: &Args) -> Result<LogHandle> {
    let level = if args.verbose { "debug" } else { BOOTSTRAP_LOG_LEVEL };
    let (filter, handle) = reload::Layer::new(log_filter(level)?);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
    Ok(handle)
}

/// Switch to `advanced.log_level` once settings are known. `--verbose` wins.
fn apply_log_level(handle: &LogHandle, args: &Args, settings: &TrackSettings) -> Result<()> {
    if args.verbose {
        return Ok(());
    }

    let filter = log_filter(&settings.advanced.log_level)?;
    if let Err(e) = handle.reload(filter) {
        // Another subscriber was installed first (tests, embedding)
        tracing::debug!("Log level not applied: {}", e);
    }
    Ok(())
}

/// `RUST_LOG` plus `<level>` for this crate's targets.
fn log_filter(level: &str) -> Result<EnvFilter> {
    let level: LevelFilter = level
        .trim()
        .parse()
        .with_context(|| format!("Invalid log level '{}'", level))?;

    let directive = |target: &str| {
        format!("{}={}", target, level)
            .parse::<Directive>()
            .with_context(|| format!("Invalid log directive for '{}'", target))
    };

    Ok(EnvFilter::from_default_env()
        .add_directive(directive("cliptrack_lib")?)
        .add_directive(directive("cliptrack")?))
}

fn redact(settings: &TrackSettings) -> TrackSettings {
    let mut shown = settings.clone();
    if shown.telegram.token.is_some() {
        shown.telegram.token = Some("***".to_string());
    }
    shown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkKind;
    use clap::Parser;
    use std::time::Duration;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[tokio::test]
    async fn test_load_settings_flags_override_file() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            "settings.toml",
            r#"
[app]
sink = "telegram"
idle = "30s"

[telegram]
token = "t"
chat_id = "c"
"#,
        );
        let out = dir.path().join("out");

        let args = Args::parse_from([
            "cliptrack",
            "--config",
            config.to_str().unwrap(),
            "--sink",
            "local",
            "--path",
            out.to_str().unwrap(),
            "--name",
            "clips.txt",
        ]);

        let (settings, path) = load_settings(&args).await.unwrap();
        assert_eq!(path, config);
        assert_eq!(settings.app.sink, Some(SinkKind::Local));
        assert_eq!(settings.app.idle, Some(Duration::from_secs(30)));
        assert_eq!(settings.file.path, Some(out));
        assert_eq!(settings.file.name.as_deref(), Some("clips.txt"));
    }

    #[tokio::test]
    async fn test_load_settings_yaml_file() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            "settings.yaml",
            "app:\n  sink: telegram\ntelegram:\n  token: abc\n  chat_id: \"42\"\n",
        );

        let args = Args::parse_from(["cliptrack", "--config", config.to_str().unwrap()]);
        let (settings, _) = load_settings(&args).await.unwrap();

        assert_eq!(settings.app.sink, Some(SinkKind::Telegram));
        assert_eq!(settings.telegram.chat_id.as_deref(), Some("42"));
        assert!(settings.telegram.api_base.is_some());
    }

    #[tokio::test]
    async fn test_load_settings_missing_credentials_fails() {
        let dir = TempDir::new().unwrap();
        let config = write_config(
            &dir,
            "settings.toml",
            "[telegram]\nchat_id = \"42\"\n",
        );

        // Blank token wins over any TELEGRAM_TOKEN in the environment
        let args = Args::parse_from([
            "cliptrack",
            "--config",
            config.to_str().unwrap(),
            "--sink",
            "telegram",
            "--token",
            "",
        ]);

        let err = load_settings(&args).await.err().unwrap();
        assert!(format!("{:#}", err).contains("telegram.token"));
    }

    #[tokio::test]
    async fn test_explicit_config_is_not_created() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("absent.toml");

        let args = Args::parse_from([
            "cliptrack",
            "--config",
            config.to_str().unwrap(),
            "--sink",
            "local",
            "--path",
            dir.path().to_str().unwrap(),
        ]);

        load_settings(&args).await.unwrap();
        assert!(!config.exists());
    }

    #[test]
    fn test_log_filter_validates_level() {
        assert!(log_filter("warn").is_ok());
        assert!(log_filter(" TRACE ").is_ok());
        assert!(log_filter("loud").is_err());
    }

    #[test]
    fn test_log_level_from_settings_applies_after_bootstrap() {
        let args = Args::parse_from(["cliptrack"]);
        let handle = init_logging(&args).unwrap();

        let mut settings = TrackSettings::default();
        settings.advanced.log_level = "trace".to_string();
        apply_log_level(&handle, &args, &settings).unwrap();

        settings.advanced.log_level = "loud".to_string();
        assert!(apply_log_level(&handle, &args, &settings).is_err());

        // --verbose keeps the bootstrap level and skips validation
        let verbose = Args::parse_from(["cliptrack", "--verbose"]);
        assert!(apply_log_level(&handle, &verbose, &settings).is_ok());
    }

    #[test]
    fn test_redact_masks_token() {
        let mut settings = TrackSettings::default();
        settings.telegram.token = Some("secret".to_string());
        settings.telegram.chat_id = Some("42".to_string());

        let shown = redact(&settings);
        assert_eq!(shown.telegram.token.as_deref(), Some("***"));
        assert_eq!(shown.telegram.chat_id.as_deref(), Some("42"));
        assert_eq!(settings.telegram.token.as_deref(), Some("secret"));
    }
}
