//! CLI argument parsing using clap.
//!
//! Defines the command-line interface for cliptrack. Every settings field
//! has a flag; flags win over the settings file and the environment.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::settings::TrackSettings;
use crate::sink::SinkKind;

/// cliptrack - forward clipboard changes to a file or a Telegram chat
#[derive(Parser, Debug, Clone)]
#[command(name = "cliptrack")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Settings file (TOML, or YAML with a .yaml/.yml extension)
    ///
    /// Default: ~/.cliptrack/settings.toml
    #[arg(short = 'c', long, env = "CLIPTRACK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Load environment variables from this file instead of ./.env
    #[arg(long)]
    pub env_file: Option<PathBuf>,

    /// Where clipboard changes go
    ///
    /// Options: local, telegram
    #[arg(short = 's', long)]
    pub sink: Option<SinkKind>,

    /// Stop after this long without a clipboard change (e.g. 10s, 2m)
    #[arg(short = 'i', long, value_parser = humantime::parse_duration)]
    pub idle: Option<Duration>,

    /// How often the clipboard is checked (e.g. 250ms)
    #[arg(long, value_parser = humantime::parse_duration)]
    pub poll_interval: Option<Duration>,

    /// Directory of the output file (local sink)
    #[arg(long)]
    pub path: Option<PathBuf>,

    /// Output file name (local sink)
    #[arg(long)]
    pub name: Option<String>,

    /// Bot token (telegram sink)
    #[arg(long)]
    pub token: Option<String>,

    /// Target chat id (telegram sink)
    #[arg(long)]
    pub chat_id: Option<String>,

    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    pub print_config: bool,

    /// Log every forwarded payload (needs --verbose to be visible)
    #[arg(long)]
    pub debug: bool,

    /// Show verbose output (debug information)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

impl Args {
    /// Overwrite settings fields with the flags that were given.
    pub fn apply_overrides(&self, settings: &mut TrackSettings) {
        if let Some(sink) = self.sink {
            settings.app.sink = Some(sink);
        }
        if let Some(idle) = self.idle {
            settings.app.idle = Some(idle);
        }
        if let Some(poll_interval) = self.poll_interval {
            settings.app.poll_interval = Some(poll_interval);
        }
        if self.debug {
            settings.app.debug = true;
        }
        if let Some(ref path) = self.path {
            settings.file.path = Some(path.clone());
        }
        if let Some(ref name) = self.name {
            settings.file.name = Some(name.clone());
        }
        if let Some(ref token) = self.token {
            settings.telegram.token = Some(token.clone());
        }
        if let Some(ref chat_id) = self.chat_id {
            settings.telegram.chat_id = Some(chat_id.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_default_values() {
        let args = Args::parse_from(["cliptrack"]);
        assert_eq!(args.sink, None);
        assert_eq!(args.idle, None);
        assert!(!args.print_config);
        assert!(!args.debug);
        assert!(!args.verbose);
    }

    #[test]
    fn test_args_sink_and_idle() {
        let args = Args::parse_from(["cliptrack", "-s", "telegram", "-i", "2m"]);
        assert_eq!(args.sink, Some(SinkKind::Telegram));
        assert_eq!(args.idle, Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_args_reject_unknown_sink() {
        assert!(Args::try_parse_from(["cliptrack", "--sink", "email"]).is_err());
    }

    #[test]
    fn test_args_reject_bad_duration() {
        assert!(Args::try_parse_from(["cliptrack", "--idle", "forever"]).is_err());
    }

    #[test]
    fn test_args_local_file() {
        let args = Args::parse_from([
            "cliptrack",
            "--path",
            "~/clips",
            "--name",
            "today.txt",
            "--poll-interval",
            "250ms",
        ]);
        assert_eq!(args.path, Some(PathBuf::from("~/clips")));
        assert_eq!(args.name, Some("today.txt".to_string()));
        assert_eq!(args.poll_interval, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_overrides_win_over_settings() {
        let mut settings = TrackSettings::default();
        settings.app.sink = Some(SinkKind::Telegram);
        settings.telegram.token = Some("from-file".to_string());
        settings.telegram.chat_id = Some("1".to_string());

        let args = Args::parse_from(["cliptrack", "--sink", "local", "--token", "from-flag"]);
        args.apply_overrides(&mut settings);

        assert_eq!(settings.app.sink, Some(SinkKind::Local));
        assert_eq!(settings.telegram.token.as_deref(), Some("from-flag"));
        // Untouched when no flag is given
        assert_eq!(settings.telegram.chat_id.as_deref(), Some("1"));
    }
}
