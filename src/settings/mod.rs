//! Settings for cliptrack.
//!
//! Settings are loaded from `~/.cliptrack/settings.toml` (or a file given on
//! the command line) with environment variable interpolation, then completed
//! by the resolver before a sink is built.
//!
//! # Usage
//!
//! ```rust,ignore
//! use cliptrack_lib::settings::{apply_env_fallbacks, resolve, SettingsManager};
//!
//! let manager = SettingsManager::new().await?;
//! let mut settings = manager.get();
//! apply_env_fallbacks(&mut settings)?;
//! let resolved = resolve(&settings)?;
//! ```

pub mod loader;
pub mod resolve;
pub mod schema;

pub use loader::{apply_env_fallbacks, parse_duration, settings_path, SettingsManager};
pub use resolve::{
    default_file_name, expand_home, resolve, ConfigError, Resolver, DEFAULT_IDLE,
    DEFAULT_POLL_INTERVAL, DEFAULT_TELEGRAM_API_BASE,
};
pub use schema::{AdvancedSettings, AppSettings, FileSettings, TelegramSettings, TrackSettings};
