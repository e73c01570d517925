//! Command-line interface for cliptrack.
//!
//! `bootstrap` layers settings (file, environment, flags) and sets up
//! logging; `runner` drives one tracking run against the system clipboard.
//!
//! ```text
//! Args --> load_settings --> resolve --> SinkRegistry --> Tracker::run
//! ```

mod args;
mod bootstrap;
mod runner;

pub use args::Args;
pub use bootstrap::{initialize, load_settings, CliContext};
pub use runner::{execute, execute_with_source, render_config};
