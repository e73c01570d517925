//! cliptrack: forward clipboard changes to a file or a Telegram chat until
//! the clipboard has been idle for a while.

pub mod cli;
pub mod error;
pub mod settings;
pub mod sink;
pub mod source;
pub mod tracker;

pub use error::{Result, TrackError};
pub use tracker::{track, StopReason, Tracker, TrackerState};
