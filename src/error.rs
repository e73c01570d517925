//! Crate-level error type.

use thiserror::Error;

use crate::settings::ConfigError;
use crate::sink::SinkError;
use crate::source::SourceError;

#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Change source error: {0}")]
    Source(#[from] SourceError),
}

pub type Result<T> = std::result::Result<T, TrackError>;
