use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] agenda_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("{0} cannot be empty")]
    EmptyInput(&'static str),
    #[error("ID cannot be empty")]
    EmptyId,
    #[error("No {0} found for id/prefix: {1}")]
    NotFound(&'static str, String),
    #[error("{0}")]
    AmbiguousId(String),
    #[error("Invalid timestamp '{0}': expected RFC 3339 (e.g. 2026-05-01T09:00:00Z)")]
    InvalidTimestamp(String),
    #[error("Event end must not be before its start")]
    InvalidTimeRange,
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Sync incomplete; failed kinds: {0}")]
    SyncIncomplete(String),
}
