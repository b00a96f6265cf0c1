//! Error types for agenda-core

use thiserror::Error;

/// Result type alias using agenda-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by local persistence and engine setup.
///
/// These are always returned to the caller that initiated the local mutation,
/// since they change what the UI can show. Remote failures live in
/// [`crate::remote::RemoteError`] and never travel through this type.
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
