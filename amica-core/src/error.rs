//! Error types for the Amica core library.

use thiserror::Error;

/// Top-level error type for all core operations.
#[derive(Error, Debug)]
pub enum AmicaError {
    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A persisted profile carries a schema version this build cannot read.
    #[error("Unsupported profile version: {found} (supported: <= {supported})")]
    UnsupportedVersion {
        /// Version found in storage.
        found: u32,
        /// Highest version this build understands.
        supported: u32,
    },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AmicaError>;
