//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the turn pipeline.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Core pipeline failure (persistence, profile, config).
    #[error(transparent)]
    Core(#[from] amica_core::AmicaError),

    /// Generation gateway failure that could not be degraded.
    #[error(transparent)]
    Gateway(#[from] amica_llm::LlmError),

    /// Media generation failure.
    #[error("media generation failed: {0}")]
    Media(String),

    /// A group turn was requested for a group with no members.
    #[error("group has no persona members")]
    EmptyGroup,
}

/// Convenience result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
