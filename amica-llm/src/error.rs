//! Generation gateway error types.

use thiserror::Error;

/// Errors that can occur while talking to a generation provider.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    /// Provider response could not be parsed.
    #[error("failed to parse provider response: {0}")]
    ParseError(String),

    /// Request timed out.
    #[error("generation request timed out after {0}ms")]
    Timeout(u64),

    /// Provider is unreachable or not configured.
    #[error("generation provider unavailable: {0}")]
    Unavailable(String),

    /// All retry attempts exhausted.
    #[error("all generation attempts exhausted after {attempts} tries: {last_error}")]
    RetriesExhausted {
        /// Attempts made, including the first.
        attempts: u32,
        /// Error message from the final attempt.
        last_error: String,
    },
}

impl LlmError {
    /// Classify the transport failure of one request attempt.
    pub(crate) fn from_reqwest(err: &reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            LlmError::Timeout(timeout_ms)
        } else if err.is_connect() {
            LlmError::Unavailable(err.to_string())
        } else {
            LlmError::RequestFailed(err.to_string())
        }
    }
}
