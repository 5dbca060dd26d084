//! # amica-llm — Generation Gateway for Amica
//!
//! Unified interface for reply generation across providers:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API** (any chat-completions endpoint)
//!
//! All generation calls go through this crate, ensuring:
//!   - Dual model pools — a standard pool and an unrestricted pool that
//!     explicit tone modes route to
//!   - Timeout management and bounded retries
//!   - Sentinel degradation: a failed or empty generation comes back as a
//!     recognizable marker string, never as text shown to the user
//!   - Output sanitation (glitch-token scrubbing)
//!
//! The crate knows nothing about personas; the engine assembles prompts
//! from persona state and hands the finished request here.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod types;

pub use client::{GatewayClient, Provider};
pub use error::LlmError;
pub use types::{
    ChatMessage, ChatRole, GenerationRequest, GenerationResponse, PolicyMode,
    EMPTY_SENTINEL, PROVIDER_ERROR_SENTINEL,
};
