//! Turn orchestration for Amica companions.
//!
//! `amica-engine` wires the deterministic cognition in `amica-core` to the
//! generation gateway in `amica-llm`: it runs the full turn pipeline
//! (normalize, perceive, classify, resolve, prompt, generate,
//! post-process, learn, persist), picks the responders in group rooms,
//! gates media behind the readiness threshold, and rate-limits
//! persona-initiated messages.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod gateway;
pub mod initiative;
pub mod media;
pub mod pipeline;
pub mod prompt;

pub use error::{EngineError, Result};
pub use gateway::{client_from_config, Generator};
pub use initiative::InitiativeLimiter;
pub use media::{MediaGenerator, MediaOutcome};
pub use pipeline::{TurnPipeline, TurnRequest, TurnResult};
