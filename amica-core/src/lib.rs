//! # Amica Core Library
//!
//! Deterministic cognitive pipeline for conversational companion personas.
//!
//! Every persona carries a [`PersonaProfile`]: identity, personality traits,
//! an emotion vector (Mehrabian & Russell PAD model), a relationship vector
//! toward its user, layered memory, and accumulated experience. Each turn
//! flows through a fixed pipeline:
//!
//! 1. **Normalize** the incoming message ([`context`])
//! 2. **Assemble** working memory ([`memory`])
//! 3. **Perceive** sentiment and tone ([`perception`])
//! 4. **Classify** intents ([`intent`])
//! 5. **Resolve** one dominant motivation ([`motivation`])
//! 6. **Update** mood and relationship ([`mood`])
//! 7. **Post-process** the generated reply ([`postprocess`])
//! 8. **Learn** — traits, experience, consolidation ([`learning`])
//!
//! Everything in this crate is deterministic given its inputs (random
//! branches take an injected RNG), so the full pipeline is testable without
//! a model in the loop. Prompt assembly and generation live in the engine
//! crate on top of this one.

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod group;
pub mod intent;
pub mod learning;
pub mod media_gate;
pub mod memory;
pub mod mood;
pub mod motivation;
pub mod perception;
pub mod persona;
pub mod postprocess;
pub mod store;
pub mod types;

pub use config::AmicaConfig;
pub use error::AmicaError;
pub use persona::{PersonaProfile, PROFILE_VERSION};
pub use types::*;
