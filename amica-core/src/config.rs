//! Configuration for the Amica engine.
//!
//! Maps directly to `amica.toml`. Every field has a serde default so a
//! partial file (or none at all) yields a working configuration.

use serde::{Deserialize, Serialize};

/// Top-level Amica configuration, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AmicaConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Per-persona memory limits.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Relationship update tuning.
    #[serde(default)]
    pub relationship: RelationshipConfig,
    /// Media readiness gate.
    #[serde(default)]
    pub media_gate: MediaGateConfig,
    /// Trait evolution and experience tuning.
    #[serde(default)]
    pub learning: LearningConfig,
    /// Generation provider settings.
    #[serde(default)]
    pub generation: GenerationConfig,
    /// Group conversation settings.
    #[serde(default)]
    pub group: GroupConfig,
    /// Idle-NPC initiative limits.
    #[serde(default)]
    pub initiative: InitiativeConfig,
    /// Persistence settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AmicaConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `AmicaError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::AmicaError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether the pipeline is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default reply language tag (BCP 47).
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            default_language: "it".to_string(),
        }
    }
}

/// Per-persona memory capacity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard cap on episodic entries per persona (oldest dropped).
    #[serde(default = "default_50")]
    pub max_episodes: usize,
    /// Media exchange log cap per persona.
    #[serde(default = "default_20")]
    pub max_media_entries: usize,
    /// Rolling anti-repetition buffer of reply openings.
    #[serde(default = "default_5")]
    pub max_openings: usize,
    /// Short-term history window fed into the prompt.
    #[serde(default = "default_12")]
    pub short_term_window: usize,
    /// Consolidate into the long-term summary every N episodes.
    #[serde(default = "default_10_usize")]
    pub consolidation_cadence: usize,
    /// Max characters kept in the long-term summary.
    #[serde(default = "default_2000")]
    pub max_summary_chars: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_episodes: 50,
            max_media_entries: 20,
            max_openings: 5,
            short_term_window: 12,
            consolidation_cadence: 10,
            max_summary_chars: 2000,
        }
    }
}

/// Relationship vector update tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipConfig {
    /// Per-turn upward drift for trust.
    #[serde(default = "default_0_01")]
    pub trust_step: f32,
    /// Per-turn upward drift for attachment.
    #[serde(default = "default_0_01")]
    pub attachment_step: f32,
    /// Per-turn upward drift for comfort.
    #[serde(default = "default_0_015")]
    pub comfort_step: f32,
    /// Jealousy drift magnitude, signed by emotional polarity.
    #[serde(default = "default_0_02")]
    pub jealousy_step: f32,
    /// Valence above this reads as high (playful mood).
    #[serde(default = "default_0_65")]
    pub high_valence: f32,
    /// Valence below this reads as low (hurt mood).
    #[serde(default = "default_0_35")]
    pub low_valence: f32,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            trust_step: 0.01,
            attachment_step: 0.01,
            comfort_step: 0.015,
            jealousy_step: 0.02,
            high_valence: 0.65,
            low_valence: 0.35,
        }
    }
}

/// Media readiness gate configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaGateConfig {
    /// Interactions required before any media hand-off is allowed.
    #[serde(default = "default_10")]
    pub interaction_threshold: u32,
}

impl Default for MediaGateConfig {
    fn default() -> Self {
        Self {
            interaction_threshold: 10,
        }
    }
}

/// Trait evolution and experience tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Magnitude of per-turn trait nudges.
    #[serde(default = "default_0_02")]
    pub trait_step: f32,
    /// XP granted on the axis matching the turn's dominant goal.
    #[serde(default = "default_8_0")]
    pub xp_primary: f32,
    /// XP granted on secondary axes touched by the turn.
    #[serde(default = "default_2_0")]
    pub xp_secondary: f32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            trait_step: 0.02,
            xp_primary: 8.0,
            xp_secondary: 2.0,
        }
    }
}

/// Generation provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the default (policy-filtered) provider.
    #[serde(default = "default_provider_url")]
    pub default_base_url: String,
    /// Model name on the default provider.
    #[serde(default = "default_model")]
    pub default_model: String,
    /// Base URL of the unrestricted provider used for explicit turns.
    #[serde(default = "default_provider_url")]
    pub unrestricted_base_url: String,
    /// Model name on the unrestricted provider.
    #[serde(default = "default_unrestricted_model")]
    pub unrestricted_model: String,
    /// Hard timeout for any generation call in milliseconds.
    #[serde(default = "default_15000")]
    pub request_timeout_ms: u64,
    /// Retries against the alternate provider before degrading.
    #[serde(default = "default_1")]
    pub max_fallback_attempts: u32,
    /// Target maximum characters in a reply before truncation repair.
    #[serde(default = "default_600")]
    pub max_reply_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_base_url: "http://localhost:11434".to_string(),
            default_model: "llama3.1:8b".to_string(),
            unrestricted_base_url: "http://localhost:11434".to_string(),
            unrestricted_model: "dolphin-mistral:7b".to_string(),
            request_timeout_ms: 15_000,
            max_fallback_attempts: 1,
            max_reply_chars: 600,
        }
    }
}

/// Group conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupConfig {
    /// TTL for cached group context, in seconds.
    #[serde(default = "default_300")]
    pub context_ttl_seconds: u64,
    /// Maximum NPCs that may respond to a single group message.
    #[serde(default = "default_1")]
    pub max_responders: u32,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            context_ttl_seconds: 300,
            max_responders: 1,
        }
    }
}

/// Idle-NPC initiative rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitiativeConfig {
    /// Minimum seconds between initiative turns per (user, NPC) pair.
    #[serde(default = "default_3600")]
    pub cooldown_seconds: u64,
    /// Maximum initiative turns per pair per day.
    #[serde(default = "default_3")]
    pub daily_cap: u32,
}

impl Default for InitiativeConfig {
    fn default() -> Self {
        Self {
            cooldown_seconds: 3600,
            daily_cap: 3,
        }
    }
}

/// Persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite" or "memory" (tests).
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Rotating backups kept alongside the database file (0 disables).
    #[serde(default = "default_2")]
    pub backup_count: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            wal_mode: true,
            checksum_enabled: true,
            backup_count: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_language() -> String { "it".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_provider_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "llama3.1:8b".to_string() }
fn default_unrestricted_model() -> String { "dolphin-mistral:7b".to_string() }
fn default_0_01() -> f32 { 0.01 }
fn default_0_015() -> f32 { 0.015 }
fn default_0_02() -> f32 { 0.02 }
fn default_0_35() -> f32 { 0.35 }
fn default_0_65() -> f32 { 0.65 }
fn default_2_0() -> f32 { 2.0 }
fn default_8_0() -> f32 { 8.0 }
fn default_1() -> u32 { 1 }
fn default_2() -> u32 { 2 }
fn default_3() -> u32 { 3 }
fn default_5() -> usize { 5 }
fn default_10() -> u32 { 10 }
fn default_10_usize() -> usize { 10 }
fn default_12() -> usize { 12 }
fn default_20() -> usize { 20 }
fn default_50() -> usize { 50 }
fn default_300() -> u64 { 300 }
fn default_600() -> usize { 600 }
fn default_2000() -> usize { 2000 }
fn default_3600() -> u64 { 3600 }
fn default_15000() -> u64 { 15_000 }
