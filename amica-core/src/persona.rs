//! The persisted persona profile — one NPC's personality, state, memory,
//! and relationship record with respect to one user.
//!
//! The profile is a single explicit serde schema. Legacy field spellings
//! from earlier saves are resolved once at load time via serde aliases;
//! nothing downstream ever sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::MemoryLog;
use crate::types::{
    CoreTraits, CustomTraits, EmotionVector, Experience, Mood, NpcId, RelationshipVector, ToneMode,
};

/// Current profile schema version. Bump when the layout changes.
pub const PROFILE_VERSION: u32 = 2;

/// Static identity of the persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    /// Display name used in conversation and invocation detection.
    pub name: String,
    /// Static appearance description fed to media scene prompts.
    #[serde(default)]
    pub appearance: String,
}

/// User-tunable conversation preferences.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Preferences {
    /// Current tone register.
    #[serde(default)]
    pub tone_mode: ToneMode,
    /// Target reply length in sentences.
    #[serde(default = "default_reply_sentences")]
    pub reply_sentences: u32,
    /// Topics the persona leans into.
    #[serde(default)]
    pub liked_topics: Vec<String>,
    /// Topics the persona steers away from.
    #[serde(default)]
    pub disliked_topics: Vec<String>,
}

fn default_reply_sentences() -> u32 {
    2
}

/// Mutable per-turn emotional and relational state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PersonaState {
    /// Current mood label.
    #[serde(default)]
    pub mood: Mood,
    /// Current emotion vector.
    #[serde(default, alias = "emotion_vector", alias = "emotionVector")]
    pub emotion: EmotionVector,
}

/// The complete persisted persona profile.
///
/// Created lazily on first contact, mutated once per turn by the pipeline
/// stages that touch state, and persisted atomically at end of turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaProfile {
    /// Schema version for migration at the store boundary.
    #[serde(default = "default_version")]
    pub version: u32,
    /// NPC identifier.
    pub npc_id: NpcId,
    /// Static identity.
    pub identity: Identity,
    /// Big-Five core personality.
    #[serde(default)]
    pub core_traits: CoreTraits,
    /// Evolving custom traits.
    #[serde(default)]
    pub custom_traits: CustomTraits,
    /// Current mood and emotion.
    #[serde(default)]
    pub state: PersonaState,
    /// Experience and level.
    #[serde(default)]
    pub experience: Experience,
    /// Relationship with the user.
    #[serde(default)]
    pub relationship: RelationshipVector,
    /// When the user last interacted with this persona.
    #[serde(default = "Utc::now")]
    pub last_interaction: DateTime<Utc>,
    /// Conversation preferences.
    #[serde(default)]
    pub preferences: Preferences,
    /// Bounded memory logs.
    #[serde(default)]
    pub memory: MemoryLog,
    /// Messages exchanged between this user and NPC (media gate counter).
    #[serde(default)]
    pub interaction_count: u32,
    /// Guard that demotes explicit mood overrides (family-safe persona).
    #[serde(default)]
    pub family_guard: bool,
}

fn default_version() -> u32 {
    1
}

impl PersonaProfile {
    /// Seed a neutral default profile for first contact.
    #[must_use]
    pub fn seed(npc_id: NpcId, name: impl Into<String>) -> Self {
        Self {
            version: PROFILE_VERSION,
            npc_id,
            identity: Identity {
                name: name.into(),
                appearance: String::new(),
            },
            core_traits: CoreTraits::default(),
            custom_traits: CustomTraits::default(),
            state: PersonaState::default(),
            experience: Experience::default(),
            relationship: RelationshipVector::default(),
            last_interaction: Utc::now(),
            preferences: Preferences::default(),
            memory: MemoryLog::default(),
            interaction_count: 0,
            family_guard: false,
        }
    }

    /// Migrate a profile loaded from storage to the current schema version.
    ///
    /// Version 1 profiles predate the explicit tone mode default and the
    /// interaction counter; both already deserialize to valid defaults, so
    /// migration only re-stamps the version. Serde aliases resolve legacy
    /// field spellings during deserialization itself.
    #[must_use]
    pub fn migrated(mut self) -> Self {
        if self.version < PROFILE_VERSION {
            self.version = PROFILE_VERSION;
        }
        self
    }

    /// Record that a turn happened now.
    pub fn touch(&mut self) {
        self.interaction_count = self.interaction_count.saturating_add(1);
        self.last_interaction = Utc::now();
    }
}
