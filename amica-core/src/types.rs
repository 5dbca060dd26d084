//! Core type definitions for the Amica cognitive pipeline.
//!
//! All bounded numeric state in these types is clamped to [0, 1] at
//! construction and on every update, so downstream code can rely on the
//! range without re-validating.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a human user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// Create a new random user ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for an NPC persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NpcId(pub Uuid);

impl NpcId {
    /// Create a new random NPC ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NpcId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a multi-party conversation room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for NpcId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Bounded scalar helper
// ---------------------------------------------------------------------------

/// Clamp a scalar to the canonical [0, 1] state range.
#[must_use]
pub fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

// ---------------------------------------------------------------------------
// Emotion Model — VAD (Valence-Arousal-Dominance)
// ---------------------------------------------------------------------------

/// VAD emotional state, each axis normalised to [0, 1]:
/// - **Valence**: miserable (0) → joyful (1)
/// - **Arousal**: flat (0) → charged (1)
/// - **Dominance**: passive (0) → assertive (1)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EmotionVector {
    /// Miserable (0.0) to joyful (1.0).
    pub valence: f32,
    /// Flat (0.0) to charged (1.0).
    pub arousal: f32,
    /// Passive (0.0) to assertive (1.0).
    pub dominance: f32,
}

impl EmotionVector {
    /// Neutral midpoint state.
    pub const NEUTRAL: Self = Self {
        valence: 0.5,
        arousal: 0.5,
        dominance: 0.5,
    };

    /// Create a new emotion vector, clamping each axis to [0, 1].
    #[must_use]
    pub fn new(valence: f32, arousal: f32, dominance: f32) -> Self {
        Self {
            valence: clamp01(valence),
            arousal: clamp01(arousal),
            dominance: clamp01(dominance),
        }
    }

    /// Shift each axis by a delta, clamping the result.
    #[must_use]
    pub fn shifted(&self, dv: f32, da: f32, dd: f32) -> Self {
        Self::new(self.valence + dv, self.arousal + da, self.dominance + dd)
    }

    /// Overall emotional intensity — distance from the neutral midpoint.
    #[must_use]
    pub fn intensity(&self) -> f32 {
        let dv = self.valence - 0.5;
        let da = self.arousal - 0.5;
        let dd = self.dominance - 0.5;
        (dv * dv + da * da + dd * dd).sqrt()
    }
}

impl Default for EmotionVector {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

// ---------------------------------------------------------------------------
// Mood
// ---------------------------------------------------------------------------

/// Discrete mood label derived each turn from the emotion vector and the
/// relationship state. Drives prompt register and opening selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// High valence — teasing, light.
    Playful,
    /// Mid valence — gentle, affectionate.
    Tender,
    /// Low valence — wounded, withdrawn.
    Hurt,
    /// Elevated arousal/dominance override for explicit turns.
    Hot,
    /// Neutral positive fallback when an explicit override is demoted.
    Warm,
}

impl Mood {
    /// Human-readable label used in prompts and state snapshots.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Playful => "playful",
            Self::Tender => "tender",
            Self::Hurt => "hurt",
            Self::Hot => "hot",
            Self::Warm => "warm",
        }
    }
}

impl Default for Mood {
    fn default() -> Self {
        Self::Tender
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Tone Mode
// ---------------------------------------------------------------------------

/// Register setting controlling explicitness of generated dialogue.
///
/// Always resolves to exactly one of the five values; unknown or missing
/// input normalises to [`ToneMode::Soft`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneMode {
    /// Affectionate, no innuendo.
    Soft,
    /// Light teasing and innuendo.
    Flirty,
    /// Emotionally intense, sensual but not graphic.
    Romantic,
    /// Graphic adult register.
    Explicit,
    /// Maximum intensity adult register.
    Extreme,
}

impl ToneMode {
    /// All tone modes in escalation order.
    pub const ALL: [Self; 5] = [
        Self::Soft,
        Self::Flirty,
        Self::Romantic,
        Self::Explicit,
        Self::Extreme,
    ];

    /// Total normalisation: any string maps to a canonical mode,
    /// defaulting to `Soft` for unknown input.
    #[must_use]
    pub fn normalize(input: &str) -> Self {
        match input.trim().to_lowercase().as_str() {
            "flirty" => Self::Flirty,
            "romantic" => Self::Romantic,
            "explicit" | "spicy" => Self::Explicit,
            "extreme" => Self::Extreme,
            _ => Self::Soft,
        }
    }

    /// Canonical lowercase name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Soft => "soft",
            Self::Flirty => "flirty",
            Self::Romantic => "romantic",
            Self::Explicit => "explicit",
            Self::Extreme => "extreme",
        }
    }

    /// Whether this mode permits graphic content.
    #[must_use]
    pub fn is_explicit(self) -> bool {
        matches!(self, Self::Explicit | Self::Extreme)
    }
}

impl Default for ToneMode {
    fn default() -> Self {
        Self::Soft
    }
}

impl fmt::Display for ToneMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Relationship Vector
// ---------------------------------------------------------------------------

/// Per-user relationship state, every component clamped to [0, 1].
///
/// Trust, attachment and comfort trend upward with interaction; jealousy
/// trends with emotional polarity of the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RelationshipVector {
    /// Confidence that the user is safe to open up to.
    pub trust: f32,
    /// Emotional bond strength.
    pub attachment: f32,
    /// Possessive reaction tendency.
    pub jealousy: f32,
    /// Ease felt in the user's presence.
    pub comfort: f32,
    /// How central the user is to the persona's social world.
    pub importance: f32,
}

impl RelationshipVector {
    /// Create a relationship vector, clamping every component.
    #[must_use]
    pub fn new(trust: f32, attachment: f32, jealousy: f32, comfort: f32, importance: f32) -> Self {
        Self {
            trust: clamp01(trust),
            attachment: clamp01(attachment),
            jealousy: clamp01(jealousy),
            comfort: clamp01(comfort),
            importance: clamp01(importance),
        }
    }

    /// Apply per-component deltas, clamping each result.
    pub fn nudge(&mut self, dt: f32, da: f32, dj: f32, dc: f32, di: f32) {
        self.trust = clamp01(self.trust + dt);
        self.attachment = clamp01(self.attachment + da);
        self.jealousy = clamp01(self.jealousy + dj);
        self.comfort = clamp01(self.comfort + dc);
        self.importance = clamp01(self.importance + di);
    }

    /// One-line snapshot for prompts and turn results.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "trust {:.2}, attachment {:.2}, jealousy {:.2}, comfort {:.2}, importance {:.2}",
            self.trust, self.attachment, self.jealousy, self.comfort, self.importance
        )
    }
}

impl Default for RelationshipVector {
    fn default() -> Self {
        Self::new(0.3, 0.2, 0.1, 0.3, 0.2)
    }
}

// ---------------------------------------------------------------------------
// Personality Traits
// ---------------------------------------------------------------------------

/// Big-Five core personality scores. Each ranges 0.0–1.0 and is static
/// after persona creation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoreTraits {
    /// Curiosity and willingness to explore topics.
    pub openness: f32,
    /// Reliability and steadiness of register.
    pub conscientiousness: f32,
    /// Talkativeness and initiative.
    pub extraversion: f32,
    /// Warmth and accommodation.
    pub agreeableness: f32,
    /// Sensitivity to negative signals.
    pub neuroticism: f32,
}

impl Default for CoreTraits {
    fn default() -> Self {
        Self {
            openness: 0.5,
            conscientiousness: 0.5,
            extraversion: 0.5,
            agreeableness: 0.5,
            neuroticism: 0.5,
        }
    }
}

/// Custom persona traits that micro-evolve with each turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CustomTraits {
    /// Possessiveness in the face of rivals or conflict.
    pub jealousy: f32,
    /// Teasing, game-like register.
    pub playfulness: f32,
    /// Dry or sarcastic edge.
    pub irony: f32,
    /// Willingness to expose emotional weakness.
    pub vulnerability: f32,
}

impl CustomTraits {
    /// Apply deltas to each trait, clamping to [0, 1].
    pub fn nudge(&mut self, dj: f32, dp: f32, di: f32, dv: f32) {
        self.jealousy = clamp01(self.jealousy + dj);
        self.playfulness = clamp01(self.playfulness + dp);
        self.irony = clamp01(self.irony + di);
        self.vulnerability = clamp01(self.vulnerability + dv);
    }
}

impl Default for CustomTraits {
    fn default() -> Self {
        Self {
            jealousy: 0.3,
            playfulness: 0.5,
            irony: 0.3,
            vulnerability: 0.4,
        }
    }
}

// ---------------------------------------------------------------------------
// Experience
// ---------------------------------------------------------------------------

/// Experience accumulated across four behavioral axes.
///
/// The level increments when total XP crosses `level * 100`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Experience {
    /// Current level (starts at 1).
    pub level: u32,
    /// XP from intimate/affectionate exchanges.
    pub intimacy_xp: f32,
    /// XP from comfort and support turns.
    pub empathy_xp: f32,
    /// XP from conflict handled.
    pub conflict_xp: f32,
    /// XP from group/social interaction.
    pub social_xp: f32,
}

impl Experience {
    /// Total XP across all axes.
    #[must_use]
    pub fn total(&self) -> f32 {
        self.intimacy_xp + self.empathy_xp + self.conflict_xp + self.social_xp
    }

    /// XP required before the next level-up.
    #[must_use]
    pub fn next_level_threshold(&self) -> f32 {
        self.level as f32 * 100.0
    }
}

impl Default for Experience {
    fn default() -> Self {
        Self {
            level: 1,
            intimacy_xp: 0.0,
            empathy_xp: 0.0,
            conflict_xp: 0.0,
            social_xp: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Wall-clock helpers
// ---------------------------------------------------------------------------

/// Timestamp of the last interaction, stored on the relationship record.
pub type InteractionTime = DateTime<Utc>;
