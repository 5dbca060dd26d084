//! Persona memory — bounded episodic log, media log, anti-repetition buffer,
//! and the read-only [`WorkingMemory`] projection the pipeline consumes.
//!
//! All logs are capped; pushing past a cap drops the oldest entry. The
//! projection never mutates the underlying profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::MemoryConfig;
use crate::context::{HistoryTurn, MediaKind};
use crate::types::Mood;

// ---------------------------------------------------------------------------
// Episodic entries
// ---------------------------------------------------------------------------

/// How emotionally charged an episode was.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    /// Routine exchange.
    Low,
    /// Noticeable emotional content.
    Medium,
    /// Strong emotional content (distress, conflict, intimacy peak).
    High,
}

/// One remembered interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeEntry {
    /// Unique identifier.
    pub id: Uuid,
    /// Short description of what happened.
    pub summary: String,
    /// Dominant topic of the exchange.
    pub topic: String,
    /// Mood the persona was in.
    pub mood: Mood,
    /// Emotional charge of the episode.
    pub intensity: Intensity,
    /// When it happened.
    pub timestamp: DateTime<Utc>,
}

impl EpisodeEntry {
    /// Create a new episode stamped now.
    #[must_use]
    pub fn new(
        summary: impl Into<String>,
        topic: impl Into<String>,
        mood: Mood,
        intensity: Intensity,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            summary: summary.into(),
            topic: topic.into(),
            mood,
            intensity,
            timestamp: Utc::now(),
        }
    }
}

/// One recorded media exchange (sent or received).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaLogEntry {
    /// Kind of media.
    pub kind: MediaKind,
    /// Caption or scene description.
    pub caption: String,
    /// When the exchange happened.
    pub timestamp: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Memory log aggregate
// ---------------------------------------------------------------------------

/// Per-persona memory aggregate, persisted inside the profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryLog {
    /// Bounded episodic list (oldest first).
    #[serde(default)]
    pub episodes: Vec<EpisodeEntry>,
    /// Bounded media exchange log (oldest first).
    #[serde(default)]
    pub media: Vec<MediaLogEntry>,
    /// Rolling buffer of the persona's last reply openings.
    #[serde(default)]
    pub last_openings: Vec<String>,
    /// Free-text long-term summary, appended on a fixed cadence.
    #[serde(default)]
    pub long_term_summary: String,
    /// Episodes recorded since the last consolidation.
    #[serde(default)]
    pub episodes_since_consolidation: usize,
}

impl MemoryLog {
    /// Append an episode, dropping the oldest past the cap.
    pub fn push_episode(&mut self, entry: EpisodeEntry, config: &MemoryConfig) {
        self.episodes.push(entry);
        let overflow = self.episodes.len().saturating_sub(config.max_episodes);
        if overflow > 0 {
            self.episodes.drain(0..overflow);
        }
        self.episodes_since_consolidation += 1;
    }

    /// Append a media exchange, dropping the oldest past the cap.
    pub fn push_media(&mut self, entry: MediaLogEntry, config: &MemoryConfig) {
        self.media.push(entry);
        let overflow = self.media.len().saturating_sub(config.max_media_entries);
        if overflow > 0 {
            self.media.drain(0..overflow);
        }
    }

    /// Record a reply opening in the anti-repetition buffer.
    pub fn push_opening(&mut self, opening: impl Into<String>, config: &MemoryConfig) {
        self.last_openings.push(opening.into());
        let overflow = self.last_openings.len().saturating_sub(config.max_openings);
        if overflow > 0 {
            self.last_openings.drain(0..overflow);
        }
    }

    /// Append a line to the long-term summary, trimming from the front when
    /// the character budget is exceeded.
    pub fn append_summary(&mut self, line: &str, config: &MemoryConfig) {
        if !self.long_term_summary.is_empty() {
            self.long_term_summary.push(' ');
        }
        self.long_term_summary.push_str(line);
        if self.long_term_summary.len() > config.max_summary_chars {
            let excess = self.long_term_summary.len() - config.max_summary_chars;
            // Trim at a char boundary at or after the excess point.
            let cut = self
                .long_term_summary
                .char_indices()
                .map(|(i, _)| i)
                .find(|&i| i >= excess)
                .unwrap_or(0);
            self.long_term_summary = self.long_term_summary.split_off(cut);
        }
        self.episodes_since_consolidation = 0;
    }
}

// ---------------------------------------------------------------------------
// Working memory projection
// ---------------------------------------------------------------------------

/// Read-only working view of a persona's memory for one turn.
///
/// Borrowed from the profile and the per-turn history window; assembling
/// it never mutates either.
#[derive(Debug)]
pub struct WorkingMemory<'a> {
    /// Raw recent turns (most recent last), capped to the short-term window.
    pub short_term: &'a [HistoryTurn],
    /// Most recent episodes (oldest first).
    pub episodes: &'a [EpisodeEntry],
    /// Long-term summary text.
    pub long_term_summary: &'a str,
    /// Tail of the media exchange log.
    pub media_log: &'a [MediaLogEntry],
    /// Anti-repetition buffer of recent openings.
    pub recent_openings: &'a [String],
}

impl<'a> WorkingMemory<'a> {
    /// Assemble the working view from a memory log and a history window.
    #[must_use]
    pub fn assemble(
        log: &'a MemoryLog,
        history: &'a [HistoryTurn],
        config: &MemoryConfig,
    ) -> Self {
        let short_start = history.len().saturating_sub(config.short_term_window);
        let episode_start = log.episodes.len().saturating_sub(config.consolidation_cadence);
        let media_start = log.media.len().saturating_sub(5);
        Self {
            short_term: &history[short_start..],
            episodes: &log.episodes[episode_start..],
            long_term_summary: &log.long_term_summary,
            media_log: &log.media[media_start..],
            recent_openings: &log.last_openings,
        }
    }

    /// Whether a candidate opening collides with the anti-repetition buffer.
    #[must_use]
    pub fn opening_is_stale(&self, opening: &str) -> bool {
        let candidate = opening.trim().to_lowercase();
        self.recent_openings
            .iter()
            .any(|o| o.trim().to_lowercase() == candidate)
    }
}
