//! Per-turn conversation context.
//!
//! A [`ConversationContext`] is owned exclusively by one pipeline invocation
//! and discarded after the turn. Construction doubles as the input
//! normalizer: it trims the raw message and echoes metadata. No error paths.

use serde::{Deserialize, Serialize};

use crate::types::{GroupId, NpcId, UserId};

/// Who spoke a history turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The human user.
    User,
    /// The NPC persona.
    Npc,
}

/// One prior turn of the conversation window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryTurn {
    /// Who spoke.
    pub speaker: Speaker,
    /// What was said.
    pub text: String,
}

impl HistoryTurn {
    /// Convenience constructor for a user turn.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::User,
            text: text.into(),
        }
    }

    /// Convenience constructor for an NPC turn.
    #[must_use]
    pub fn npc(text: impl Into<String>) -> Self {
        Self {
            speaker: Speaker::Npc,
            text: text.into(),
        }
    }
}

/// Kind of media attached to or requested in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// A still image.
    Photo,
    /// A photo of the NPC and user together.
    CouplePhoto,
    /// A video clip.
    Video,
    /// A voice note.
    Audio,
}

impl MediaKind {
    /// Canonical lowercase name used in wire directives.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::CouplePhoto => "couple_photo",
            Self::Video => "video",
            Self::Audio => "audio",
        }
    }

    /// Parse a directive token; unknown tokens map to `Photo`.
    #[must_use]
    pub fn parse_lossy(token: &str) -> Self {
        match token.trim().to_lowercase().as_str() {
            "video" => Self::Video,
            "audio" | "voice" => Self::Audio,
            "couple_photo" | "together" => Self::CouplePhoto,
            _ => Self::Photo,
        }
    }
}

/// Descriptor for media attached to an inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// What kind of media.
    pub kind: MediaKind,
    /// Opaque locator (URL or storage key) — never dereferenced by the core.
    pub locator: String,
}

/// Ephemeral per-turn context handed through the pipeline.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    /// The human user this turn belongs to.
    pub user_id: UserId,
    /// The NPC persona responding.
    pub npc_id: NpcId,
    /// Group room, when this is a multi-party turn.
    pub group_id: Option<GroupId>,
    /// The message exactly as received.
    pub raw_message: String,
    /// Trimmed message text used by every analyzer.
    pub text: String,
    /// Recent history window (oldest first).
    pub history: Vec<HistoryTurn>,
    /// Media attached to the inbound message, if any.
    pub media: Option<MediaDescriptor>,
    /// Reply language tag (BCP 47).
    pub language: String,
}

impl ConversationContext {
    /// Normalize a raw inbound message into a turn context.
    ///
    /// Pure transformation: trims the text, collapses internal runs of
    /// whitespace, and echoes all metadata unchanged.
    #[must_use]
    pub fn normalize(
        user_id: UserId,
        npc_id: NpcId,
        group_id: Option<GroupId>,
        raw_message: &str,
        history: Vec<HistoryTurn>,
        media: Option<MediaDescriptor>,
        language: &str,
    ) -> Self {
        let text = raw_message.split_whitespace().collect::<Vec<_>>().join(" ");
        Self {
            user_id,
            npc_id,
            group_id,
            raw_message: raw_message.to_string(),
            text,
            history,
            media,
            language: if language.trim().is_empty() {
                "it".to_string()
            } else {
                language.trim().to_string()
            },
        }
    }

    /// Whether this turn takes place in a group room.
    #[must_use]
    pub fn is_group(&self) -> bool {
        self.group_id.is_some()
    }

    /// Lowercased message text for keyword scans.
    #[must_use]
    pub fn lowercase(&self) -> String {
        self.text.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_collapses_whitespace() {
        let ctx = ConversationContext::normalize(
            UserId::new(),
            NpcId::new(),
            None,
            "  ciao   amore \n come stai?  ",
            vec![],
            None,
            "it",
        );
        assert_eq!(ctx.text, "ciao amore come stai?");
        assert!(ctx.raw_message.starts_with("  ciao"));
    }

    #[test]
    fn empty_language_falls_back() {
        let ctx = ConversationContext::normalize(
            UserId::new(),
            NpcId::new(),
            None,
            "hi",
            vec![],
            None,
            "  ",
        );
        assert_eq!(ctx.language, "it");
    }

    #[test]
    fn media_kind_parse_is_lossy() {
        assert_eq!(MediaKind::parse_lossy("video"), MediaKind::Video);
        assert_eq!(MediaKind::parse_lossy("VOICE"), MediaKind::Audio);
        assert_eq!(MediaKind::parse_lossy("whatever"), MediaKind::Photo);
    }
}
