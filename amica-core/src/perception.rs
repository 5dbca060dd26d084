//! Perception analyzers — deterministic lexical sentiment and tone
//! classification, plus stub media descriptors.
//!
//! These are keyword scans by deliberate design choice: no learned model,
//! no network calls, always the same output for the same input. A failure
//! anywhere degrades to the neutral/stub descriptor, never an error.

use serde::{Deserialize, Serialize};

use crate::context::{ConversationContext, MediaKind};

// ---------------------------------------------------------------------------
// Sentiment
// ---------------------------------------------------------------------------

/// Coarse lexical sentiment of the user message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Net-positive keyword balance.
    Positive,
    /// Net-negative keyword balance.
    Negative,
    /// Balanced or no signal.
    Neutral,
}

/// Coarse tone of the message beyond polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToneHint {
    /// Joking, teasing register.
    Playful,
    /// Affectionate register.
    Warm,
}

/// A lexical hint the text analyzer surfaces for the classifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerceptionHint {
    /// The user asked for a photo/video/audio.
    MediaRequest,
    /// The user sounds distressed.
    Distress,
    /// The message is a question.
    Question,
    /// Affectionate or intimate content.
    Intimacy,
    /// Hostile or insulting content.
    Aggression,
}

/// Output of the text analyzer for one turn.
#[derive(Debug, Clone, Default)]
pub struct Perception {
    /// Coarse polarity.
    pub sentiment: Sentiment,
    /// Optional coarse tone.
    pub tone: Option<ToneHint>,
    /// Deduplicated hints, in detection order.
    pub hints: Vec<PerceptionHint>,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::Neutral
    }
}

// ---------------------------------------------------------------------------
// Keyword tables
// ---------------------------------------------------------------------------

const POSITIVE_WORDS: &[&str] = &[
    "felice", "contenta", "contento", "bene", "bellissim", "ti amo", "adoro", "grazie",
    "fantastic", "happy", "great", "wonderful", "love you", "amazing", "perfetto",
];

const NEGATIVE_WORDS: &[&str] = &[
    "a pezzi", "triste", "malissimo", "piango", "piangere", "depress", "solo", "sola",
    "stanco", "stanca", "male", "sad", "broken", "awful", "terrible", "crying",
    "lonely", "exhausted", "hurt",
];

const PLAYFUL_WORDS: &[&str] = &["ahah", "haha", "lol", "scherz", "dai!", "😂", "😜"];

const WARM_WORDS: &[&str] = &["amore", "tesoro", "caro", "cara", "dolcezza", "sweetheart", "dear", "cucciola"];

const DISTRESS_WORDS: &[&str] = &[
    "a pezzi", "aiutami", "non ce la faccio", "piango", "disperat", "help me",
    "can't take", "falling apart", "crollo",
];

const MEDIA_WORDS: &[&str] = &[
    "foto", "photo", "selfie", "video", "vocale", "audio", "voce", "voglio vederti",
    "fammi vedere", "mandami", "send me", "show me", "picture", "pic",
];

const INTIMACY_WORDS: &[&str] = &[
    "ti amo", "mi manchi", "ti desidero", "bacio", "abbraccio", "love you", "miss you",
    "kiss", "hold you", "ti penso",
];

const AGGRESSION_WORDS: &[&str] = &[
    "stupida", "stupido", "idiota", "odio", "vaffanculo", "zitta", "zitto", "hate you",
    "shut up", "stupid", "useless", "inutile",
];

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn count_matches(text: &str, words: &[&str]) -> usize {
    words.iter().filter(|w| text.contains(*w)).count()
}

// ---------------------------------------------------------------------------
// Text analyzer
// ---------------------------------------------------------------------------

/// Analyze the message text into sentiment, tone, and hints.
#[must_use]
pub fn analyze_text(ctx: &ConversationContext) -> Perception {
    let text = ctx.lowercase();

    let positive = count_matches(&text, POSITIVE_WORDS);
    let negative = count_matches(&text, NEGATIVE_WORDS);
    let sentiment = if negative > positive {
        Sentiment::Negative
    } else if positive > negative {
        Sentiment::Positive
    } else {
        Sentiment::Neutral
    };

    let tone = if contains_any(&text, PLAYFUL_WORDS) {
        Some(ToneHint::Playful)
    } else if contains_any(&text, WARM_WORDS) {
        Some(ToneHint::Warm)
    } else {
        None
    };

    let mut hints = Vec::new();
    if contains_any(&text, MEDIA_WORDS) {
        hints.push(PerceptionHint::MediaRequest);
    }
    if sentiment == Sentiment::Negative || contains_any(&text, DISTRESS_WORDS) {
        hints.push(PerceptionHint::Distress);
    }
    if text.contains('?') {
        hints.push(PerceptionHint::Question);
    }
    if contains_any(&text, INTIMACY_WORDS) {
        hints.push(PerceptionHint::Intimacy);
    }
    if contains_any(&text, AGGRESSION_WORDS) {
        hints.push(PerceptionHint::Aggression);
    }

    Perception {
        sentiment,
        tone,
        hints,
    }
}

// ---------------------------------------------------------------------------
// Media analyzers (stub descriptors)
// ---------------------------------------------------------------------------

/// Descriptor produced for attached media.
///
/// When a media-understanding collaborator is available its richer output
/// replaces this stub; the stub alone is sufficient to drive the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaAnalysis {
    /// Kind of media analyzed.
    pub kind: MediaKind,
    /// Coarse mood read from the media.
    pub mood: String,
    /// Objects or subjects detected.
    pub objects: Vec<String>,
    /// One-sentence description.
    pub description: String,
}

impl MediaAnalysis {
    /// Neutral stub descriptor for a media kind.
    #[must_use]
    pub fn stub(kind: MediaKind) -> Self {
        let description = match kind {
            MediaKind::Photo | MediaKind::CouplePhoto => {
                "A photo the user shared; content could not be analyzed in detail."
            }
            MediaKind::Video => "A short video the user shared.",
            MediaKind::Audio => "A voice note the user shared.",
        };
        Self {
            kind,
            mood: "neutral".to_string(),
            objects: Vec::new(),
            description: description.to_string(),
        }
    }
}

/// Analyze attached media, degrading to the stub descriptor on any failure.
#[must_use]
pub fn analyze_media(ctx: &ConversationContext) -> Option<MediaAnalysis> {
    ctx.media.as_ref().map(|m| MediaAnalysis::stub(m.kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MediaDescriptor;
    use crate::types::{NpcId, UserId};

    fn ctx(message: &str) -> ConversationContext {
        ConversationContext::normalize(
            UserId::new(),
            NpcId::new(),
            None,
            message,
            vec![],
            None,
            "it",
        )
    }

    #[test]
    fn distressed_italian_message_reads_negative() {
        let perception = analyze_text(&ctx("Mi sento davvero a pezzi oggi"));
        assert_eq!(perception.sentiment, Sentiment::Negative);
        assert!(perception.hints.contains(&PerceptionHint::Distress));
    }

    #[test]
    fn affectionate_message_reads_positive_and_warm() {
        let perception = analyze_text(&ctx("Ti amo tesoro, oggi sono felice"));
        assert_eq!(perception.sentiment, Sentiment::Positive);
        assert_eq!(perception.tone, Some(ToneHint::Warm));
        assert!(perception.hints.contains(&PerceptionHint::Intimacy));
    }

    #[test]
    fn photo_request_is_hinted() {
        let perception = analyze_text(&ctx("mandami una foto"));
        assert!(perception.hints.contains(&PerceptionHint::MediaRequest));
    }

    #[test]
    fn question_mark_is_hinted() {
        let perception = analyze_text(&ctx("come stai?"));
        assert!(perception.hints.contains(&PerceptionHint::Question));
    }

    #[test]
    fn neutral_text_is_neutral() {
        let perception = analyze_text(&ctx("domani vado in ufficio"));
        assert_eq!(perception.sentiment, Sentiment::Neutral);
        assert!(perception.tone.is_none());
    }

    #[test]
    fn attached_media_yields_stub_descriptor() {
        let mut c = ctx("guarda qui");
        c.media = Some(MediaDescriptor {
            kind: MediaKind::Audio,
            locator: "bucket://x".into(),
        });
        let analysis = analyze_media(&c).expect("descriptor expected");
        assert_eq!(analysis.kind, MediaKind::Audio);
        assert_eq!(analysis.mood, "neutral");
    }

    #[test]
    fn no_media_yields_none() {
        assert!(analyze_media(&ctx("ciao")).is_none());
    }
}
