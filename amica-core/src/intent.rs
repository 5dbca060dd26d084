//! Intent classification — curated phrase-rule tables plus specialized
//! classifiers for media desire, social addressing, and emotional need.
//!
//! Classification is deliberately heuristic: rule tables are plain data
//! (`pattern → intent`) so each rule is testable in isolation from control
//! flow. All classifiers are pure functions of (perception, context).

use serde::{Deserialize, Serialize};

use crate::context::{ConversationContext, MediaKind};
use crate::perception::{Perception, PerceptionHint, Sentiment};

// ---------------------------------------------------------------------------
// Intent taxonomy
// ---------------------------------------------------------------------------

/// Discrete intents detectable in a single message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Hostile or insulting content.
    Aggression,
    /// Irritation without direct hostility.
    Frustration,
    /// Affectionate or intimate content.
    Intimacy,
    /// Request for a photo, video, or voice note.
    MediaRequest,
    /// A direct question.
    Question,
    /// The user addressed an NPC or the room.
    GroupAddress,
    /// Emotional venting (negative sentiment without a request).
    EmotionalVenting,
    /// Complaint about repetitive or flat replies.
    ToneComplaint,
    /// Request for a more explicit register.
    SpicyRequest,
}

/// One rule in the classification table.
#[derive(Debug, Clone, Copy)]
pub struct IntentRule {
    /// Lowercase substrings; any match fires the rule.
    pub patterns: &'static [&'static str],
    /// Intent the rule produces.
    pub intent: Intent,
}

/// The curated rule table, scanned in order.
pub const INTENT_RULES: &[IntentRule] = &[
    IntentRule {
        patterns: &[
            "stupida", "stupido", "idiota", "odio", "vaffanculo", "zitta", "zitto",
            "hate you", "shut up", "stupid", "useless",
        ],
        intent: Intent::Aggression,
    },
    IntentRule {
        patterns: &[
            "uffa", "basta", "non capisci", "mi stai stressando", "annoying",
            "frustrat", "you don't understand", "che palle",
        ],
        intent: Intent::Frustration,
    },
    IntentRule {
        patterns: &[
            "ti amo", "mi manchi", "ti desidero", "bacio", "abbraccio", "love you",
            "miss you", "kiss", "ti penso", "amore mio",
        ],
        intent: Intent::Intimacy,
    },
    IntentRule {
        patterns: &[
            "foto", "photo", "selfie", "video", "vocale", "audio", "voglio vederti",
            "fammi vedere", "mandami", "send me", "show me", "picture",
        ],
        intent: Intent::MediaRequest,
    },
    IntentRule {
        patterns: &[
            "sei sempre uguale", "ripeti sempre", "dici sempre", "you always say",
            "boring", "noiosa", "noioso", "sempre le stesse cose",
        ],
        intent: Intent::ToneComplaint,
    },
    IntentRule {
        patterns: &[
            "parlami sporco", "più spinto", "spicy", "dirty talk", "osé", "piccante",
            "senza freni", "be naughty",
        ],
        intent: Intent::SpicyRequest,
    },
];

// ---------------------------------------------------------------------------
// Tone-override triggers
// ---------------------------------------------------------------------------

/// Boolean flags for explicit tone-mode trigger phrases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ToneTriggers {
    /// The user asked for a more explicit register.
    pub wants_explicit: bool,
    /// The user asked for a romantic register.
    pub wants_romantic: bool,
    /// The user asked to tone things down.
    pub wants_soft: bool,
}

const EXPLICIT_TRIGGERS: &[&str] = &[
    "parlami sporco", "più spinto", "spicy", "dirty talk", "senza freni", "piccante",
];
const ROMANTIC_TRIGGERS: &[&str] = &["più romantica", "più romantico", "be romantic", "romanticismo"];
const SOFT_TRIGGERS: &[&str] = &["più dolce", "calmati", "keep it soft", "meno spinto", "rallenta"];

// ---------------------------------------------------------------------------
// Specialized classifier outputs
// ---------------------------------------------------------------------------

/// Media desire detected by the keyword pre-filter.
///
/// Photo-class intents may be escalated by the caller to a structured
/// gateway sub-call for a richer scene description; this struct is the
/// keyword-level result that survives a failed escalation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaIntent {
    /// What kind of media the user wants.
    pub kind: MediaKind,
    /// Scene description, keyword-level until escalation enriches it.
    pub scene: String,
}

/// How the user is addressing the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SocialStance {
    /// One-to-one conversation.
    Private,
    /// The user called this NPC (or the room) out by name.
    GroupAddressed,
    /// Group conversation where this NPC is a bystander.
    Observing,
}

/// Emotional need behind the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalNeed {
    /// The user needs comfort.
    SeekComfort,
    /// The user wants to share something good.
    ShareJoy,
    /// No particular emotional demand.
    Maintain,
}

/// The combined classification result for one turn.
#[derive(Debug, Clone)]
pub struct IntentReport {
    /// Deduplicated detected intents, in detection order.
    pub intents: Vec<Intent>,
    /// Tone-override trigger flags.
    pub tone_triggers: ToneTriggers,
    /// Media desire, when present.
    pub media: Option<MediaIntent>,
    /// Social addressing stance.
    pub social: SocialStance,
    /// Emotional need.
    pub emotional: EmotionalNeed,
}

impl IntentReport {
    /// Whether a given intent was detected.
    #[must_use]
    pub fn has(&self, intent: Intent) -> bool {
        self.intents.contains(&intent)
    }
}

// ---------------------------------------------------------------------------
// General classifier
// ---------------------------------------------------------------------------

fn push_unique(intents: &mut Vec<Intent>, intent: Intent) {
    if !intents.contains(&intent) {
        intents.push(intent);
    }
}

/// Run the full classification for one turn.
#[must_use]
pub fn classify(perception: &Perception, ctx: &ConversationContext, npc_name: &str) -> IntentReport {
    let text = ctx.lowercase();
    let mut intents = Vec::new();

    for rule in INTENT_RULES {
        if rule.patterns.iter().any(|p| text.contains(p)) {
            push_unique(&mut intents, rule.intent);
        }
    }

    if perception.hints.contains(&PerceptionHint::Question) {
        push_unique(&mut intents, Intent::Question);
    }
    // Sentiment-derived venting: distress with no other demand reads as venting.
    if perception.sentiment == Sentiment::Negative {
        push_unique(&mut intents, Intent::EmotionalVenting);
    }

    let social = classify_social(ctx, npc_name);
    if ctx.is_group() && social == SocialStance::GroupAddressed {
        push_unique(&mut intents, Intent::GroupAddress);
    }

    IntentReport {
        intents,
        tone_triggers: detect_tone_triggers(&text),
        media: detect_media_intent(&text),
        social,
        emotional: classify_emotional(perception),
    }
}

/// Detect explicit tone-override trigger phrases.
#[must_use]
pub fn detect_tone_triggers(lower_text: &str) -> ToneTriggers {
    ToneTriggers {
        wants_explicit: EXPLICIT_TRIGGERS.iter().any(|p| lower_text.contains(p)),
        wants_romantic: ROMANTIC_TRIGGERS.iter().any(|p| lower_text.contains(p)),
        wants_soft: SOFT_TRIGGERS.iter().any(|p| lower_text.contains(p)),
    }
}

/// Keyword pre-filter for media desire.
///
/// Returns the media kind plus the raw message as the keyword-level scene.
#[must_use]
pub fn detect_media_intent(lower_text: &str) -> Option<MediaIntent> {
    const VIDEO: &[&str] = &["video", "filmato", "clip"];
    const AUDIO: &[&str] = &["vocale", "audio", "voce", "voice note", "sentire la tua voce"];
    const TOGETHER: &[&str] = &["insieme", "together", "noi due", "di noi"];
    const PHOTO: &[&str] = &[
        "foto", "photo", "selfie", "picture", "pic", "voglio vederti", "fammi vedere",
        "show me", "immagine",
    ];

    let kind = if VIDEO.iter().any(|p| lower_text.contains(p)) {
        MediaKind::Video
    } else if AUDIO.iter().any(|p| lower_text.contains(p)) {
        MediaKind::Audio
    } else if PHOTO.iter().any(|p| lower_text.contains(p)) {
        if TOGETHER.iter().any(|p| lower_text.contains(p)) {
            MediaKind::CouplePhoto
        } else {
            MediaKind::Photo
        }
    } else {
        return None;
    };

    Some(MediaIntent {
        kind,
        scene: lower_text.to_string(),
    })
}

/// Classify how the user is addressing the room.
///
/// Only meaningful when a group id is present; 1:1 turns are `Private`.
#[must_use]
pub fn classify_social(ctx: &ConversationContext, npc_name: &str) -> SocialStance {
    if !ctx.is_group() {
        return SocialStance::Private;
    }

    let text = ctx.lowercase();
    let name = npc_name.to_lowercase();
    let called_by_name = !name.is_empty()
        && (text.contains(&format!("@{name}"))
            || text
                .split(|c: char| !c.is_alphanumeric())
                .any(|token| token == name));
    let addressed_room = ["tutti", "ragazze", "ragazzi", "everyone", "voi"]
        .iter()
        .any(|p| text.contains(p));

    if called_by_name || addressed_room {
        SocialStance::GroupAddressed
    } else {
        SocialStance::Observing
    }
}

/// Map sentiment to the emotional need behind the message.
#[must_use]
pub fn classify_emotional(perception: &Perception) -> EmotionalNeed {
    match perception.sentiment {
        Sentiment::Negative => EmotionalNeed::SeekComfort,
        Sentiment::Positive => EmotionalNeed::ShareJoy,
        Sentiment::Neutral => EmotionalNeed::Maintain,
    }
}
