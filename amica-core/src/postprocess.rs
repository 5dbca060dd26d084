//! Reply post-processing — scrubbing generated text into something the
//! persona would actually say, and extracting machine-readable directives.
//!
//! Processing is idempotent: running the pipeline over its own output
//! changes nothing, so retries and double-writes are harmless.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GenerationConfig;
use crate::context::MediaKind;
use crate::types::Mood;

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// An inline `[MEDIA:kind|caption]` directive extracted from the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDirective {
    /// Requested media kind.
    pub kind: MediaKind,
    /// Caption to attach to the generated media.
    pub caption: String,
}

/// A side-effect the caller should perform alongside delivering the text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyAction {
    /// Generate and send media of this kind.
    SendMedia(MediaKind),
    /// The reply ends with a question the user is expected to answer.
    AwaitAnswer,
    /// A reference photo of the user is needed before this media kind.
    RequestUserPhoto(MediaKind),
}

/// Caller-supplied adjustments merged into the default processing rules.
#[derive(Debug, Clone, Default)]
pub struct ReplyOverrides {
    /// Additional phrases to strip, case-insensitive.
    pub banned_phrases: Vec<String>,
    /// Actions appended after the derived ones.
    pub actions: Vec<ReplyAction>,
}

/// The cleaned reply plus everything extracted from it.
#[derive(Debug, Clone)]
pub struct ProcessedReply {
    /// Final user-facing text.
    pub text: String,
    /// Extracted media directives, in order of appearance.
    pub media: Vec<MediaDirective>,
    /// Derived plus overridden actions.
    pub actions: Vec<ReplyAction>,
    /// Opening fragment to record against future repetition.
    pub opening: String,
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Assistant-speak that breaks the persona illusion.
const BANNED_PHRASES: &[&str] = &[
    "as an ai",
    "as a language model",
    "i am an ai",
    "come assistente virtuale",
    "sono un'intelligenza artificiale",
    "sono un modello linguistico",
    "in quanto ia",
];

/// Replacement openings when the model repeats itself, keyed by mood.
fn alternate_openings(mood: Mood) -> &'static [&'static str] {
    match mood {
        Mood::Playful => &["Senti questa...", "Okay okay,", "Uh, aspetta:"],
        Mood::Tender | Mood::Warm => &["Sai,", "Ascolta,", "Mmh,"],
        Mood::Hurt => &["Guarda,", "Onestamente,", "Ecco,"],
        Mood::Hot => &["Vieni qui...", "Mmh,", "Allora,"],
    }
}

/// Leading fragment used for repetition detection: the first four tokens,
/// lowercased.
#[must_use]
pub fn opening_fragment(text: &str) -> String {
    text.split_whitespace()
        .take(4)
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

fn strip_banned(text: &str, extra: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut lower = text.to_lowercase();
    if lower.len() != text.len() {
        // Rare lowercase expansions would desync byte offsets; fall back to
        // case-sensitive matching for this reply.
        lower = text.to_string();
    }
    let mut skip: Vec<(usize, usize)> = Vec::new();
    for phrase in BANNED_PHRASES
        .iter()
        .map(|p| (*p).to_string())
        .chain(extra.iter().map(|p| p.to_lowercase()))
    {
        if phrase.is_empty() {
            continue;
        }
        let mut from = 0;
        while let Some(pos) = lower[from..].find(&phrase) {
            let start = from + pos;
            skip.push((start, start + phrase.len()));
            from = start + phrase.len();
        }
    }
    skip.sort_unstable();
    let mut cursor = 0;
    for (start, end) in skip {
        if start >= cursor {
            out.push_str(&text[cursor..start]);
            cursor = end;
        } else if end > cursor {
            cursor = end;
        }
    }
    out.push_str(&text[cursor..]);
    // Collapse whitespace left behind by removals.
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Extract `[MEDIA:kind|caption]` directives, returning the cleaned text.
fn extract_media(text: &str) -> (String, Vec<MediaDirective>) {
    let mut directives = Vec::new();
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find("[MEDIA:") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 7..];
        match after.find(']') {
            Some(close) => {
                let body = &after[..close];
                let (kind, caption) = match body.split_once('|') {
                    Some((k, c)) => (k, c),
                    None => (body, ""),
                };
                directives.push(MediaDirective {
                    kind: MediaKind::parse_lossy(kind.trim()),
                    caption: caption.trim().to_string(),
                });
                rest = &after[close + 1..];
            }
            None => {
                // Unterminated directive: drop the marker, keep the tail.
                rest = after;
            }
        }
    }
    out.push_str(rest);
    (out.split_whitespace().collect::<Vec<_>>().join(" "), directives)
}

/// Keep at most one question mark; later ones become periods.
fn cap_questions(text: &str) -> String {
    let mut seen = false;
    text.chars()
        .map(|c| {
            if c == '?' {
                if seen {
                    '.'
                } else {
                    seen = true;
                    '?'
                }
            } else {
                c
            }
        })
        .collect()
}

/// Swap a repeated opening for a mood-appropriate alternate.
fn deduplicate_opening(text: &str, mood: Mood, recent: &[String]) -> String {
    let fragment = opening_fragment(text);
    if fragment.is_empty() || !recent.iter().any(|o| *o == fragment) {
        return text.to_string();
    }
    let alternates = alternate_openings(mood);
    let pick = alternates
        .iter()
        .find(|a| !recent.iter().any(|o| *o == opening_fragment(a)))
        .copied()
        .unwrap_or(alternates[0]);
    let body: Vec<&str> = text.split_whitespace().skip(4).collect();
    if body.is_empty() {
        pick.to_string()
    } else {
        format!("{pick} {}", body.join(" "))
    }
}

/// Truncate over-long replies at a char boundary and close with an ellipsis.
fn bound_length(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", truncated.trim_end())
}

fn ensure_terminal(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.is_empty() {
        return String::new();
    }
    match trimmed.chars().last() {
        Some('.' | '!' | '?' | '…') => trimmed.to_string(),
        _ => format!("{trimmed}."),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Run the full post-processing pass over a raw generated reply.
#[must_use]
pub fn process(
    raw: &str,
    mood: Mood,
    recent_openings: &[String],
    config: &GenerationConfig,
    overrides: Option<&ReplyOverrides>,
) -> ProcessedReply {
    let default_overrides = ReplyOverrides::default();
    let overrides = overrides.unwrap_or(&default_overrides);

    let (text, media) = extract_media(raw);
    let text = strip_banned(&text, &overrides.banned_phrases);
    let text = cap_questions(&text);
    let text = deduplicate_opening(&text, mood, recent_openings);
    let text = bound_length(&text, config.max_reply_chars);
    let text = ensure_terminal(&text);

    let mut actions: Vec<ReplyAction> = media
        .iter()
        .map(|d| ReplyAction::SendMedia(d.kind))
        .collect();
    if text.ends_with('?') {
        actions.push(ReplyAction::AwaitAnswer);
    }
    for action in &overrides.actions {
        if !actions.contains(action) {
            actions.push(action.clone());
        }
    }

    let opening = opening_fragment(&text);
    debug!(
        chars = text.chars().count(),
        directives = media.len(),
        actions = actions.len(),
        "reply post-processed"
    );

    ProcessedReply {
        text,
        media,
        actions,
        opening,
    }
}
