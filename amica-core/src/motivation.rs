//! Motivation resolution — collapsing the intent report into one dominant
//! conversational goal.
//!
//! The priority order is fixed: media desire and distress pre-empt every
//! other goal because they carry the highest behavioral and safety weight.

use serde::{Deserialize, Serialize};

use crate::intent::{EmotionalNeed, Intent, IntentReport};
use crate::perception::{Perception, Sentiment, ToneHint};

/// The single dominant goal driving prompt construction for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryGoal {
    /// The user wants media (or the persona wants to offer it).
    MediaDesire,
    /// The user needs comfort or is venting.
    SupportSeeking,
    /// Keep the group conversation flowing after a direct address.
    GroupStabilization,
    /// Lean into intimacy or play.
    Playfulness,
    /// Respond to the first raw detected intent.
    Respond(Intent),
    /// Nothing detected — observe and keep the conversation alive.
    Observe,
}

/// The resolved motivation for a turn.
#[derive(Debug, Clone)]
pub struct Motivation {
    /// Dominant goal.
    pub primary: PrimaryGoal,
    /// Remaining detected intents, in detection order.
    pub secondary: Vec<Intent>,
    /// Human-readable goal phrase for the prompt.
    pub abstract_goal: String,
}

/// Collapse the intent report into one dominant goal.
#[must_use]
pub fn resolve(report: &IntentReport, perception: &Perception) -> Motivation {
    let primary = if report.media.is_some() || report.has(Intent::MediaRequest) {
        PrimaryGoal::MediaDesire
    } else if perception.sentiment == Sentiment::Negative
        || report.emotional == EmotionalNeed::SeekComfort
    {
        PrimaryGoal::SupportSeeking
    } else if report.has(Intent::GroupAddress) {
        PrimaryGoal::GroupStabilization
    } else if report.has(Intent::Intimacy)
        || report.has(Intent::SpicyRequest)
        || perception.tone == Some(ToneHint::Playful)
    {
        PrimaryGoal::Playfulness
    } else if let Some(first) = report.intents.first() {
        PrimaryGoal::Respond(*first)
    } else {
        PrimaryGoal::Observe
    };

    let secondary: Vec<Intent> = report
        .intents
        .iter()
        .copied()
        .filter(|i| !goal_consumes(primary, *i))
        .collect();

    Motivation {
        abstract_goal: describe(primary),
        primary,
        secondary,
    }
}

/// Whether the primary goal already accounts for an intent.
fn goal_consumes(goal: PrimaryGoal, intent: Intent) -> bool {
    match goal {
        PrimaryGoal::MediaDesire => intent == Intent::MediaRequest,
        PrimaryGoal::SupportSeeking => intent == Intent::EmotionalVenting,
        PrimaryGoal::GroupStabilization => intent == Intent::GroupAddress,
        PrimaryGoal::Playfulness => {
            matches!(intent, Intent::Intimacy | Intent::SpicyRequest)
        }
        PrimaryGoal::Respond(first) => intent == first,
        PrimaryGoal::Observe => false,
    }
}

/// Goal phrase embedded in the prompt's intent summary.
#[must_use]
pub fn describe(goal: PrimaryGoal) -> String {
    match goal {
        PrimaryGoal::MediaDesire => "share a moment the user asked to see or hear".to_string(),
        PrimaryGoal::SupportSeeking => "comfort the user and make them feel heard".to_string(),
        PrimaryGoal::GroupStabilization => {
            "answer the direct address and keep the group at ease".to_string()
        }
        PrimaryGoal::Playfulness => "lean into the affection and keep it playful".to_string(),
        PrimaryGoal::Respond(intent) => format!("respond naturally to {intent:?}"),
        PrimaryGoal::Observe => "observe and keep the conversation alive".to_string(),
    }
}
