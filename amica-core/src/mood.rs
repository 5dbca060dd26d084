//! Persona state updater — mood computation, tone-mode transitions, and
//! relationship vector drift.
//!
//! Mood derives from valence thresholds with one override path: a
//! confidently detected explicit-sexual intent forces the elevated "hot"
//! state, unless the family guard (which always wins) or the absence of a
//! supporting intimate/explicit intent demotes it back to "warm".

use tracing::debug;

use crate::config::RelationshipConfig;
use crate::intent::{Intent, IntentReport, ToneTriggers};
use crate::perception::{Perception, Sentiment};
use crate::persona::PersonaProfile;
use crate::types::{EmotionVector, Mood, ToneMode};

/// Per-turn emotion drift applied before the mood is read.
fn drift_emotion(emotion: EmotionVector, sentiment: Sentiment) -> EmotionVector {
    match sentiment {
        Sentiment::Positive => emotion.shifted(0.08, 0.04, 0.02),
        Sentiment::Negative => emotion.shifted(-0.12, 0.06, -0.04),
        Sentiment::Neutral => emotion.shifted(0.0, -0.02, 0.0),
    }
}

/// Whether the classifier confidently detected an explicit-sexual intent.
fn explicit_detected(report: &IntentReport) -> bool {
    report.tone_triggers.wants_explicit || report.has(Intent::SpicyRequest)
}

/// Advance the stored tone preference from this turn's trigger phrases.
///
/// The family guard freezes the machine. A soft request wins over any
/// simultaneous escalation; an explicit request never downgrades an already
/// extreme preference; a romantic request never downgrades an explicit one.
fn shift_tone(current: ToneMode, triggers: &ToneTriggers, family_guard: bool) -> ToneMode {
    if family_guard {
        return current;
    }
    if triggers.wants_soft {
        return ToneMode::Soft;
    }
    if triggers.wants_explicit {
        return if current == ToneMode::Extreme {
            current
        } else {
            ToneMode::Explicit
        };
    }
    if triggers.wants_romantic && !current.is_explicit() {
        return ToneMode::Romantic;
    }
    current
}

/// Compute the mood label for the updated emotion vector.
fn mood_from_valence(emotion: &EmotionVector, config: &RelationshipConfig) -> Mood {
    if emotion.valence >= config.high_valence {
        Mood::Playful
    } else if emotion.valence <= config.low_valence {
        Mood::Hurt
    } else {
        Mood::Tender
    }
}

/// Update mood, emotion vector, and relationship vector for one turn.
///
/// Mutates the profile in place and returns the new mood. Every numeric
/// component is clamped to [0, 1] by construction.
pub fn update_persona_state(
    profile: &mut PersonaProfile,
    perception: &Perception,
    report: &IntentReport,
    config: &RelationshipConfig,
) -> Mood {
    let drifted = drift_emotion(profile.state.emotion, perception.sentiment);

    let mood = if explicit_detected(report) {
        let supported = report.has(Intent::SpicyRequest) || report.has(Intent::Intimacy);
        if profile.family_guard || !supported {
            // Guard wins over detection; unsupported triggers also demote.
            profile.state.emotion = drifted;
            Mood::Warm
        } else {
            // Forced elevated arousal/dominance state.
            profile.state.emotion = EmotionVector::new(drifted.valence.max(0.6), 0.9, 0.7);
            Mood::Hot
        }
    } else {
        profile.state.emotion = drifted;
        mood_from_valence(&profile.state.emotion, config)
    };

    profile.state.mood = mood;
    profile.preferences.tone_mode = shift_tone(
        profile.preferences.tone_mode,
        &report.tone_triggers,
        profile.family_guard,
    );
    update_relationship(profile, perception.sentiment, config);

    debug!(
        npc = %profile.npc_id,
        mood = %mood,
        tone = %profile.preferences.tone_mode,
        valence = profile.state.emotion.valence,
        "persona state updated"
    );
    mood
}

/// Apply the per-turn relationship drift.
///
/// Trust, attachment, and comfort trend upward with every interaction;
/// jealousy trends with the emotional polarity of the turn; importance
/// creeps upward slowly.
fn update_relationship(
    profile: &mut PersonaProfile,
    sentiment: Sentiment,
    config: &RelationshipConfig,
) {
    let jealousy_delta = match sentiment {
        Sentiment::Negative => config.jealousy_step,
        Sentiment::Positive => -config.jealousy_step * 0.5,
        Sentiment::Neutral => 0.0,
    };
    profile.relationship.nudge(
        config.trust_step,
        config.attachment_step,
        jealousy_delta,
        config.comfort_step,
        0.005,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConversationContext;
    use crate::intent::classify;
    use crate::perception::analyze_text;
    use crate::types::{NpcId, UserId};

    fn run_turn(profile: &mut PersonaProfile, message: &str) -> Mood {
        let ctx = ConversationContext::normalize(
            UserId::new(),
            profile.npc_id,
            None,
            message,
            vec![],
            None,
            "it",
        );
        let perception = analyze_text(&ctx);
        let name = profile.identity.name.clone();
        let report = classify(&perception, &ctx, &name);
        update_persona_state(profile, &perception, &report, &RelationshipConfig::default())
    }

    #[test]
    fn distress_moves_mood_toward_hurt() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let mut mood = Mood::Tender;
        for _ in 0..4 {
            mood = run_turn(&mut profile, "Mi sento davvero a pezzi oggi");
        }
        assert!(matches!(mood, Mood::Hurt | Mood::Tender));
        assert!(profile.state.emotion.valence < 0.5);
    }

    #[test]
    fn sustained_positivity_reaches_playful() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let mut mood = Mood::Tender;
        for _ in 0..5 {
            mood = run_turn(&mut profile, "Ti amo, sono cosi felice con te");
        }
        assert_eq!(mood, Mood::Playful);
    }

    #[test]
    fn explicit_request_forces_hot() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let mood = run_turn(&mut profile, "dai, parlami sporco");
        assert_eq!(mood, Mood::Hot);
        assert!(profile.state.emotion.arousal >= 0.9 - f32::EPSILON);
    }

    #[test]
    fn family_guard_demotes_hot_to_warm() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.family_guard = true;
        let mood = run_turn(&mut profile, "dai, parlami sporco");
        assert_eq!(mood, Mood::Warm);
    }

    #[test]
    fn explicit_trigger_escalates_tone_mode() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Soft);
        run_turn(&mut profile, "dai, parlami sporco, ti desidero");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Explicit);
    }

    #[test]
    fn family_guard_freezes_tone_mode() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.family_guard = true;
        run_turn(&mut profile, "dai, parlami sporco");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Soft);
    }

    #[test]
    fn soft_trigger_deescalates_explicit_tone() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.preferences.tone_mode = ToneMode::Explicit;
        run_turn(&mut profile, "ok, meno spinto per favore");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Soft);
    }

    #[test]
    fn romantic_trigger_does_not_downgrade_explicit() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.preferences.tone_mode = ToneMode::Explicit;
        run_turn(&mut profile, "sii più romantica con me");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Explicit);

        let mut fresh = PersonaProfile::seed(NpcId::new(), "Luna");
        run_turn(&mut fresh, "sii più romantica con me");
        assert_eq!(fresh.preferences.tone_mode, ToneMode::Romantic);
    }

    #[test]
    fn extreme_tone_is_sticky_under_explicit_triggers() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.preferences.tone_mode = ToneMode::Extreme;
        run_turn(&mut profile, "parlami sporco");
        assert_eq!(profile.preferences.tone_mode, ToneMode::Extreme);
    }

    #[test]
    fn relationship_components_stay_bounded() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        for _ in 0..500 {
            run_turn(&mut profile, "sei stupida, ti odio");
        }
        let rel = profile.relationship;
        for component in [rel.trust, rel.attachment, rel.jealousy, rel.comfort, rel.importance] {
            assert!((0.0..=1.0).contains(&component));
        }
    }

    #[test]
    fn trust_trends_upward() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let before = profile.relationship.trust;
        run_turn(&mut profile, "ciao, come va?");
        assert!(profile.relationship.trust > before);
    }
}
