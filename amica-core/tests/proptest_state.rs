//! Property-based tests for the cognitive pipeline's structural invariants.
//!
//! Uses `proptest` to verify the guarantees the rest of the stack leans on:
//! every affect component stays in [0, 1], tone parsing is total, the media
//! gate is monotonic, and reply post-processing is idempotent.

use proptest::prelude::*;

use amica_core::config::{GenerationConfig, MemoryConfig};
use amica_core::media_gate;
use amica_core::memory::{EpisodeEntry, Intensity, MemoryLog};
use amica_core::persona::PersonaProfile;
use amica_core::postprocess;
use amica_core::types::{EmotionVector, Mood, NpcId, RelationshipVector, ToneMode};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_mood() -> impl Strategy<Value = Mood> {
    prop_oneof![
        Just(Mood::Playful),
        Just(Mood::Tender),
        Just(Mood::Hurt),
        Just(Mood::Hot),
        Just(Mood::Warm),
    ]
}

// ---------------------------------------------------------------------------
// Property: Emotion vector components are always clamped to [0, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn emotion_vector_always_clamped(
        valence in -100.0..100.0f32,
        arousal in -100.0..100.0f32,
        dominance in -100.0..100.0f32,
    ) {
        let emotion = EmotionVector::new(valence, arousal, dominance);
        for component in [emotion.valence, emotion.arousal, emotion.dominance] {
            prop_assert!((0.0..=1.0).contains(&component));
        }
    }
}

proptest! {
    #[test]
    fn emotion_shift_stays_clamped(
        dv in -10.0..10.0f32,
        da in -10.0..10.0f32,
        dd in -10.0..10.0f32,
    ) {
        let shifted = EmotionVector::NEUTRAL.shifted(dv, da, dd);
        for component in [shifted.valence, shifted.arousal, shifted.dominance] {
            prop_assert!((0.0..=1.0).contains(&component));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Relationship nudges never leave [0, 1]
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn relationship_nudge_stays_bounded(
        dt in -5.0..5.0f32,
        da in -5.0..5.0f32,
        dj in -5.0..5.0f32,
        dc in -5.0..5.0f32,
        di in -5.0..5.0f32,
    ) {
        let mut rel = RelationshipVector::default();
        rel.nudge(dt, da, dj, dc, di);
        for component in [rel.trust, rel.attachment, rel.jealousy, rel.comfort, rel.importance] {
            prop_assert!((0.0..=1.0).contains(&component));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Tone mode parsing is total — any string yields a valid mode
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn tone_normalize_is_total(input in ".*") {
        let mode = ToneMode::normalize(&input);
        prop_assert!(ToneMode::ALL.contains(&mode));
    }
}

// ---------------------------------------------------------------------------
// Property: The media gate is monotonic in the interaction count
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn media_gate_monotonic(threshold in 0..100u32, count in 0..200u32) {
        if media_gate::allow(count, threshold) {
            prop_assert!(media_gate::allow(count + 1, threshold));
        }
    }
}

// ---------------------------------------------------------------------------
// Property: Reply post-processing is idempotent
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn postprocess_is_idempotent(raw in "[a-zA-Z ?.!]{0,200}", mood in arb_mood()) {
        let config = GenerationConfig::default();
        let first = postprocess::process(&raw, mood, &[], &config, None);
        let second = postprocess::process(&first.text, mood, &[], &config, None);
        prop_assert_eq!(first.text, second.text);
    }
}

proptest! {
    #[test]
    fn postprocess_never_exceeds_bounds(raw in ".{0,2000}", mood in arb_mood()) {
        let config = GenerationConfig::default();
        let reply = postprocess::process(&raw, mood, &[], &config, None);
        prop_assert!(reply.text.chars().count() <= config.max_reply_chars);
        prop_assert!(reply.text.matches('?').count() <= 1);
    }
}

// ---------------------------------------------------------------------------
// Property: Memory caps are enforced no matter how many episodes arrive
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn episode_cap_is_enforced(count in 1..300usize) {
        let config = MemoryConfig::default();
        let mut log = MemoryLog::default();
        for i in 0..count {
            log.push_episode(
                EpisodeEntry::new(format!("Episode {i}"), "conversation", Mood::Tender, Intensity::Low),
                &config,
            );
        }
        prop_assert!(log.episodes.len() <= config.max_episodes);
        // The newest episode always survives.
        let last = log.episodes.last().expect("at least one episode");
        let expected = format!("Episode {}", count - 1);
        prop_assert_eq!(last.summary.as_str(), expected.as_str());
    }
}

// ---------------------------------------------------------------------------
// Property: Profile JSON round-trips losslessly
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn profile_round_trips_through_json(
        interactions in 0..10_000u32,
        trust in 0.0..1.0f32,
    ) {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        profile.interaction_count = interactions;
        profile.relationship.trust = trust;

        let json = serde_json::to_string(&profile).expect("serialize");
        let restored: PersonaProfile = serde_json::from_str(&json).expect("deserialize");
        prop_assert_eq!(restored.interaction_count, interactions);
        prop_assert!((restored.relationship.trust - trust).abs() < f32::EPSILON);
    }
}
