//! Learning updaters — trait micro-evolution, experience/leveling,
//! social-graph weighting, and long-term memory consolidation.
//!
//! Each updater applies small bounded deltas keyed to the turn's dominant
//! goal, so a persona drifts over many turns rather than lurching.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{LearningConfig, MemoryConfig};
use crate::intent::{Intent, IntentReport};
use crate::memory::{EpisodeEntry, Intensity};
use crate::motivation::PrimaryGoal;
use crate::perception::Sentiment;
use crate::persona::PersonaProfile;
use crate::types::{clamp01, Mood, NpcId, UserId};

// ---------------------------------------------------------------------------
// Trait evolution
// ---------------------------------------------------------------------------

/// Nudge custom traits according to the turn's dominant goal.
///
/// Comfort-seeking raises vulnerability and lowers playfulness; aggression
/// raises jealousy and irony; play raises playfulness and lowers irony.
pub fn evolve_traits(profile: &mut PersonaProfile, goal: PrimaryGoal, report: &IntentReport, config: &LearningConfig) {
    let step = config.trait_step;
    match goal {
        PrimaryGoal::SupportSeeking => {
            profile.custom_traits.nudge(0.0, -step, 0.0, step);
        }
        PrimaryGoal::Playfulness | PrimaryGoal::MediaDesire => {
            profile.custom_traits.nudge(0.0, step, -step * 0.5, 0.0);
        }
        PrimaryGoal::GroupStabilization | PrimaryGoal::Observe | PrimaryGoal::Respond(_) => {}
    }
    if report.has(Intent::Aggression) {
        profile.custom_traits.nudge(step, 0.0, step, 0.0);
    }
}

// ---------------------------------------------------------------------------
// Experience
// ---------------------------------------------------------------------------

/// Accumulate weighted XP for the turn and level up when the total crosses
/// `level * 100`. Returns the XP awarded this turn.
pub fn award_xp(
    profile: &mut PersonaProfile,
    goal: PrimaryGoal,
    report: &IntentReport,
    in_group: bool,
    config: &LearningConfig,
) -> f32 {
    let mut awarded = 0.0;
    let xp = &mut profile.experience;

    match goal {
        PrimaryGoal::Playfulness | PrimaryGoal::MediaDesire => {
            xp.intimacy_xp += config.xp_primary;
            awarded += config.xp_primary;
        }
        PrimaryGoal::SupportSeeking => {
            xp.empathy_xp += config.xp_primary;
            awarded += config.xp_primary;
        }
        PrimaryGoal::GroupStabilization => {
            xp.social_xp += config.xp_primary;
            awarded += config.xp_primary;
        }
        PrimaryGoal::Respond(_) | PrimaryGoal::Observe => {
            xp.social_xp += config.xp_secondary;
            awarded += config.xp_secondary;
        }
    }

    if report.has(Intent::Aggression) || report.has(Intent::Frustration) {
        xp.conflict_xp += config.xp_secondary;
        awarded += config.xp_secondary;
    }
    if in_group {
        xp.social_xp += config.xp_secondary;
        awarded += config.xp_secondary;
    }

    while xp.total() >= xp.next_level_threshold() {
        xp.level += 1;
        info!(npc = %profile.npc_id, level = xp.level, "persona leveled up");
    }

    awarded
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

/// Weighted user→NPC edges accumulated from group interaction.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialGraph {
    edges: HashMap<String, f32>,
}

impl SocialGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(user: UserId, npc: NpcId) -> String {
        format!("{user}:{npc}")
    }

    /// Record an interaction edge, weighting by normalized experience.
    pub fn record_interaction(&mut self, user: UserId, npc: NpcId, total_xp: f32) {
        let weight = clamp01(total_xp / 1000.0);
        let entry = self.edges.entry(Self::key(user, npc)).or_insert(0.0);
        *entry = clamp01(entry.max(weight));
    }

    /// Current edge weight between a user and an NPC.
    #[must_use]
    pub fn weight(&self, user: UserId, npc: NpcId) -> f32 {
        self.edges.get(&Self::key(user, npc)).copied().unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Memory consolidation
// ---------------------------------------------------------------------------

/// Grade the emotional charge of a turn for the episodic record.
#[must_use]
pub fn grade_intensity(goal: PrimaryGoal, report: &IntentReport, sentiment: Sentiment) -> Intensity {
    if goal == PrimaryGoal::SupportSeeking
        || report.has(Intent::Aggression)
        || report.tone_triggers.wants_explicit
    {
        Intensity::High
    } else if sentiment != Sentiment::Neutral || report.has(Intent::Intimacy) {
        Intensity::Medium
    } else {
        Intensity::Low
    }
}

/// Short topic label for the episodic record and summary lines.
#[must_use]
pub fn topic_for(goal: PrimaryGoal) -> &'static str {
    match goal {
        PrimaryGoal::MediaDesire => "media",
        PrimaryGoal::SupportSeeking => "support",
        PrimaryGoal::GroupStabilization => "group",
        PrimaryGoal::Playfulness => "intimacy",
        PrimaryGoal::Respond(_) => "conversation",
        PrimaryGoal::Observe => "small talk",
    }
}

/// Record the turn as an episodic entry and consolidate into the long-term
/// summary on the configured cadence.
pub fn consolidate_turn(
    profile: &mut PersonaProfile,
    user_message: &str,
    goal: PrimaryGoal,
    report: &IntentReport,
    sentiment: Sentiment,
    mood: Mood,
    config: &MemoryConfig,
) {
    let intensity = grade_intensity(goal, report, sentiment);
    let topic = topic_for(goal);

    let mut summary = user_message.trim().to_string();
    if summary.len() > 120 {
        let cut = summary
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= 120)
            .last()
            .unwrap_or(0);
        summary.truncate(cut);
    }

    profile
        .memory
        .push_episode(EpisodeEntry::new(summary, topic, mood, intensity), config);

    if profile.memory.episodes_since_consolidation >= config.consolidation_cadence {
        let line = format!("Recently the conversation centred on {topic}; the mood was {mood}.");
        profile.memory.append_summary(&line, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ConversationContext;
    use crate::intent::classify;
    use crate::motivation;
    use crate::perception::analyze_text;

    fn classify_message(message: &str) -> (IntentReport, Sentiment, PrimaryGoal) {
        let ctx = ConversationContext::normalize(
            UserId::new(),
            NpcId::new(),
            None,
            message,
            vec![],
            None,
            "it",
        );
        let perception = analyze_text(&ctx);
        let report = classify(&perception, &ctx, "Luna");
        let goal = motivation::resolve(&report, &perception).primary;
        (report, perception.sentiment, goal)
    }

    #[test]
    fn comfort_seeking_raises_vulnerability() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let before = profile.custom_traits;
        let (report, _, goal) = classify_message("Mi sento davvero a pezzi oggi");
        evolve_traits(&mut profile, goal, &report, &LearningConfig::default());
        assert!(profile.custom_traits.vulnerability > before.vulnerability);
        assert!(profile.custom_traits.playfulness < before.playfulness);
    }

    #[test]
    fn aggression_raises_jealousy_and_irony() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let before = profile.custom_traits;
        let (report, _, goal) = classify_message("sei stupida, ti odio");
        evolve_traits(&mut profile, goal, &report, &LearningConfig::default());
        assert!(profile.custom_traits.jealousy > before.jealousy);
        assert!(profile.custom_traits.irony > before.irony);
    }

    #[test]
    fn traits_stay_bounded_over_many_turns() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let (report, _, goal) = classify_message("Mi sento davvero a pezzi oggi");
        for _ in 0..500 {
            evolve_traits(&mut profile, goal, &report, &LearningConfig::default());
        }
        assert!(profile.custom_traits.vulnerability <= 1.0);
        assert!(profile.custom_traits.playfulness >= 0.0);
    }

    #[test]
    fn level_up_at_threshold() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let (report, _, goal) = classify_message("mi manchi amore");
        let config = LearningConfig {
            xp_primary: 60.0,
            ..Default::default()
        };
        award_xp(&mut profile, goal, &report, false, &config);
        assert_eq!(profile.experience.level, 1);
        award_xp(&mut profile, goal, &report, false, &config);
        assert_eq!(profile.experience.level, 2);
    }

    #[test]
    fn social_graph_records_normalized_weight() {
        let mut graph = SocialGraph::new();
        let user = UserId::new();
        let npc = NpcId::new();
        graph.record_interaction(user, npc, 250.0);
        assert!((graph.weight(user, npc) - 0.25).abs() < 0.001);
        // Weight never decreases and never exceeds 1.0.
        graph.record_interaction(user, npc, 100.0);
        assert!((graph.weight(user, npc) - 0.25).abs() < 0.001);
        graph.record_interaction(user, npc, 5000.0);
        assert!((graph.weight(user, npc) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn distress_turn_records_high_intensity_episode() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let (report, sentiment, goal) = classify_message("Mi sento davvero a pezzi oggi");
        consolidate_turn(
            &mut profile,
            "Mi sento davvero a pezzi oggi",
            goal,
            &report,
            sentiment,
            Mood::Tender,
            &MemoryConfig::default(),
        );
        let episode = profile.memory.episodes.last().expect("episode expected");
        assert_eq!(episode.intensity, Intensity::High);
        assert_eq!(episode.topic, "support");
    }

    #[test]
    fn summary_appended_on_cadence() {
        let mut profile = PersonaProfile::seed(NpcId::new(), "Luna");
        let config = MemoryConfig {
            consolidation_cadence: 3,
            ..Default::default()
        };
        let (report, sentiment, goal) = classify_message("ciao come stai?");
        for _ in 0..3 {
            consolidate_turn(
                &mut profile,
                "ciao come stai?",
                goal,
                &report,
                sentiment,
                Mood::Tender,
                &config,
            );
        }
        assert!(!profile.memory.long_term_summary.is_empty());
        assert_eq!(profile.memory.episodes_since_consolidation, 0);
    }
}
