//! Media readiness gate — interaction-count threshold before a persona
//! agrees to share photos, videos, or voice notes.
//!
//! The gate is a pure predicate over the per-pair interaction count, so a
//! pair that has crossed the threshold stays open forever. Deferrals below
//! the threshold come with a reluctant line sampled from a small pool.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::debug;

use crate::config::MediaGateConfig;
use crate::context::MediaKind;

/// Outcome of the readiness check for one media request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateOutcome {
    /// The pair is past the threshold; media flows.
    Ready,
    /// Not enough shared history yet; respond with the reluctant line.
    Deferred {
        /// Interactions still missing before the gate opens.
        remaining: u32,
        /// Tone-appropriate reluctant deferral text.
        reluctant_line: String,
    },
}

impl GateOutcome {
    /// Whether media may be produced.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Deferral utterances sampled when the gate is still closed.
pub const RELUCTANT_LINES: &[&str] = &[
    "Mmh, non ancora... conosciamoci un po' meglio prima, ok?",
    "Piano piano! Prima voglio sapere qualcosa in piu di te.",
    "Non cosi in fretta... parliamo ancora un po', poi si vedra.",
    "Mi piacerebbe, ma dammi ancora un po' di tempo.",
];

/// Pure threshold predicate. Monotonic in `interaction_count`.
#[must_use]
pub fn allow(interaction_count: u32, threshold: u32) -> bool {
    interaction_count >= threshold
}

/// Check the gate for a media request, sampling a reluctant line when the
/// pair has not yet crossed the threshold.
pub fn check<R: Rng + ?Sized>(
    interaction_count: u32,
    kind: MediaKind,
    config: &MediaGateConfig,
    rng: &mut R,
) -> GateOutcome {
    if allow(interaction_count, config.interaction_threshold) {
        debug!(count = interaction_count, kind = kind.as_str(), "media gate open");
        return GateOutcome::Ready;
    }

    let remaining = config.interaction_threshold - interaction_count;
    let line = RELUCTANT_LINES
        .choose(rng)
        .copied()
        .unwrap_or(RELUCTANT_LINES[0]);
    debug!(
        count = interaction_count,
        remaining,
        kind = kind.as_str(),
        "media gate deferred"
    );
    GateOutcome::Deferred {
        remaining,
        reluctant_line: line.to_string(),
    }
}
