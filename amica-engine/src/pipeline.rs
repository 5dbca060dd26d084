//! The turn pipeline — one inbound message in, one persona reply out.
//!
//! Stage order is fixed: normalize, perceive, classify, resolve, update
//! state, gate media, generate, post-process, learn, persist. Turns for
//! the same (user, NPC) pair are serialized behind a keyed async lock so
//! two concurrent messages can never interleave profile writes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use amica_core::cache::TtlCache;
use amica_core::config::AmicaConfig;
use amica_core::context::{ConversationContext, HistoryTurn, MediaDescriptor, MediaKind};
use amica_core::group::{self, GroupMember, ResponderSelection};
use amica_core::intent::{self, IntentReport};
use amica_core::learning::{self, SocialGraph};
use amica_core::media_gate::{self, GateOutcome};
use amica_core::memory::{MediaLogEntry, WorkingMemory};
use amica_core::mood;
use amica_core::motivation::{self, Motivation, PrimaryGoal};
use amica_core::perception::{self, MediaAnalysis};
use amica_core::persona::PersonaProfile;
use amica_core::postprocess::{self, MediaDirective, ProcessedReply, ReplyAction, ReplyOverrides};
use amica_core::store::PersonaStore;
use amica_core::types::{GroupId, Mood, NpcId, UserId};
use amica_llm::prompt::sanitize_glitch_tokens;
use amica_llm::types::{is_sentinel, GenerationRequest, PolicyMode};

use crate::error::{EngineError, Result};
use crate::gateway::Generator;
use crate::media::{self, MediaGenerator, MediaOutcome};
use crate::prompt;

/// Canned reply when every generation attempt failed.
const FALLBACK_REPLY: &str =
    "Scusami, oggi ho la testa tra le nuvole... me lo ridici tra un attimo?";

/// Line asking for a reference photo before a couple photo.
const NEEDS_PHOTO_REPLY: &str =
    "Mi piacerebbe tanto! Ma prima mandami una tua foto, cosi viene davvero di noi due.";

// ---------------------------------------------------------------------------
// Request / result types
// ---------------------------------------------------------------------------

/// One inbound message for the pipeline.
#[derive(Debug, Clone)]
pub struct TurnRequest {
    /// The human user.
    pub user_id: UserId,
    /// The persona that should reply.
    pub npc_id: NpcId,
    /// Display name used when seeding a fresh profile.
    pub npc_name: String,
    /// Group room, for multi-party turns.
    pub group_id: Option<GroupId>,
    /// The raw message text.
    pub message: String,
    /// Recent history window (oldest first), excluding this message.
    pub history: Vec<HistoryTurn>,
    /// Media attached to the message, if any.
    pub media: Option<MediaDescriptor>,
    /// Reply language tag.
    pub language: String,
    /// Caller post-processing adjustments.
    pub overrides: Option<ReplyOverrides>,
}

impl TurnRequest {
    /// Build a plain one-to-one turn with defaults for the rest.
    #[must_use]
    pub fn direct(
        user_id: UserId,
        npc_id: NpcId,
        npc_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            npc_id,
            npc_name: npc_name.into(),
            group_id: None,
            message: message.into(),
            history: Vec::new(),
            media: None,
            language: "it".to_string(),
            overrides: None,
        }
    }
}

/// The pipeline's answer for one turn.
#[derive(Debug, Clone)]
pub struct TurnResult {
    /// Persona that replied.
    pub npc_id: NpcId,
    /// Final reply text.
    pub text: String,
    /// Side-effects for the caller.
    pub actions: Vec<ReplyAction>,
    /// Media to attach.
    pub media: Vec<MediaDirective>,
    /// Mood after the turn.
    pub mood: Mood,
    /// Dominant goal that drove the reply.
    pub goal: PrimaryGoal,
    /// Relationship summary after the turn.
    pub relationship_summary: String,
    /// Experience awarded by this turn.
    pub xp_awarded: f32,
    /// Whether a media request was deferred by the readiness gate.
    pub gate_deferred: bool,
}

/// Intermediate reply before post-processing.
struct ReplyDraft {
    text: String,
    media: Option<(MediaDirective, MediaDescriptor)>,
    gate_deferred: bool,
    needs_user_photo: bool,
}

impl ReplyDraft {
    fn chat(text: String) -> Self {
        Self {
            text,
            media: None,
            gate_deferred: false,
            needs_user_photo: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The turn pipeline. One instance serves every persona.
pub struct TurnPipeline {
    store: Arc<dyn PersonaStore>,
    generator: Arc<dyn Generator>,
    media: Option<Arc<dyn MediaGenerator>>,
    config: AmicaConfig,
    locks: DashMap<(UserId, NpcId), Arc<tokio::sync::Mutex<()>>>,
    social: parking_lot::Mutex<SocialGraph>,
    group_context: TtlCache<GroupId, Vec<HistoryTurn>>,
    // Media-gate counters for group rooms: familiarity earned in private
    // chats does not open the gate in front of an audience.
    group_interactions: DashMap<(GroupId, NpcId), u32>,
}

impl TurnPipeline {
    /// Create a pipeline over a store and a generator.
    #[must_use]
    pub fn new(
        store: Arc<dyn PersonaStore>,
        generator: Arc<dyn Generator>,
        config: AmicaConfig,
    ) -> Self {
        let context_ttl = Duration::from_secs(config.group.context_ttl_seconds);
        Self {
            store,
            generator,
            media: None,
            config,
            locks: DashMap::new(),
            social: parking_lot::Mutex::new(SocialGraph::new()),
            group_context: TtlCache::new(context_ttl),
            group_interactions: DashMap::new(),
        }
    }

    /// Attach a media generation backend.
    #[must_use]
    pub fn with_media(mut self, media: Arc<dyn MediaGenerator>) -> Self {
        self.media = Some(media);
        self
    }

    /// Snapshot of the user→NPC social edge weight.
    #[must_use]
    pub fn social_weight(&self, user: UserId, npc: NpcId) -> f32 {
        self.social.lock().weight(user, npc)
    }

    fn pair_lock(&self, user: UserId, npc: NpcId) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .entry((user, npc))
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .value()
            .clone()
    }

    /// Run one full turn.
    ///
    /// # Errors
    /// Returns an error only when the profile cannot be loaded. Generation
    /// and media problems degrade into persona-voiced replies, and a failed
    /// save is logged without discarding the in-memory turn result.
    pub async fn run(&self, request: TurnRequest) -> Result<TurnResult> {
        let lock = self.pair_lock(request.user_id, request.npc_id);
        let _guard = lock.lock().await;

        let mut profile = self
            .store
            .load_or_seed(request.npc_id, &request.npc_name)?;

        // A group turn with no explicit history runs over the room's
        // cached rolling transcript.
        let history = match request.group_id {
            Some(group) if request.history.is_empty() => {
                self.group_context.get(&group).unwrap_or_default()
            }
            _ => request.history,
        };

        let ctx = ConversationContext::normalize(
            request.user_id,
            request.npc_id,
            request.group_id,
            &request.message,
            history,
            request.media,
            &request.language,
        );

        // Perceive and classify.
        let perceived = perception::analyze_text(&ctx);
        let media_analysis = perception::analyze_media(&ctx);
        let report = {
            let name = profile.identity.name.clone();
            intent::classify(&perceived, &ctx, &name)
        };
        let motivation = motivation::resolve(&report, &perceived);
        debug!(
            npc = %profile.npc_id,
            goal = %motivation.abstract_goal,
            intents = report.intents.len(),
            "turn classified"
        );

        // Update mood and relationship before the prompt reads them.
        let mood = mood::update_persona_state(&mut profile, &perceived, &report, &self.config.relationship);

        // Generate the reply along the goal-specific path.
        let draft = self
            .produce_reply(&profile, &ctx, &report, &motivation, media_analysis.as_ref())
            .await;
        let ReplyDraft {
            text: raw_text,
            media: media_result,
            gate_deferred,
            needs_user_photo,
        } = draft;

        let mut reply = postprocess::process(
            &raw_text,
            mood,
            &profile.memory.last_openings,
            &self.config.generation,
            request.overrides.as_ref(),
        );
        if reply.text.is_empty() {
            reply.text = FALLBACK_REPLY.to_string();
            reply.opening = postprocess::opening_fragment(FALLBACK_REPLY);
        }
        if needs_user_photo {
            let kind = report.media.as_ref().map_or(MediaKind::CouplePhoto, |m| m.kind);
            reply.actions.push(ReplyAction::RequestUserPhoto(kind));
        }
        if let Some((directive, descriptor)) = media_result {
            reply.actions.push(ReplyAction::SendMedia(descriptor.kind));
            reply.media.push(directive.clone());
            profile.memory.push_media(
                MediaLogEntry {
                    kind: descriptor.kind,
                    caption: directive.caption,
                    timestamp: chrono::Utc::now(),
                },
                &self.config.memory,
            );
        }

        // Learning updates.
        let xp_awarded = self.learn(&mut profile, &ctx, &report, &motivation, &perceived, mood, &reply);

        // Best-effort write: the turn result stands even when the save fails.
        if let Err(e) = self.store.save(&profile) {
            warn!(npc = %profile.npc_id, error = %e, "profile save failed");
        }

        if let Some(group) = ctx.group_id {
            *self
                .group_interactions
                .entry((group, profile.npc_id))
                .or_insert(0) += 1;
            let cap = self.config.memory.short_term_window * 2;
            let (user_text, npc_text) = (ctx.text.clone(), reply.text.clone());
            self.group_context
                .update_at(group, Instant::now(), Vec::new(), |turns| {
                    turns.push(HistoryTurn::user(user_text));
                    turns.push(HistoryTurn::npc(npc_text));
                    let overflow = turns.len().saturating_sub(cap);
                    if overflow > 0 {
                        turns.drain(0..overflow);
                    }
                });
        }

        Ok(TurnResult {
            npc_id: profile.npc_id,
            text: reply.text,
            actions: reply.actions,
            media: reply.media,
            mood,
            goal: motivation.primary,
            relationship_summary: profile.relationship.summary(),
            xp_awarded,
            gate_deferred,
        })
    }

    /// Run one group turn: pick the responders, then run the normal
    /// pipeline once per selected persona, in selection order.
    ///
    /// # Errors
    /// Returns [`EngineError::EmptyGroup`] when the roster is empty, plus
    /// anything [`run`](Self::run) can return.
    pub async fn run_group(
        &self,
        group_id: GroupId,
        members: &[GroupMember],
        request: TurnRequest,
    ) -> Result<Vec<TurnResult>> {
        let selection = group::select_responders(
            group_id,
            &request.message,
            members,
            self.config.group.max_responders,
        );
        let responders = selection.responders();
        if responders.is_empty() {
            return Err(EngineError::EmptyGroup);
        }
        info!(
            group = %group_id,
            responders = responders.len(),
            direct = matches!(selection, ResponderSelection::DirectInvocation(_)),
            "group responders selected"
        );

        let mut results = Vec::with_capacity(responders.len());
        for responder in responders {
            let name = members
                .iter()
                .find(|m| m.npc_id == responder)
                .map(|m| m.name.clone())
                .unwrap_or_default();
            let mut turn = request.clone();
            turn.npc_id = responder;
            turn.npc_name = name;
            turn.group_id = Some(group_id);
            results.push(self.run(turn).await?);
        }
        Ok(results)
    }

    // ------------------------------------------------------------------
    // Reply production
    // ------------------------------------------------------------------

    async fn produce_reply(
        &self,
        profile: &PersonaProfile,
        ctx: &ConversationContext,
        report: &IntentReport,
        motivation: &Motivation,
        media_analysis: Option<&MediaAnalysis>,
    ) -> ReplyDraft {
        if motivation.primary != PrimaryGoal::MediaDesire {
            let text = self
                .generate_chat(profile, ctx, motivation, media_analysis)
                .await;
            return ReplyDraft::chat(text);
        }

        let kind = report
            .media
            .as_ref()
            .map_or(MediaKind::Photo, |m| m.kind);
        // Group turns gate on the room's own counter, not the private one.
        let gate_count = match ctx.group_id {
            Some(group) => self
                .group_interactions
                .get(&(group, profile.npc_id))
                .map_or(0, |c| *c),
            None => profile.interaction_count,
        };
        let gate = media_gate::check(
            gate_count,
            kind,
            &self.config.media_gate,
            &mut rand::thread_rng(),
        );

        match gate {
            GateOutcome::Deferred {
                remaining,
                reluctant_line,
            } => {
                debug!(npc = %profile.npc_id, remaining, "media request deferred");
                ReplyDraft {
                    gate_deferred: true,
                    ..ReplyDraft::chat(reluctant_line)
                }
            }
            GateOutcome::Ready => {
                let Some(media_intent) = report.media.clone() else {
                    let text = self
                        .generate_chat(profile, ctx, motivation, media_analysis)
                        .await;
                    return ReplyDraft::chat(text);
                };
                let outcome = media::fulfil(
                    self.media.as_deref(),
                    self.generator.as_ref(),
                    &media_intent,
                    profile,
                )
                .await;
                match outcome {
                    MediaOutcome::Produced { descriptor, caption } => {
                        let text = self
                            .generate_chat(profile, ctx, motivation, media_analysis)
                            .await;
                        let directive = MediaDirective {
                            kind: descriptor.kind,
                            caption,
                        };
                        ReplyDraft {
                            media: Some((directive, descriptor)),
                            ..ReplyDraft::chat(text)
                        }
                    }
                    MediaOutcome::NeedsUserPhoto => ReplyDraft {
                        needs_user_photo: true,
                        ..ReplyDraft::chat(NEEDS_PHOTO_REPLY.to_string())
                    },
                    MediaOutcome::Degraded { apology } => ReplyDraft::chat(apology),
                }
            }
        }
    }

    /// Generate chat text with the retry ladder: first attempt, one retry
    /// on the standard pool, then the canned fallback.
    async fn generate_chat(
        &self,
        profile: &PersonaProfile,
        ctx: &ConversationContext,
        motivation: &Motivation,
        media_analysis: Option<&MediaAnalysis>,
    ) -> String {
        let request = {
            let memory = WorkingMemory::assemble(&profile.memory, &ctx.history, &self.config.memory);
            prompt::build_request(
                profile,
                &memory,
                motivation,
                media_analysis,
                &ctx.text,
                &ctx.language,
                &self.config,
            )
        };

        let first = self.generator.generate(&request).await;
        if let Some(text) = Self::usable(&first) {
            return text;
        }

        warn!(npc = %profile.npc_id, "generation failed, retrying on standard pool");
        let retry = GenerationRequest {
            policy: PolicyMode::Standard,
            ..request
        };
        let second = self.generator.generate(&retry).await;
        if let Some(text) = Self::usable(&second) {
            return text;
        }

        warn!(npc = %profile.npc_id, "all generation attempts failed, using fallback reply");
        FALLBACK_REPLY.to_string()
    }

    fn usable(raw: &str) -> Option<String> {
        if is_sentinel(raw) {
            return None;
        }
        let cleaned = sanitize_glitch_tokens(raw);
        if cleaned.trim().is_empty() {
            None
        } else {
            Some(cleaned)
        }
    }

    // ------------------------------------------------------------------
    // Learning
    // ------------------------------------------------------------------

    #[allow(clippy::too_many_arguments)]
    fn learn(
        &self,
        profile: &mut PersonaProfile,
        ctx: &ConversationContext,
        report: &IntentReport,
        motivation: &Motivation,
        perceived: &perception::Perception,
        mood: Mood,
        reply: &ProcessedReply,
    ) -> f32 {
        learning::evolve_traits(profile, motivation.primary, report, &self.config.learning);
        let awarded = learning::award_xp(
            profile,
            motivation.primary,
            report,
            ctx.is_group(),
            &self.config.learning,
        );
        debug!(npc = %profile.npc_id, awarded, level = profile.experience.level, "xp awarded");
        learning::consolidate_turn(
            profile,
            &ctx.text,
            motivation.primary,
            report,
            perceived.sentiment,
            mood,
            &self.config.memory,
        );
        if !reply.opening.is_empty() {
            profile.memory.push_opening(reply.opening.clone(), &self.config.memory);
        }
        profile.touch();
        // Social edges are a group concern; private chats stay off the graph.
        if ctx.is_group() {
            self.social.lock().record_interaction(
                ctx.user_id,
                profile.npc_id,
                profile.experience.total(),
            );
        }
        awarded
    }
}
