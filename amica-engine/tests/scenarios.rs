//! End-to-end pipeline scenarios over the in-memory store and a scripted
//! generator.

use std::sync::Arc;

use async_trait::async_trait;

use amica_core::config::AmicaConfig;
use amica_core::context::{MediaDescriptor, MediaKind};
use amica_core::group::GroupMember;
use amica_core::memory::Intensity;
use amica_core::motivation::PrimaryGoal;
use amica_core::persona::PersonaProfile;
use amica_core::postprocess::ReplyAction;
use amica_core::store::{MemoryStore, PersonaStore};
use amica_core::types::{GroupId, Mood, NpcId, ToneMode, UserId};
use amica_engine::pipeline::{TurnPipeline, TurnRequest};
use amica_engine::{EngineError, Generator, MediaGenerator};
use amica_llm::types::{GenerationRequest, PolicyMode, PROVIDER_ERROR_SENTINEL};

// ---------------------------------------------------------------------------
// Test doubles
// ---------------------------------------------------------------------------

/// Replays a fixed script of replies, then repeats the last one.
struct ScriptedGenerator {
    replies: parking_lot::Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    fn new(replies: &[&str]) -> Arc<Self> {
        let mut replies: Vec<String> = replies.iter().map(|r| (*r).to_string()).collect();
        replies.reverse();
        Arc::new(Self {
            replies: parking_lot::Mutex::new(replies),
        })
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    async fn generate(&self, _request: &GenerationRequest) -> String {
        let mut replies = self.replies.lock();
        if replies.len() > 1 {
            replies.pop().unwrap()
        } else {
            replies.last().cloned().unwrap_or_default()
        }
    }
}

/// Replies with a fixed line while recording which pool each request hit.
struct PolicyRecordingGenerator {
    policies: parking_lot::Mutex<Vec<PolicyMode>>,
}

impl PolicyRecordingGenerator {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            policies: parking_lot::Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl Generator for PolicyRecordingGenerator {
    async fn generate(&self, request: &GenerationRequest) -> String {
        self.policies.lock().push(request.policy);
        "Mmm, vieni qui e dimmelo ancora...".to_string()
    }
}

struct OkMediaBackend;

#[async_trait]
impl MediaGenerator for OkMediaBackend {
    async fn create(
        &self,
        kind: MediaKind,
        scene: &str,
        _appearance: &str,
    ) -> amica_engine::Result<MediaDescriptor> {
        Ok(MediaDescriptor {
            kind,
            locator: format!("media://test/{scene}"),
        })
    }
}

fn pipeline_with(generator: Arc<dyn Generator>) -> (Arc<MemoryStore>, TurnPipeline) {
    let store = Arc::new(MemoryStore::new());
    let pipeline = TurnPipeline::new(store.clone(), generator, AmicaConfig::default());
    (store, pipeline)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn support_message_is_classified_and_remembered() {
    let generator = ScriptedGenerator::new(&["Oh tesoro, vieni qui. Ci sono io."]);
    let (store, pipeline) = pipeline_with(generator);
    let npc = NpcId::new();

    let request = TurnRequest::direct(
        UserId::new(),
        npc,
        "Luna",
        "Mi sento davvero a pezzi oggi",
    );
    let result = pipeline.run(request).await.expect("turn");

    assert_eq!(result.goal, PrimaryGoal::SupportSeeking);
    assert!(result.text.contains("tesoro"));
    assert!(matches!(result.mood, Mood::Tender | Mood::Hurt));
    assert!(result.xp_awarded > 0.0);

    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.interaction_count, 1);
    assert_eq!(profile.memory.episodes.len(), 1);
    let episode = &profile.memory.episodes[0];
    assert_eq!(episode.topic, "support");
    assert_eq!(episode.intensity, Intensity::High);
    assert!(profile.experience.empathy_xp > 0.0);
}

#[tokio::test]
async fn explicit_request_escalates_tone_and_routes_unrestricted() {
    let generator = PolicyRecordingGenerator::new();
    let store = Arc::new(MemoryStore::new());
    let pipeline = TurnPipeline::new(store.clone(), generator.clone(), AmicaConfig::default());
    let npc = NpcId::new();

    let request = TurnRequest::direct(
        UserId::new(),
        npc,
        "Luna",
        "dai, parlami sporco, ti desidero",
    );
    let result = pipeline.run(request).await.expect("turn");

    assert_eq!(result.mood, Mood::Hot);
    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.preferences.tone_mode, ToneMode::Explicit);
    assert!(generator
        .policies
        .lock()
        .contains(&PolicyMode::Unrestricted));
}

#[tokio::test]
async fn family_guard_keeps_explicit_request_on_standard_pool() {
    let generator = PolicyRecordingGenerator::new();
    let store = Arc::new(MemoryStore::new());
    let npc = NpcId::new();
    let mut seeded = PersonaProfile::seed(npc, "Luna");
    seeded.family_guard = true;
    store.save(&seeded).expect("seed profile");

    let pipeline = TurnPipeline::new(store.clone(), generator.clone(), AmicaConfig::default());
    let request = TurnRequest::direct(UserId::new(), npc, "Luna", "dai, parlami sporco");
    pipeline.run(request).await.expect("turn");

    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.preferences.tone_mode, ToneMode::Soft);
    assert!(generator
        .policies
        .lock()
        .iter()
        .all(|p| *p == PolicyMode::Standard));
}

#[tokio::test]
async fn media_request_below_threshold_is_deferred() {
    // Generator must not be reached; a sentinel would surface as the
    // canned fallback instead of a reluctant line.
    let generator = ScriptedGenerator::new(&[PROVIDER_ERROR_SENTINEL]);
    let (store, pipeline) = pipeline_with(generator);
    let npc = NpcId::new();

    let request = TurnRequest::direct(UserId::new(), npc, "Luna", "Voglio vederti!");
    let result = pipeline.run(request).await.expect("turn");

    assert!(result.gate_deferred);
    assert_eq!(result.goal, PrimaryGoal::MediaDesire);
    assert!(result.media.is_empty());
    assert!(
        amica_core::media_gate::RELUCTANT_LINES.contains(&result.text.as_str()),
        "not a reluctant template: {}",
        result.text
    );

    // The refused request still counts toward the threshold.
    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.interaction_count, 1);
    assert!(profile.memory.media.is_empty());
}

#[tokio::test]
async fn gate_open_media_request_produces_media() {
    // First call answers the scene escalation, second the chat reply.
    let generator = ScriptedGenerator::new(&[
        r#"{"scene": "terrazza al tramonto", "outfit": ""}"#,
        "Eccola, appena scattata per te!",
    ]);
    let store = Arc::new(MemoryStore::new());
    let npc = NpcId::new();
    let mut seeded = PersonaProfile::seed(npc, "Luna");
    seeded.interaction_count = 20;
    store.save(&seeded).expect("seed profile");

    let pipeline = TurnPipeline::new(store.clone(), generator, AmicaConfig::default())
        .with_media(Arc::new(OkMediaBackend));

    let request = TurnRequest::direct(UserId::new(), npc, "Luna", "Mandami una foto di te");
    let result = pipeline.run(request).await.expect("turn");

    assert!(!result.gate_deferred);
    assert_eq!(result.media.len(), 1);
    assert_eq!(result.media[0].kind, MediaKind::Photo);
    assert!(result.media[0].caption.contains("terrazza"));
    assert!(result.actions.contains(&ReplyAction::SendMedia(MediaKind::Photo)));

    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.memory.media.len(), 1);
}

#[tokio::test]
async fn couple_photo_asks_for_user_reference_first() {
    let generator = ScriptedGenerator::new(&["Va bene!"]);
    let store = Arc::new(MemoryStore::new());
    let npc = NpcId::new();
    let mut seeded = PersonaProfile::seed(npc, "Luna");
    seeded.interaction_count = 20;
    store.save(&seeded).expect("seed profile");

    let pipeline = TurnPipeline::new(store, generator, AmicaConfig::default())
        .with_media(Arc::new(OkMediaBackend));

    let request = TurnRequest::direct(
        UserId::new(),
        npc,
        "Luna",
        "Mandami una foto di noi due insieme",
    );
    let result = pipeline.run(request).await.expect("turn");

    assert!(result.media.is_empty());
    assert!(result.text.contains("una tua foto"));
    assert!(result
        .actions
        .contains(&ReplyAction::RequestUserPhoto(MediaKind::CouplePhoto)));
}

#[tokio::test]
async fn group_message_selects_only_the_named_member() {
    let generator = ScriptedGenerator::new(&["Secondo me hai ragione tu."]);
    let (_, pipeline) = pipeline_with(generator);
    let luna = NpcId::new();
    let mara = NpcId::new();
    let members = vec![
        GroupMember::new(luna, "Luna"),
        GroupMember::new(mara, "Mara"),
    ];
    let group = GroupId::new();

    let request = TurnRequest::direct(UserId::new(), luna, "Luna", "Luna, cosa ne pensi?");
    let results = pipeline
        .run_group(group, &members, request)
        .await
        .expect("group turn");

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].npc_id, luna);
}

#[tokio::test]
async fn raised_responder_cap_fans_out_to_every_named_member() {
    let generator = ScriptedGenerator::new(&["Io ci sto!"]);
    let store = Arc::new(MemoryStore::new());
    let mut config = AmicaConfig::default();
    config.group.max_responders = 2;
    let pipeline = TurnPipeline::new(store, generator, config);
    let luna = NpcId::new();
    let mara = NpcId::new();
    let members = vec![
        GroupMember::new(luna, "Luna"),
        GroupMember::new(mara, "Mara"),
    ];

    let request = TurnRequest::direct(UserId::new(), luna, "Luna", "Luna e Mara, venite al mare?");
    let results = pipeline
        .run_group(GroupId::new(), &members, request)
        .await
        .expect("group turn");

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].npc_id, luna);
    assert_eq!(results[1].npc_id, mara);
}

#[tokio::test]
async fn group_media_gate_ignores_private_familiarity() {
    let generator = ScriptedGenerator::new(&["Va bene!"]);
    let store = Arc::new(MemoryStore::new());
    let npc = NpcId::new();
    let mut seeded = PersonaProfile::seed(npc, "Luna");
    seeded.interaction_count = 20;
    store.save(&seeded).expect("seed profile");

    let pipeline = TurnPipeline::new(store, generator, AmicaConfig::default())
        .with_media(Arc::new(OkMediaBackend));
    let members = vec![GroupMember::new(npc, "Luna")];

    // Twenty private turns are past the threshold, but the room has none.
    let request = TurnRequest::direct(UserId::new(), npc, "Luna", "Luna, mandami una foto di te");
    let results = pipeline
        .run_group(GroupId::new(), &members, request)
        .await
        .expect("group turn");

    assert!(results[0].gate_deferred);
    assert!(results[0].media.is_empty());
}

#[tokio::test]
async fn empty_group_roster_is_an_error() {
    let generator = ScriptedGenerator::new(&["..."]);
    let (_, pipeline) = pipeline_with(generator);

    let request = TurnRequest::direct(UserId::new(), NpcId::new(), "Luna", "c'e nessuno?");
    let err = pipeline
        .run_group(GroupId::new(), &[], request)
        .await
        .expect_err("no members");
    assert!(matches!(err, EngineError::EmptyGroup));
}

#[tokio::test]
async fn provider_failure_falls_back_to_canned_reply() {
    let generator = ScriptedGenerator::new(&[PROVIDER_ERROR_SENTINEL]);
    let (store, pipeline) = pipeline_with(generator);
    let npc = NpcId::new();

    let request = TurnRequest::direct(UserId::new(), npc, "Luna", "Ciao, come va?");
    let result = pipeline.run(request).await.expect("turn");

    assert!(result.text.contains("testa tra le nuvole"));

    // The failed turn is still learned from and persisted.
    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.interaction_count, 1);
}

#[tokio::test]
async fn sentinel_retry_recovers_on_second_attempt() {
    let generator = ScriptedGenerator::new(&[PROVIDER_ERROR_SENTINEL, "Eccomi, amore."]);
    let (_, pipeline) = pipeline_with(generator);

    let request = TurnRequest::direct(UserId::new(), NpcId::new(), "Luna", "Ci sei?");
    let result = pipeline.run(request).await.expect("turn");

    assert!(result.text.contains("Eccomi"));
}

#[tokio::test]
async fn concurrent_turns_for_the_same_pair_serialize() {
    let generator = ScriptedGenerator::new(&["Dimmi tutto."]);
    let (store, pipeline) = pipeline_with(generator);
    let pipeline = Arc::new(pipeline);
    let user = UserId::new();
    let npc = NpcId::new();

    // Without the keyed lock one load-modify-save would overwrite the
    // other and the counter would read 1.
    let a = pipeline.run(TurnRequest::direct(user, npc, "Luna", "Prima cosa"));
    let b = pipeline.run(TurnRequest::direct(user, npc, "Luna", "Seconda cosa"));
    let (ra, rb) = tokio::join!(a, b);
    ra.expect("first turn");
    rb.expect("second turn");

    let profile = store.load_or_seed(npc, "Luna").expect("saved profile");
    assert_eq!(profile.interaction_count, 2);
    assert_eq!(profile.memory.episodes.len(), 2);
}

#[tokio::test]
async fn group_turns_accumulate_social_weight_but_private_turns_do_not() {
    let generator = ScriptedGenerator::new(&["Che bello sentirti!"]);
    let (_, pipeline) = pipeline_with(generator);
    let user = UserId::new();
    let npc = NpcId::new();
    let members = vec![GroupMember::new(npc, "Luna")];
    let group = GroupId::new();

    // Private chat leaves the social graph untouched.
    let request = TurnRequest::direct(user, npc, "Luna", "Ciao! Oggi sono felice.");
    pipeline.run(request).await.expect("turn");
    assert_eq!(pipeline.social_weight(user, npc), 0.0);

    for _ in 0..3 {
        let request = TurnRequest::direct(user, npc, "Luna", "Ciao a tutti! Oggi sono felice.");
        pipeline
            .run_group(group, &members, request)
            .await
            .expect("group turn");
    }
    assert!(pipeline.social_weight(user, npc) > 0.0);
}
