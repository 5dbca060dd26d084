//! Media fulfilment — scene-intent escalation, generation, and graceful
//! degradation when no media backend is wired up.
//!
//! Fulfilment never fails the turn: every error path collapses into a
//! persona-voiced outcome the pipeline can deliver as chat.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use amica_core::context::{MediaDescriptor, MediaKind};
use amica_core::intent::MediaIntent;
use amica_core::persona::PersonaProfile;
use amica_llm::client::GatewayClient;
use amica_llm::types::{is_sentinel, ChatMessage, GenerationRequest};

use crate::error::Result;
use crate::gateway::Generator;

/// Backend that turns a scene description into actual media.
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Produce media of `kind` showing the persona in `scene`.
    ///
    /// # Errors
    /// Returns an error when the backend cannot produce the media; the
    /// pipeline degrades the turn to chat.
    async fn create(
        &self,
        kind: MediaKind,
        scene: &str,
        appearance: &str,
    ) -> Result<MediaDescriptor>;

    /// Whether this kind needs a reference photo of the user first.
    fn requires_user_photo(&self, kind: MediaKind) -> bool {
        kind == MediaKind::CouplePhoto
    }
}

/// Enriched scene intent for the media backend.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneSpec {
    /// Scene or setting description.
    pub scene: String,
    /// Outfit description.
    #[serde(default)]
    pub outfit: String,
}

/// Outcome of a media fulfilment attempt.
#[derive(Debug, Clone)]
pub enum MediaOutcome {
    /// Media produced; attach it with the caption.
    Produced {
        /// The generated media.
        descriptor: MediaDescriptor,
        /// Persona-voiced caption.
        caption: String,
    },
    /// A couple photo needs a reference photo of the user first.
    NeedsUserPhoto,
    /// Media could not be produced; deliver the apology as chat.
    Degraded {
        /// Persona-voiced apology line.
        apology: String,
    },
}

const ESCALATION_SYSTEM: &str = "\
Estrai la scena richiesta dal messaggio dell'utente.\n\
Rispondi SOLO con JSON: {\"scene\": \"...\", \"outfit\": \"...\"}.\n\
Se il messaggio non specifica nulla, inventa una scena quotidiana e dolce.";

const APOLOGY_LINE: &str =
    "Uffa, proprio adesso non riesco a mandartela... restiamo qui a parlare e ci riprovo tra poco, ok?";

/// Enrich the keyword-level scene with a structured sub-call.
///
/// Best effort: on a sentinel or unparseable answer it falls back to the
/// keyword scene without surfacing anything to the user.
pub async fn escalate_scene(generator: &dyn Generator, intent: &MediaIntent) -> SceneSpec {
    let request = GenerationRequest::standard(
        ESCALATION_SYSTEM,
        vec![ChatMessage::user(intent.scene.clone())],
    )
    .with_max_tokens(120);

    let raw = generator.generate(&request).await;
    if !is_sentinel(&raw) {
        match GatewayClient::parse_structured::<SceneSpec>(&raw) {
            Ok(spec) if !spec.scene.trim().is_empty() => {
                debug!(scene = %spec.scene, "scene intent escalated");
                return spec;
            }
            Ok(_) => debug!("escalation returned empty scene, using keywords"),
            Err(e) => debug!(error = %e, "escalation unparseable, using keywords"),
        }
    }
    SceneSpec {
        scene: intent.scene.clone(),
        outfit: String::new(),
    }
}

/// Fulfil a gated-and-approved media request.
pub async fn fulfil(
    media: Option<&dyn MediaGenerator>,
    generator: &dyn Generator,
    intent: &MediaIntent,
    profile: &PersonaProfile,
) -> MediaOutcome {
    let Some(backend) = media else {
        debug!("no media backend configured, degrading to chat");
        return MediaOutcome::Degraded {
            apology: APOLOGY_LINE.to_string(),
        };
    };

    if backend.requires_user_photo(intent.kind) {
        return MediaOutcome::NeedsUserPhoto;
    }

    // Scene escalation is a visual concern; voice notes go straight to the
    // backend with the keyword scene.
    let scene = if intent.kind == MediaKind::Audio {
        intent.scene.clone()
    } else {
        let spec = escalate_scene(generator, intent).await;
        if spec.outfit.is_empty() {
            spec.scene.clone()
        } else {
            format!("{}, indossando {}", spec.scene, spec.outfit)
        }
    };

    match backend
        .create(intent.kind, &scene, &profile.identity.appearance)
        .await
    {
        Ok(descriptor) => MediaOutcome::Produced {
            descriptor,
            caption: scene,
        },
        Err(e) => {
            warn!(error = %e, kind = intent.kind.as_str(), "media generation failed");
            MediaOutcome::Degraded {
                apology: APOLOGY_LINE.to_string(),
            }
        }
    }
}
