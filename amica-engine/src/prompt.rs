//! Prompt assembly — turning persona state and working memory into the
//! layered document the gateway sends to the model.
//!
//! Layer order is fixed: persona rule, identity, style, state, memory,
//! intent, media, task. Later layers may narrow earlier ones but never
//! contradict them, so the strongest constraints come first.

use amica_core::config::AmicaConfig;
use amica_core::context::Speaker;
use amica_core::memory::WorkingMemory;
use amica_core::motivation::Motivation;
use amica_core::perception::MediaAnalysis;
use amica_core::persona::PersonaProfile;
use amica_core::types::ToneMode;
use amica_llm::prompt::{render_template, tone_instructions, STYLE_BASELINE};
use amica_llm::types::{is_sentinel, ChatMessage, GenerationRequest, PolicyMode};

/// The persona rule that opens every system prompt. Everything else is
/// negotiable; this line is not.
const PERSONA_RULE: &str = "\
Sei una persona reale in una chat privata, non un assistente.\n\
Non dire mai di essere un'IA, un modello o un programma.\n\
Non offrire aiuto generico; vivi la conversazione come la persona che sei.";

/// Effective tone for a profile: the family guard pins the register to
/// soft no matter what the stored preference says.
#[must_use]
pub fn effective_tone(profile: &PersonaProfile) -> ToneMode {
    if profile.family_guard {
        ToneMode::Soft
    } else {
        profile.preferences.tone_mode
    }
}

/// Model pool the profile's effective tone routes to.
#[must_use]
pub fn policy_for(profile: &PersonaProfile) -> PolicyMode {
    if effective_tone(profile).is_explicit() {
        PolicyMode::Unrestricted
    } else {
        PolicyMode::Standard
    }
}

/// Assemble the layered system prompt for one turn.
#[must_use]
pub fn assemble_system(
    profile: &PersonaProfile,
    memory: &WorkingMemory<'_>,
    motivation: &Motivation,
    media: Option<&MediaAnalysis>,
    language: &str,
    config: &AmicaConfig,
) -> String {
    let tone = effective_tone(profile);
    let mut sections: Vec<String> = Vec::with_capacity(8);

    sections.push(PERSONA_RULE.to_string());

    // Identity
    let mut identity = format!("Ti chiami {}.", profile.identity.name);
    if !profile.identity.appearance.is_empty() {
        identity.push_str(&format!(" Aspetto: {}.", profile.identity.appearance));
    }
    sections.push(identity);

    // Style constraints
    let sentences = profile.preferences.reply_sentences.max(1).to_string();
    let mut style = render_template(STYLE_BASELINE, &[("max_sentences", sentences.as_str())]);
    style.push('\n');
    style.push_str(tone_instructions(tone.as_str()));
    if language != config.general.default_language {
        style.push_str(&format!("\nRispondi in lingua: {language}."));
    }
    sections.push(style);

    // State block
    let emotion = &profile.state.emotion;
    sections.push(format!(
        "Stato attuale: umore {}, intensita emotiva {:.2}.\nRelazione con l'utente: {}.\nLivello di confidenza: {}.",
        profile.state.mood,
        emotion.intensity(),
        profile.relationship.summary(),
        profile.experience.level,
    ));

    // Memory block
    let mut memory_lines: Vec<String> = Vec::new();
    if !memory.long_term_summary.is_empty() {
        memory_lines.push(format!("La vostra storia: {}", memory.long_term_summary));
    }
    for episode in memory.episodes.iter().rev().take(3) {
        memory_lines.push(format!("Ricordo recente: {}", episode.summary));
    }
    if !memory_lines.is_empty() {
        sections.push(memory_lines.join("\n"));
    }

    // Intent summary
    let mut intent_line = format!("In questo momento vuoi: {}.", motivation.abstract_goal);
    if !motivation.secondary.is_empty() {
        let extras: Vec<String> = motivation
            .secondary
            .iter()
            .map(|i| format!("{i:?}").to_lowercase())
            .collect();
        intent_line.push_str(&format!(" Tieni conto anche di: {}.", extras.join(", ")));
    }
    sections.push(intent_line);

    // Media block
    if let Some(analysis) = media {
        sections.push(format!(
            "L'utente ha condiviso un contenuto ({}): {} Reagisci a quello che vedi o senti.",
            analysis.kind.as_str(),
            analysis.description,
        ));
    }

    // Task instruction
    sections.push("Rispondi all'ultimo messaggio dell'utente restando nel personaggio.".to_string());

    sections.join("\n\n")
}

/// Build the chat transcript from working memory, skipping degenerate
/// turns (sentinels, empty text) so a bad earlier turn never poisons the
/// next prompt.
#[must_use]
pub fn sanitized_history(memory: &WorkingMemory<'_>, current_message: &str) -> Vec<ChatMessage> {
    let mut messages: Vec<ChatMessage> = memory
        .short_term
        .iter()
        .filter(|turn| !turn.text.trim().is_empty() && !is_sentinel(turn.text.trim()))
        .map(|turn| match turn.speaker {
            Speaker::User => ChatMessage::user(turn.text.clone()),
            Speaker::Npc => ChatMessage::assistant(turn.text.clone()),
        })
        .collect();
    messages.push(ChatMessage::user(current_message.to_string()));
    messages
}

/// Build the full generation request for one turn. `message` is the
/// current (normalized) user message; the history window must not already
/// contain it.
#[must_use]
pub fn build_request(
    profile: &PersonaProfile,
    memory: &WorkingMemory<'_>,
    motivation: &Motivation,
    media: Option<&MediaAnalysis>,
    message: &str,
    language: &str,
    config: &AmicaConfig,
) -> GenerationRequest {
    let system = assemble_system(profile, memory, motivation, media, language, config);
    let messages = sanitized_history(memory, message);
    let request = match policy_for(profile) {
        PolicyMode::Standard => GenerationRequest::standard(system, messages),
        PolicyMode::Unrestricted => GenerationRequest::unrestricted(system, messages),
    };
    request.with_timeout(config.generation.request_timeout_ms)
}
