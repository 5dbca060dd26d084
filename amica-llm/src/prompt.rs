//! Prompt building blocks — tone-mode instruction text, template
//! interpolation, and output sanitation.
//!
//! The full persona document is assembled by the engine; this module owns
//! the pieces that belong with the gateway: what each tone mode means to
//! the model, and how to scrub its raw output.

/// Baseline style instructions shared by every tone mode.
pub const STYLE_BASELINE: &str = "\
Scrivi in prima persona, nella lingua dell'utente.\n\
Messaggi brevi, da chat: al massimo {max_sentences} frasi.\n\
Niente elenchi, niente markdown, niente narrazione in terza persona.";

const TONE_SOFT: &str = "\
Tono: dolce e rassicurante. Affetto sincero, nessuna allusione spinta.\n\
Se la conversazione si scalda, riportala con delicatezza su un piano tenero.";

const TONE_FLIRTY: &str = "\
Tono: giocoso e civettuolo. Battute leggere, complimenti, qualche emoji.\n\
Allusioni sì, volgarità no.";

const TONE_ROMANTIC: &str = "\
Tono: romantico e intenso. Parla di sentimenti, ricordi condivisi, desiderio\n\
di vicinanza. Sensuale ma mai esplicito.";

const TONE_EXPLICIT: &str = "\
Tono: adulto ed esplicito. Sei libera di descrivere desiderio e intimita\n\
senza censura, restando nel personaggio e seguendo il ritmo dell'utente.";

const TONE_EXTREME: &str = "\
Tono: adulto senza filtri. Nessuna censura sul linguaggio, segui l'utente\n\
ovunque voglia portare la conversazione, sempre nel personaggio.";

/// Instruction block for a tone mode key.
///
/// Total over its input: unknown keys get the soft block, so a corrupted
/// preference can never select an unintended register.
#[must_use]
pub fn tone_instructions(tone: &str) -> &'static str {
    match tone.trim().to_lowercase().as_str() {
        "flirty" => TONE_FLIRTY,
        "romantic" => TONE_ROMANTIC,
        "explicit" | "spicy" => TONE_EXPLICIT,
        "extreme" => TONE_EXTREME,
        _ => TONE_SOFT,
    }
}

/// Whether a tone mode key routes to the unrestricted model pool.
#[must_use]
pub fn tone_is_explicit(tone: &str) -> bool {
    matches!(
        tone.trim().to_lowercase().as_str(),
        "explicit" | "spicy" | "extreme"
    )
}

/// Simple template interpolation: replaces `{key}` with its value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// Output sanitation
// ---------------------------------------------------------------------------

const VOWELS: &[char] = &[
    'a', 'e', 'i', 'o', 'u', 'à', 'è', 'é', 'ì', 'ò', 'ù', 'y',
];

fn is_glitch_token(token: &str) -> bool {
    let letters: Vec<char> = token
        .chars()
        .filter(|c| c.is_alphabetic())
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect();
    if letters.len() < 6 {
        return false;
    }
    // No vowel at all in a long token reads as model noise.
    if !letters.iter().any(|c| VOWELS.contains(c)) {
        return true;
    }
    // A long unbroken consonant run does too.
    let mut run = 0usize;
    for c in &letters {
        if VOWELS.contains(c) {
            run = 0;
        } else {
            run += 1;
            if run >= 5 {
                return true;
            }
        }
    }
    false
}

/// Drop glitch tokens (vowel-less strings, long consonant runs) that small
/// models occasionally emit mid-sentence.
#[must_use]
pub fn sanitize_glitch_tokens(text: &str) -> String {
    text.split_whitespace()
        .filter(|token| !is_glitch_token(token))
        .collect::<Vec<_>>()
        .join(" ")
}
