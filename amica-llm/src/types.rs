//! Core types for generation requests and responses.

use serde::{Deserialize, Serialize};

/// Sentinel returned in place of text when every provider attempt failed.
/// Callers must check for it and never show it to the user.
pub const PROVIDER_ERROR_SENTINEL: &str = "[AMICA_PROVIDER_ERROR]";

/// Sentinel returned when the provider answered with empty or
/// whitespace-only text.
pub const EMPTY_SENTINEL: &str = "[AMICA_EMPTY]";

/// Whether `text` is one of the gateway sentinels rather than a real reply.
#[must_use]
pub fn is_sentinel(text: &str) -> bool {
    text == PROVIDER_ERROR_SENTINEL || text == EMPTY_SENTINEL
}

/// Which model pool a request is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyMode {
    /// The default, content-filtered model.
    Standard,
    /// The uncensored model pool for explicit tone modes.
    Unrestricted,
}

/// Role of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// System instructions.
    System,
    /// User turn.
    User,
    /// Model turn.
    Assistant,
}

/// One message in the chat transcript sent to the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Message role.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// A system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// A user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// An assistant message.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A request to the generation gateway.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    /// System prompt (persona document, rules, constraints).
    pub system: String,
    /// Prior transcript plus the current user turn.
    pub messages: Vec<ChatMessage>,
    /// Model pool to route to.
    pub policy: PolicyMode,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl GenerationRequest {
    /// Create a standard-policy request.
    #[must_use]
    pub fn standard(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            system: system.into(),
            messages,
            policy: PolicyMode::Standard,
            max_tokens: 300,
            temperature: 0.8,
            timeout_ms: 15_000,
        }
    }

    /// Create an unrestricted-policy request.
    #[must_use]
    pub fn unrestricted(system: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            policy: PolicyMode::Unrestricted,
            temperature: 0.9,
            ..Self::standard(system, messages)
        }
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A response from the generation gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    /// The generated text.
    pub text: String,
    /// Tokens generated, when the provider reports it.
    pub tokens_generated: u32,
    /// Wall-clock latency in milliseconds.
    pub latency_ms: u64,
    /// Model that served the request.
    pub model: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_are_recognized() {
        assert!(is_sentinel(PROVIDER_ERROR_SENTINEL));
        assert!(is_sentinel(EMPTY_SENTINEL));
        assert!(!is_sentinel("ciao!"));
        assert!(!is_sentinel(""));
    }

    #[test]
    fn unrestricted_request_routes_to_unrestricted_pool() {
        let req = GenerationRequest::unrestricted("sys", vec![ChatMessage::user("ciao")]);
        assert_eq!(req.policy, PolicyMode::Unrestricted);
        assert!(req.temperature > 0.8);
    }

    #[test]
    fn chat_roles_serialize_lowercase() {
        let msg = ChatMessage::assistant("ok");
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains("\"assistant\""));
    }
}
