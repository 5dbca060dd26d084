//! Gateway client — unified interface over Ollama and OpenAI-compatible
//! generation backends, with dual model pools and sentinel degradation.

use std::time::{Duration, Instant};

use reqwest::Client;
use serde_json::json;
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::types::{
    ChatMessage, ChatRole, GenerationRequest, GenerationResponse, PolicyMode,
    EMPTY_SENTINEL, PROVIDER_ERROR_SENTINEL,
};

/// Provider backend for generation.
#[derive(Debug, Clone)]
pub enum Provider {
    /// Ollama running locally.
    Ollama {
        /// Base URL, e.g. `http://localhost:11434`.
        base_url: String,
    },
    /// OpenAI-compatible chat-completions API.
    OpenAiCompatible {
        /// Base URL of the API.
        base_url: String,
        /// Bearer token.
        api_key: String,
    },
    /// No provider configured; every call degrades to the error sentinel.
    None,
}

/// The gateway client that routes requests to the configured backend.
///
/// Two model pools are kept: the standard pool for everyday conversation
/// and an unrestricted pool that explicit tone modes route to.
pub struct GatewayClient {
    provider: Provider,
    http: Client,
    standard_model: String,
    unrestricted_model: String,
    max_retries: u32,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("standard_model", &self.standard_model)
            .field("unrestricted_model", &self.unrestricted_model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Create a new gateway client.
    #[must_use]
    pub fn new(
        provider: Provider,
        standard_model: impl Into<String>,
        unrestricted_model: impl Into<String>,
        max_retries: u32,
    ) -> Self {
        Self {
            provider,
            http: Client::new(),
            standard_model: standard_model.into(),
            unrestricted_model: unrestricted_model.into(),
            max_retries,
        }
    }

    /// Create a client with no backend; callers exercise their fallback path.
    #[must_use]
    pub fn none() -> Self {
        Self {
            provider: Provider::None,
            http: Client::new(),
            standard_model: String::new(),
            unrestricted_model: String::new(),
            max_retries: 0,
        }
    }

    /// Whether a real backend is configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, Provider::None)
    }

    fn model_for(&self, policy: PolicyMode) -> &str {
        match policy {
            PolicyMode::Standard => &self.standard_model,
            PolicyMode::Unrestricted => &self.unrestricted_model,
        }
    }

    /// Generate a reply.
    ///
    /// # Errors
    /// Returns an error when no provider is configured or every attempt
    /// failed; callers should degrade via [`generate_or_sentinel`].
    ///
    /// [`generate_or_sentinel`]: Self::generate_or_sentinel
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse, LlmError> {
        match &self.provider {
            Provider::None => Err(LlmError::Unavailable("no provider configured".into())),
            Provider::Ollama { base_url } => self.generate_ollama(base_url, request).await,
            Provider::OpenAiCompatible { base_url, api_key } => {
                self.generate_openai(base_url, api_key, request).await
            }
        }
    }

    /// Generate a reply, degrading to a sentinel string instead of an error.
    ///
    /// Returns [`PROVIDER_ERROR_SENTINEL`] when the provider fails and
    /// [`EMPTY_SENTINEL`] when it answers with whitespace, so the caller
    /// always has exactly one string to inspect.
    pub async fn generate_or_sentinel(&self, request: &GenerationRequest) -> String {
        match self.generate(request).await {
            Ok(response) if response.text.trim().is_empty() => {
                warn!(model = %response.model, "provider returned empty text");
                EMPTY_SENTINEL.to_string()
            }
            Ok(response) => response.text,
            Err(e) => {
                warn!(error = %e, "generation failed, returning sentinel");
                PROVIDER_ERROR_SENTINEL.to_string()
            }
        }
    }

    fn chat_payload(&self, request: &GenerationRequest) -> Vec<serde_json::Value> {
        let mut messages = vec![json!({ "role": "system", "content": request.system })];
        for msg in &request.messages {
            let role = match msg.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            };
            messages.push(json!({ "role": role, "content": msg.content }));
        }
        messages
    }

    /// Generate using Ollama's chat API.
    async fn generate_ollama(
        &self,
        base_url: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, LlmError> {
        let model = self.model_for(request.policy).to_string();
        let url = format!("{base_url}/api/chat");
        let body = json!({
            "model": model,
            "messages": self.chat_payload(request),
            "stream": false,
            "options": {
                "temperature": request.temperature,
                "num_predict": request.max_tokens,
            }
        });

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, total = self.max_retries + 1, "retrying generation");
            }

            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let text = json["message"]["content"].as_str().unwrap_or("").to_string();
                    return Ok(GenerationResponse {
                        text,
                        tokens_generated: json["eval_count"].as_u64().unwrap_or(0) as u32,
                        latency_ms,
                        model,
                    });
                }
                Ok(resp) => {
                    let err = LlmError::RequestFailed(format!("HTTP {}", resp.status()));
                    warn!(error = %err, "ollama returned error");
                    last_error = err.to_string();
                }
                Err(e) => {
                    let err = LlmError::from_reqwest(&e, request.timeout_ms);
                    warn!(error = %err, "ollama request failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Generate using an OpenAI-compatible chat-completions API.
    async fn generate_openai(
        &self,
        base_url: &str,
        api_key: &str,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, LlmError> {
        let model = self.model_for(request.policy).to_string();
        let url = format!("{base_url}/v1/chat/completions");
        let body = json!({
            "model": model,
            "messages": self.chat_payload(request),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!(attempt = attempt + 1, total = self.max_retries + 1, "retrying generation");
            }

            let start = Instant::now();
            let result = self
                .http
                .post(&url)
                .header("Authorization", format!("Bearer {api_key}"))
                .json(&body)
                .timeout(Duration::from_millis(request.timeout_ms))
                .send()
                .await;
            let latency_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let json: serde_json::Value = resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()))?;
                    let text = json["choices"][0]["message"]["content"]
                        .as_str()
                        .unwrap_or("")
                        .to_string();
                    let tokens = json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32;
                    return Ok(GenerationResponse {
                        text,
                        tokens_generated: tokens,
                        latency_ms,
                        model,
                    });
                }
                Ok(resp) => {
                    let err = LlmError::RequestFailed(format!("HTTP {}", resp.status()));
                    warn!(error = %err, "provider returned error");
                    last_error = err.to_string();
                }
                Err(e) => {
                    let err = LlmError::from_reqwest(&e, request.timeout_ms);
                    warn!(error = %err, "provider request failed");
                    last_error = err.to_string();
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }

    /// Parse a raw response as structured JSON, tolerating prose around the
    /// JSON object (models often wrap it in commentary).
    ///
    /// # Errors
    /// Returns [`LlmError::ParseError`] when no parseable object is found.
    pub fn parse_structured<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, LlmError> {
        if let Ok(value) = serde_json::from_str(text) {
            return Ok(value);
        }
        // Best effort: extract the outermost {...} span.
        if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
            if start < end {
                return serde_json::from_str(&text[start..=end]).map_err(|e| {
                    LlmError::ParseError(format!("embedded JSON parse error: {e}"))
                });
            }
        }
        Err(LlmError::ParseError(format!(
            "no JSON object in response: '{text}'"
        )))
    }

    /// Build a chat transcript from alternating (speaker, text) turns.
    #[must_use]
    pub fn transcript(turns: &[(bool, String)]) -> Vec<ChatMessage> {
        turns
            .iter()
            .map(|(is_user, text)| {
                if *is_user {
                    ChatMessage::user(text.clone())
                } else {
                    ChatMessage::assistant(text.clone())
                }
            })
            .collect()
    }
}
