//! Generation seam — the trait the pipeline talks to instead of a
//! concrete provider client, so tests can swap in a scripted generator.

use async_trait::async_trait;

use amica_core::config::GenerationConfig;
use amica_llm::client::{GatewayClient, Provider};
use amica_llm::types::GenerationRequest;

/// Reply generator with the sentinel contract: the returned string is
/// either real text or one of the gateway sentinels, never an error.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply for the request.
    async fn generate(&self, request: &GenerationRequest) -> String;
}

#[async_trait]
impl Generator for GatewayClient {
    async fn generate(&self, request: &GenerationRequest) -> String {
        self.generate_or_sentinel(request).await
    }
}

/// Build the production gateway client from configuration.
#[must_use]
pub fn client_from_config(config: &GenerationConfig) -> GatewayClient {
    GatewayClient::new(
        Provider::Ollama {
            base_url: config.default_base_url.clone(),
        },
        config.default_model.clone(),
        config.unrestricted_model.clone(),
        config.max_fallback_attempts,
    )
}
