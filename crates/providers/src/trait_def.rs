//! Provider Adapter trait (§4.1), trimmed from the teacher's `AiProvider`
//! down to the two capabilities this spec actually needs: chat and embed.

use async_trait::async_trait;

use crate::types::{ChatRequest, ChatResult, ProviderError};

#[async_trait]
pub trait AiProvider: Send + Sync {
    /// Provider identifier, e.g. `"anthropic"`, `"openai"`, `"local"`.
    fn name(&self) -> &str;

    /// Model this provider falls back to when the router has no better idea.
    fn default_model(&self) -> &str;

    /// Whether a model name (as it appears on an incoming request or a
    /// persisted conversation) belongs to this vendor's namespace.
    fn supports_model(&self, model: &str) -> bool;

    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResult, ProviderError>;

    /// Embeds a batch of strings into vectors of equal dimensionality.
    /// Returns `BadRequest` for empty input rather than a provider round trip.
    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError>;
}
