//! Provider Adapter + Model Router (§4.1, §4.2): a uniform chat/embed
//! interface over heterogeneous LLM vendors, with fallback routing.

pub mod anthropic;
pub mod local;
pub mod openai;
pub mod router;
pub mod sanitize;
pub mod trait_def;
pub mod types;

pub use anthropic::AnthropicProvider;
pub use local::LocalProvider;
pub use openai::OpenAiProvider;
pub use router::{ModelRouter, RouterConfig};
pub use sanitize::ToolNameSanitizer;
pub use trait_def::AiProvider;
pub use types::{ChatMessage, ChatRequest, ChatResult, ChatRole, OutboundToolCall, ProviderError, StopReason};

use std::collections::HashMap;
use std::sync::Arc;

use agentcore_config::AppConfig;

/// Builds every provider whose credentials are configured, grounded on the
/// teacher's `ProviderFactory::create_all`.
#[must_use]
pub fn build_providers(config: &AppConfig) -> HashMap<String, Arc<dyn AiProvider>> {
    let mut providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();

    if let Some(key) = &config.anthropic_api_key {
        providers.insert(
            "anthropic".to_string(),
            Arc::new(AnthropicProvider::new(key.clone(), config.default_model.clone())),
        );
    }
    if let Some(key) = &config.openai_api_key {
        providers.insert(
            "openai".to_string(),
            Arc::new(OpenAiProvider::new(key.clone(), config.default_model.clone())),
        );
    }
    if let Some(base_url) = &config.local_provider_base_url {
        providers.insert(
            "local".to_string(),
            Arc::new(OpenAiProvider::local(base_url.clone(), config.default_model.clone())),
        );
    }

    providers
}

/// Parses the configured `fallback_chain` (`"openai:gpt-4o,anthropic:claude-3-opus"`)
/// into router-ready `(provider, model)` pairs, skipping malformed entries.
#[must_use]
pub fn parse_fallback_chain(fallback_chain: &[String]) -> Vec<(String, String)> {
    fallback_chain
        .iter()
        .filter_map(|entry| entry.split_once(':'))
        .map(|(provider, model)| (provider.to_string(), model.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_fallback_chain_splits_provider_and_model() {
        let parsed = parse_fallback_chain(&["openai:gpt-4o".to_string(), "malformed".to_string()]);
        assert_eq!(parsed, vec![("openai".to_string(), "gpt-4o".to_string())]);
    }
}
