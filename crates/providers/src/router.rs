//! Model Router (§4.2), grounded on
//! `original_source/agent/core/llm_router/router.py`.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::trait_def::AiProvider;
use crate::types::{ChatMessage, ChatResult, ProviderError};

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub default_model: String,
    pub embedding_model: String,
    /// Ordered `(provider_name, model_name)` pairs tried after the primary
    /// target raises a transient error.
    pub fallback_chain: Vec<(String, String)>,
}

pub struct ModelRouter {
    providers: HashMap<String, Arc<dyn AiProvider>>,
    config: RouterConfig,
}

impl ModelRouter {
    /// Registers `providers` and rewrites `config.default_model` to the
    /// first registered provider's own default if the configured default's
    /// provider isn't registered (e.g. missing API key) — teacher pattern
    /// from `_resolve_effective_defaults`.
    #[must_use]
    pub fn new(providers: HashMap<String, Arc<dyn AiProvider>>, mut config: RouterConfig) -> Self {
        if Self::provider_for_model_in(&providers, &config.default_model).is_none() {
            if let Some(fallback) = providers.values().next() {
                warn!(
                    old_default = %config.default_model,
                    new_default = %fallback.default_model(),
                    "default model's provider not registered, rewriting to first registered provider"
                );
                config.default_model = fallback.default_model().to_string();
            }
        }
        Self { providers, config }
    }

    fn provider_for_model_in<'a>(
        providers: &'a HashMap<String, Arc<dyn AiProvider>>,
        model: &str,
    ) -> Option<&'a Arc<dyn AiProvider>> {
        providers.values().find(|p| p.supports_model(model))
    }

    /// Exact model name wins; else the effective default.
    #[must_use]
    pub fn resolve(&self, model_or_task: &str) -> (Arc<dyn AiProvider>, String) {
        if let Some(provider) = Self::provider_for_model_in(&self.providers, model_or_task) {
            return (provider.clone(), model_or_task.to_string());
        }
        let default_model = self.config.default_model.clone();
        match Self::provider_for_model_in(&self.providers, &default_model) {
            Some(provider) => (provider.clone(), default_model),
            None => {
                let provider = self
                    .providers
                    .values()
                    .next()
                    .cloned()
                    .expect("at least one provider must be registered");
                let model = provider.default_model().to_string();
                (provider, model)
            }
        }
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[agentcore_models::ToolSpec]>,
        model_or_task: &str,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<ChatResult, ProviderError> {
        let (provider, model) = self.resolve(model_or_task);
        let request = crate::types::ChatRequest { messages, tools, model: &model, max_tokens, temperature };

        match provider.chat(request).await {
            Ok(result) => return Ok(result),
            Err(ProviderError::BadRequest(msg)) => return Err(ProviderError::BadRequest(msg)),
            Err(err) => {
                warn!(provider = provider.name(), model = %model, error = %err, "primary chat target failed, walking fallback chain");
            }
        }

        for (provider_name, fallback_model) in &self.config.fallback_chain {
            let Some(fallback_provider) = self.providers.get(provider_name) else { continue };
            let request = crate::types::ChatRequest {
                messages,
                tools,
                model: fallback_model,
                max_tokens,
                temperature,
            };
            match fallback_provider.chat(request).await {
                Ok(result) => return Ok(result),
                Err(ProviderError::BadRequest(msg)) => return Err(ProviderError::BadRequest(msg)),
                Err(err) => {
                    warn!(provider = %provider_name, model = %fallback_model, error = %err, "fallback chat target failed");
                }
            }
        }

        Err(ProviderError::Transient("all providers in fallback chain exhausted".to_string()))
    }

    pub async fn embed(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let embedding_model = self.config.embedding_model.clone();
        if let Some(provider) = Self::provider_for_model_in(&self.providers, &embedding_model) {
            match provider.embed(&embedding_model, inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(ProviderError::BadRequest(msg)) => return Err(ProviderError::BadRequest(msg)),
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "primary embedding provider failed, trying others");
                }
            }
        }

        for provider in self.providers.values() {
            if provider.name() == "anthropic" {
                continue;
            }
            match provider.embed(&embedding_model, inputs).await {
                Ok(vectors) => return Ok(vectors),
                Err(ProviderError::BadRequest(_)) => continue,
                Err(err) => {
                    warn!(provider = provider.name(), error = %err, "fallback embedding provider failed");
                }
            }
        }

        Err(ProviderError::Transient("no provider could satisfy the embed request".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatRequest, StopReason};
    use async_trait::async_trait;

    struct StubProvider {
        provider_name: &'static str,
        prefix: &'static str,
        fail: bool,
    }

    #[async_trait]
    impl AiProvider for StubProvider {
        fn name(&self) -> &str {
            self.provider_name
        }
        fn default_model(&self) -> &str {
            self.prefix
        }
        fn supports_model(&self, model: &str) -> bool {
            model.starts_with(self.prefix)
        }
        async fn chat(&self, _request: ChatRequest<'_>) -> Result<ChatResult, ProviderError> {
            if self.fail {
                Err(ProviderError::Transient("stub failure".to_string()))
            } else {
                Ok(ChatResult {
                    text: Some("ok".to_string()),
                    tool_calls: vec![],
                    input_tokens: 1,
                    output_tokens: 1,
                    model_returned: self.prefix.to_string(),
                    stop_reason: StopReason::EndTurn,
                })
            }
        }
        async fn embed(&self, _model: &str, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
            Ok(vec![vec![0.0]])
        }
    }

    #[test]
    fn rewrites_default_when_its_provider_is_unregistered() {
        let mut providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();
        providers.insert(
            "openai".to_string(),
            Arc::new(StubProvider { provider_name: "openai", prefix: "gpt", fail: false }),
        );
        let router = ModelRouter::new(
            providers,
            RouterConfig {
                default_model: "claude-3-5-sonnet-latest".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
                fallback_chain: vec![],
            },
        );
        let (provider, model) = router.resolve("claude-3-5-sonnet-latest");
        assert_eq!(provider.name(), "openai");
        assert_eq!(model, "gpt");
    }

    #[tokio::test]
    async fn chat_walks_fallback_chain_on_transient_error() {
        let mut providers: HashMap<String, Arc<dyn AiProvider>> = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            Arc::new(StubProvider { provider_name: "anthropic", prefix: "claude", fail: true }),
        );
        providers.insert(
            "openai".to_string(),
            Arc::new(StubProvider { provider_name: "openai", prefix: "gpt", fail: false }),
        );
        let router = ModelRouter::new(
            providers,
            RouterConfig {
                default_model: "claude-3-5-sonnet-latest".to_string(),
                embedding_model: "text-embedding-3-small".to_string(),
                fallback_chain: vec![("openai".to_string(), "gpt-4o".to_string())],
            },
        );
        let result = router.chat(&[], None, "claude-3-5-sonnet-latest", 1024, 0.7).await.unwrap();
        assert_eq!(result.model_returned, "gpt");
    }
}
