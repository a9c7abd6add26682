//! OpenAI-wire adapter (§4.1), grounded on the teacher's
//! `domain/ai/src/models/providers/openai.rs` + `openai/provider.rs`.
//!
//! Also backs the "local"/OpenAI-compatible adapter (self-hosted servers
//! mirror this wire format), see [`crate::local`].

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::warn;

use crate::sanitize::ToolNameSanitizer;
use crate::trait_def::AiProvider;
use crate::types::{ChatMessage, ChatRequest, ChatResult, ChatRole, OutboundToolCall, ProviderError, StopReason};

const MAX_RETRIES: u32 = 3;
/// §4.1 empty-response guard, grounded on `original_source`'s
/// `_MAX_MALFORMED_RETRIES` (`google.py:16-17`).
const MAX_MALFORMED_RETRIES: u32 = 2;

pub struct OpenAiProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    default_model: String,
    provider_name: &'static str,
    model_prefixes: &'static [&'static str],
    sanitizer: Mutex<ToolNameSanitizer>,
}

impl OpenAiProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::build(api_key, default_model, "https://api.openai.com/v1", "openai", &["gpt", "o1", "o3", "text-embedding"])
    }

    /// An OpenAI-compatible server (Ollama, vLLM, etc.) reached at a custom base URL.
    #[must_use]
    pub fn local(base_url: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::build("", default_model, base_url, "local", &[])
    }

    fn build(
        api_key: impl Into<String>,
        default_model: impl Into<String>,
        endpoint: impl Into<String>,
        provider_name: &'static str,
        model_prefixes: &'static [&'static str],
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            default_model: default_model.into(),
            provider_name,
            model_prefixes,
            sanitizer: Mutex::new(ToolNameSanitizer::new()),
        }
    }

    fn to_openai_messages(&self, messages: &[ChatMessage]) -> Vec<OpenAiMessage> {
        let mut sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");
        messages
            .iter()
            .map(|msg| match msg.role {
                ChatRole::System => OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(OpenAiMessageContent::Text(msg.content.clone())),
                    tool_calls: None,
                    tool_call_id: None,
                },
                ChatRole::User => OpenAiMessage {
                    role: "user".to_string(),
                    content: Some(OpenAiMessageContent::Text(msg.content.clone())),
                    tool_calls: None,
                    tool_call_id: None,
                },
                ChatRole::Assistant => OpenAiMessage {
                    role: "assistant".to_string(),
                    content: Some(OpenAiMessageContent::Text(msg.content.clone())),
                    tool_calls: None,
                    tool_call_id: None,
                },
                ChatRole::ToolCall => {
                    let name = msg.name.clone().unwrap_or_default();
                    let sanitized_name = sanitizer.sanitize(&name);
                    let call_id = msg.tool_use_id.clone().unwrap_or_default();
                    OpenAiMessage {
                        role: "assistant".to_string(),
                        content: None,
                        tool_calls: Some(vec![OpenAiToolCall {
                            id: call_id,
                            call_type: "function".to_string(),
                            function: OpenAiFunctionCall {
                                name: sanitized_name,
                                arguments: msg.arguments.clone().unwrap_or(json!({})).to_string(),
                            },
                        }]),
                        tool_call_id: None,
                    }
                }
                ChatRole::ToolResult => OpenAiMessage {
                    role: "tool".to_string(),
                    content: Some(OpenAiMessageContent::Text(msg.content.clone())),
                    tool_calls: None,
                    tool_call_id: msg.tool_use_id.clone(),
                },
            })
            .collect()
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<OpenAiResponse, ProviderError> {
        let mut req = self.client.post(format!("{}/chat/completions", self.endpoint)).json(body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let response = req.send().await.map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("{} returned {status}", self.provider_name)));
        }
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::BadRequest(format!("{} {status}: {text}", self.provider_name)));
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient(format!("{} returned {status}", self.provider_name)));
        }

        response
            .json::<OpenAiResponse>()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed {} response: {e}", self.provider_name)))
    }

    async fn send_with_retry(&self, body: &serde_json::Value) -> Result<OpenAiResponse, ProviderError> {
        let mut attempt = 0;
        loop {
            match self.send_once(body).await {
                Ok(parsed) => return Ok(parsed),
                Err(err) if err.is_retryable() && attempt < MAX_RETRIES - 1 => {
                    attempt += 1;
                    tokio::time::sleep(Duration::from_millis(200 * 2u64.pow(attempt))).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn finalize(&self, parsed: OpenAiResponse) -> ChatResult {
        let choice = parsed.choices.into_iter().next();
        let sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");

        let Some(choice) = choice else {
            return ChatResult {
                text: None,
                tool_calls: Vec::new(),
                input_tokens: parsed.usage.as_ref().map_or(0, |u| u.prompt_tokens),
                output_tokens: parsed.usage.as_ref().map_or(0, |u| u.completion_tokens),
                model_returned: parsed.model,
                stop_reason: StopReason::EndTurn,
            };
        };

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| OutboundToolCall {
                tool_use_id: tc.id,
                tool_name: sanitizer.original_name(&tc.function.name),
                arguments: serde_json::from_str(&tc.function.arguments).unwrap_or(json!({})),
            })
            .collect::<Vec<_>>();

        let stop_reason = match choice.finish_reason.as_deref() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let text = match choice.message.content {
            Some(OpenAiMessageContent::Text(t)) if !t.is_empty() => Some(t),
            _ => None,
        };

        ChatResult {
            text,
            tool_calls,
            input_tokens: parsed.usage.as_ref().map_or(0, |u| u.prompt_tokens),
            output_tokens: parsed.usage.as_ref().map_or(0, |u| u.completion_tokens),
            model_returned: parsed.model,
            stop_reason,
        }
    }
}

#[async_trait]
impl AiProvider for OpenAiProvider {
    fn name(&self) -> &str {
        self.provider_name
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_model(&self, model: &str) -> bool {
        if self.model_prefixes.is_empty() {
            return self.provider_name == "local";
        }
        self.model_prefixes.iter().any(|prefix| model.starts_with(prefix))
    }

    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResult, ProviderError> {
        let messages = self.to_openai_messages(request.messages);

        let tools: Vec<_> = request
            .tools
            .unwrap_or_default()
            .iter()
            .map(|t| {
                let mut sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");
                json!({
                    "type": "function",
                    "function": {
                        "name": sanitizer.sanitize(&t.name),
                        "description": t.description,
                        "parameters": t.parameters,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }

        let parsed = self.send_with_retry(&body).await?;
        let mut result = self.finalize(parsed);

        // §4.1 empty-response guard: neither text nor tool calls came back.
        // Retry a bounded number of times before surfacing a transient
        // error with enough diagnostics to act on.
        let mut malformed_attempt = 0;
        while result.text.is_none() && result.tool_calls.is_empty() && malformed_attempt < MAX_MALFORMED_RETRIES {
            malformed_attempt += 1;
            warn!(
                attempt = malformed_attempt,
                stop_reason = ?result.stop_reason,
                "{} returned an empty response, retrying",
                self.provider_name
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
            let parsed = self.send_with_retry(&body).await?;
            result = self.finalize(parsed);
        }

        if result.text.is_none() && result.tool_calls.is_empty() {
            return Err(ProviderError::Transient(format!(
                "{} returned an empty response after {malformed_attempt} retries (stop_reason={:?})",
                self.provider_name, result.stop_reason
            )));
        }

        Ok(result)
    }

    async fn embed(&self, model: &str, inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        if inputs.is_empty() {
            return Err(ProviderError::BadRequest("embed called with no inputs".to_string()));
        }

        let body = json!({ "model": model, "input": inputs });
        let mut req = self.client.post(format!("{}/embeddings", self.endpoint)).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let response = req.send().await.map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("{} returned {status}", self.provider_name)));
        }
        if status.is_client_error() {
            return Err(ProviderError::BadRequest(format!("{} returned {status}", self.provider_name)));
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient(format!("{} returned {status}", self.provider_name)));
        }

        let parsed: OpenAiEmbeddingResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed embedding response: {e}")))?;
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Debug, Serialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<OpenAiMessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum OpenAiMessageContent {
    Text(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: Option<OpenAiMessageContent>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: i64,
    completion_tokens: i64,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<OpenAiEmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingDatum {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_model_matches_known_prefixes() {
        let provider = OpenAiProvider::new("key", "gpt-4o");
        assert!(provider.supports_model("gpt-4o"));
        assert!(provider.supports_model("text-embedding-3-small"));
        assert!(!provider.supports_model("claude-3-5-sonnet-latest"));
    }

    #[test]
    fn local_provider_supports_any_model() {
        let provider = OpenAiProvider::local("http://localhost:11434/v1", "llama3");
        assert!(provider.supports_model("llama3"));
        assert_eq!(provider.name(), "local");
    }

    #[tokio::test]
    async fn embed_rejects_empty_inputs_without_network_call() {
        let provider = OpenAiProvider::new("key", "gpt-4o");
        let result = provider.embed("text-embedding-3-small", &[]).await;
        assert!(matches!(result, Err(ProviderError::BadRequest(_))));
    }
}
