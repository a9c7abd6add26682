//! Anthropic adapter (§4.1), grounded on the teacher's
//! `domain/ai/src/services/providers/anthropic/{provider,generation}.rs`.

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

const API_VERSION: &str = "2023-06-01";
const MAX_RETRIES: u32 = 3;
/// §4.1 empty-response guard, grounded on `original_source`'s
/// `_MAX_MALFORMED_RETRIES` (`google.py:16-17`).
const MAX_MALFORMED_RETRIES: u32 = 2;

pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    endpoint: String,
    default_model: String,
    sanitizer: Mutex<ToolNameSanitizer>,
}

impl AnthropicProvider {
    #[must_use]
    pub fn new(api_key: impl Into<String>, default_model: impl Into<String>) -> Self {
        Self::with_endpoint(api_key, default_model, "https://api.anthropic.com/v1")
    }

    #[must_use]
    pub fn with_endpoint(
        api_key: impl Into<String>,
        default_model: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            default_model: default_model.into(),
            sanitizer: Mutex::new(ToolNameSanitizer::new()),
        }
    }

    fn to_anthropic_messages(&self, messages: &[ChatMessage]) -> (Option<String>, Vec<AnthropicMessage>) {
        let mut system = None;
        let mut out = Vec::new();
        let mut sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");

        for msg in messages {
            match msg.role {
                ChatRole::System => {
                    system = Some(msg.content.clone());
                }
                ChatRole::User => out.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: vec![AnthropicContentBlock::Text { text: msg.content.clone() }],
                }),
                ChatRole::Assistant => out.push(AnthropicMessage {
                    role: "assistant".to_string(),
                    content: vec![AnthropicContentBlock::Text { text: msg.content.clone() }],
                }),
                ChatRole::ToolCall => {
                    let name = msg.name.clone().unwrap_or_default();
                    let sanitized_name = sanitizer.sanitize(&name);
                    out.push(AnthropicMessage {
                        role: "assistant".to_string(),
                        content: vec![AnthropicContentBlock::ToolUse {
                            id: msg.tool_use_id.clone().unwrap_or_default(),
                            name: sanitized_name,
                            input: msg.arguments.clone().unwrap_or(json!({})),
                        }],
                    });
                }
                ChatRole::ToolResult => out.push(AnthropicMessage {
                    role: "user".to_string(),
                    content: vec![AnthropicContentBlock::ToolResult {
                        tool_use_id: msg.tool_use_id.clone().unwrap_or_default(),
                        content: msg.content.clone(),
                    }],
                }),
            }
        }
        (system, out)
    }

    async fn send_once(&self, body: &serde_json::Value) -> Result<AnthropicResponse, ProviderError> {
        let response = self
            .client
            .post(format!("{}/messages", self.endpoint))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ProviderError::Auth(format!("anthropic returned {status}")));
        }
        if status.is_client_error() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::BadRequest(format!("anthropic {status}: {text}")));
        }
        if status.is_server_error() {
            return Err(ProviderError::Transient(format!("anthropic returned {status}")));
        }

        response
            .json::<AnthropicResponse>()
            .await
            .map_err(|e| ProviderError::Transient(format!("malformed anthropic response: {e}")))
    }

    async fn send_with_retry(&self, body: &serde_json::Value) -> Result<AnthropicResponse, ProviderError> {
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
}

#[async_trait]
impl AiProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn supports_model(&self, model: &str) -> bool {
        model.starts_with("claude")
    }

    async fn chat(&self, request: ChatRequest<'_>) -> Result<ChatResult, ProviderError> {
        let (system, messages) = self.to_anthropic_messages(request.messages);

        let tools: Vec<_> = request
            .tools
            .unwrap_or_default()
            .iter()
            .map(|t| {
                let mut sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");
                json!({
                    "name": sanitizer.sanitize(&t.name),
                    "description": t.description,
                    "input_schema": t.parameters,
                })
            })
            .collect();

        let mut body = json!({
            "model": request.model,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "messages": messages,
        });
        if let Some(system) = system {
            body["system"] = json!(system);
        }
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
                "anthropic returned an empty response, retrying"
            );
            tokio::time::sleep(Duration::from_secs(1)).await;
            let parsed = self.send_with_retry(&body).await?;
            result = self.finalize(parsed);
        }

        if result.text.is_none() && result.tool_calls.is_empty() {
            return Err(ProviderError::Transient(format!(
                "anthropic returned an empty response after {malformed_attempt} retries (stop_reason={:?})",
                result.stop_reason
            )));
        }

        Ok(result)
    }

    async fn embed(&self, _model: &str, _inputs: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        Err(ProviderError::BadRequest(
            "anthropic does not expose an embeddings endpoint".to_string(),
        ))
    }
}

impl AnthropicProvider {
    fn finalize(&self, parsed: AnthropicResponse) -> ChatResult {
        let mut text = None;
        let mut tool_calls = Vec::new();
        let sanitizer = self.sanitizer.lock().expect("sanitizer mutex poisoned");

        for block in parsed.content {
            match block {
                AnthropicContentBlock::Text { text: t } => {
                    text = Some(text.map_or(t.clone(), |acc: String| acc + &t));
                }
                AnthropicContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(OutboundToolCall {
                        tool_use_id: id,
                        tool_name: sanitizer.original_name(&name),
                        arguments: input,
                    });
                }
                AnthropicContentBlock::Image { .. } | AnthropicContentBlock::ToolResult { .. } => {}
            }
        }

        let stop_reason = match parsed.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        ChatResult {
            text,
            tool_calls,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
            model_returned: parsed.model,
            stop_reason,
        }
    }
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicContentBlock>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicContentBlock {
    Text {
        text: String,
    },
    #[serde(rename = "tool_use")]
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    #[serde(rename = "tool_result")]
    ToolResult {
        tool_use_id: String,
        content: String,
    },
    Image {
        #[serde(default)]
        source: serde_json::Value,
    },
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContentBlock>,
    model: String,
    stop_reason: Option<String>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: i64,
    output_tokens: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supports_model_matches_claude_prefix() {
        let provider = AnthropicProvider::new("key", "claude-3-5-sonnet-latest");
        assert!(provider.supports_model("claude-3-5-sonnet-latest"));
        assert!(!provider.supports_model("gpt-4o"));
    }

    #[test]
    fn stop_reason_maps_tool_use() {
        let provider = AnthropicProvider::new("key", "claude-3-5-sonnet-latest");
        let parsed = AnthropicResponse {
            content: vec![AnthropicContentBlock::ToolUse {
                id: "toolu_1".to_string(),
                name: "research_search".to_string(),
                input: json!({"query": "foo"}),
            }],
            model: "claude-3-5-sonnet-latest".to_string(),
            stop_reason: Some("tool_use".to_string()),
            usage: AnthropicUsage { input_tokens: 10, output_tokens: 5 },
        };
        let result = provider.finalize(parsed);
        assert_eq!(result.stop_reason, StopReason::ToolUse);
        assert_eq!(result.tool_calls.len(), 1);
        assert_eq!(result.tool_calls[0].tool_use_id, "toolu_1");
    }
}
