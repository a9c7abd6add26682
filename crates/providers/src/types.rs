//! Vendor-neutral chat shapes (§4.1).

use serde::{Deserialize, Serialize};

use agentcore_models::ToolSpec;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

/// One entry of the message sequence handed to a provider. Tool-call and
/// tool-result entries carry the fields the Context Builder already
/// materialized from persisted messages (§4.4 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<serde_json::Value>,
    #[serde(default)]
    pub tool_use_id: Option<String>,
}

impl ChatMessage {
    #[must_use]
    pub fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
            arguments: None,
            tool_use_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutboundToolCall {
    pub tool_use_id: String,
    pub tool_name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EndTurn,
    ToolUse,
    MaxTokens,
}

#[derive(Debug, Clone)]
pub struct ChatResult {
    pub text: Option<String>,
    pub tool_calls: Vec<OutboundToolCall>,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub model_returned: String,
    pub stop_reason: StopReason,
}

impl ChatResult {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.stop_reason != StopReason::ToolUse || self.tool_calls.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
    pub tools: Option<&'a [ToolSpec]>,
    pub model: &'a str,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// §7 provider error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transient provider error: {0}")]
    Transient(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("provider auth error: {0}")]
    Auth(String),
}

impl ProviderError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}
