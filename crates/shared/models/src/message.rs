use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{ConversationId, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    ToolCall,
    ToolResult,
}

/// The structured shape a `tool_call`/`tool_result` row's `content` column
/// decodes to. Everything else is a plain string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum MessageContent {
    Text(String),
    ToolCall {
        name: String,
        arguments: serde_json::Value,
        tool_use_id: String,
    },
    ToolResult {
        name: String,
        result: Option<serde_json::Value>,
        error: Option<String>,
        tool_use_id: String,
    },
}

/// The wire shape actually persisted for `tool_call` rows: `{name, arguments, tool_use_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub name: String,
    pub arguments: serde_json::Value,
    pub tool_use_id: String,
}

/// The wire shape actually persisted for `tool_result` rows: `{name, result, error?, tool_use_id}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultPayload {
    pub name: String,
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_use_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub role: MessageRole,
    pub content: String,
    pub token_count: Option<i32>,
    pub model_used: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn text(
        conversation_id: ConversationId,
        role: MessageRole,
        content: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            role,
            content: content.into(),
            token_count: None,
            model_used: None,
            created_at: now,
        }
    }

    #[must_use]
    pub fn tool_call(
        conversation_id: ConversationId,
        payload: &ToolCallPayload,
        now: DateTime<Utc>,
    ) -> Self {
        let content = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: MessageRole::ToolCall,
            content,
            token_count: None,
            model_used: None,
            created_at: now,
        }
    }

    #[must_use]
    pub fn tool_result(
        conversation_id: ConversationId,
        payload: &ToolResultPayload,
        now: DateTime<Utc>,
    ) -> Self {
        let content = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
        Self {
            id: MessageId::generate(),
            conversation_id,
            role: MessageRole::ToolResult,
            content,
            token_count: None,
            model_used: None,
            created_at: now,
        }
    }

    /// §4.4 step 7: parse the structured payload back out of `content`,
    /// falling back to a plain text message when it doesn't parse.
    #[must_use]
    pub fn parsed_content(&self) -> MessageContent {
        match self.role {
            MessageRole::ToolCall => match serde_json::from_str::<ToolCallPayload>(&self.content) {
                Ok(payload) => MessageContent::ToolCall {
                    name: payload.name,
                    arguments: payload.arguments,
                    tool_use_id: payload.tool_use_id,
                },
                Err(_) => MessageContent::Text(self.content.clone()),
            },
            MessageRole::ToolResult => {
                match serde_json::from_str::<ToolResultPayload>(&self.content) {
                    Ok(payload) => MessageContent::ToolResult {
                        name: payload.name,
                        result: payload.result,
                        error: payload.error,
                        tool_use_id: payload.tool_use_id,
                    },
                    Err(_) => MessageContent::Text(self.content.clone()),
                }
            },
            _ => MessageContent::Text(self.content.clone()),
        }
    }

    /// `tool_use_id` for pairing checks, or `None` for non tool-shaped messages
    /// (including ones whose content failed to parse).
    #[must_use]
    pub fn tool_use_id(&self) -> Option<String> {
        match self.parsed_content() {
            MessageContent::ToolCall { tool_use_id, .. }
            | MessageContent::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            MessageContent::Text(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_call_round_trips() {
        let now = Utc::now();
        let payload = ToolCallPayload {
            name: "research.search".to_string(),
            arguments: serde_json::json!({"query": "foo"}),
            tool_use_id: "call-1".to_string(),
        };
        let message = Message::tool_call(ConversationId::generate(), &payload, now);
        match message.parsed_content() {
            MessageContent::ToolCall { name, tool_use_id, .. } => {
                assert_eq!(name, "research.search");
                assert_eq!(tool_use_id, "call-1");
            },
            other => panic!("unexpected content: {other:?}"),
        }
        assert_eq!(message.tool_use_id().as_deref(), Some("call-1"));
    }

    #[test]
    fn malformed_json_falls_back_to_text() {
        let now = Utc::now();
        let message = Message {
            id: MessageId::generate(),
            conversation_id: ConversationId::generate(),
            role: MessageRole::ToolResult,
            content: "not json".to_string(),
            token_count: None,
            model_used: None,
            created_at: now,
        };
        match message.parsed_content() {
            MessageContent::Text(text) => assert_eq!(text, "not json"),
            other => panic!("unexpected content: {other:?}"),
        }
        assert!(message.tool_use_id().is_none());
    }
}
