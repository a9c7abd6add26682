//! Wire shapes for the external HTTP contracts (§6.1-§6.4).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agentcore_identifiers::{ScheduledJobId, UserId};

use crate::permission::PermissionLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub mime_type: Option<String>,
}

/// `POST /message` body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub platform: String,
    pub platform_user_id: String,
    #[serde(default)]
    pub platform_username: Option<String>,
    pub platform_channel_id: String,
    #[serde(default)]
    pub platform_thread_id: Option<String>,
    #[serde(default)]
    pub platform_server_id: Option<String>,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputFile {
    pub filename: String,
    pub url: String,
}

/// Response returned from both `/message` and `/continue`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AgentResponse {
    pub content: String,
    #[serde(default)]
    pub files: Vec<OutputFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentResponse {
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            files: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            content: message.clone(),
            files: Vec::new(),
            error: Some(message),
        }
    }
}

/// `POST /continue` body, the Scheduler Worker's sole entry point back into
/// the Agent Loop (§4.6 completion dispatch, §9 design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContinueRequest {
    pub platform: String,
    pub platform_channel_id: String,
    #[serde(default)]
    pub platform_thread_id: Option<String>,
    pub user_id: UserId,
    pub content: String,
    #[serde(default)]
    pub job_id: Option<ScheduledJobId>,
    #[serde(default)]
    pub workflow_id: Option<Uuid>,
    #[serde(default)]
    pub result_data: Option<serde_json::Value>,
}

/// Keys that survive the summarization in `/continue`'s synthetic message
/// (§4.6 completion dispatch) so task transcripts don't flood context.
pub const RESULT_DATA_WHITELIST: &[&str] = &[
    "task_id",
    "status",
    "workspace",
    "mode",
    "error",
    "elapsed_seconds",
    "exit_code",
];

#[must_use]
pub fn summarize_result_data(result_data: &serde_json::Value) -> serde_json::Value {
    let serde_json::Value::Object(map) = result_data else {
        return serde_json::Value::Null;
    };
    let mut summarized = serde_json::Map::new();
    for key in RESULT_DATA_WHITELIST {
        if let Some(value) = map.get(*key) {
            summarized.insert((*key).to_string(), value.clone());
        }
    }
    serde_json::Value::Object(summarized)
}

/// `GET /manifest` response from a tool module (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleManifest {
    pub module_name: String,
    pub description: String,
    pub tools: Vec<ToolSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
    pub required_permission: PermissionLevel,
}

/// `POST /execute` body sent to a tool module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    pub arguments: serde_json::Value,
    #[serde(default)]
    pub user_id: Option<UserId>,
}

/// `POST /execute` response from a tool module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    pub tool_name: String,
    pub success: bool,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
        }
    }
}

/// Pub/sub payload published on `notifications:<platform>` (§6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub platform: String,
    pub channel: String,
    #[serde(default)]
    pub thread: Option<String>,
    pub content: String,
    pub user_id: UserId,
    #[serde(default)]
    pub job_id: Option<ScheduledJobId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_data_summary_drops_unknown_keys() {
        let raw = serde_json::json!({
            "task_id": "t1",
            "status": "completed",
            "raw_transcript": "a very long transcript that should not leak into context",
        });
        let summary = summarize_result_data(&raw);
        assert_eq!(summary["task_id"], "t1");
        assert_eq!(summary["status"], "completed");
        assert!(summary.get("raw_transcript").is_none());
    }
}
