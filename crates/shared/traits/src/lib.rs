//! Trait seams that let the Agent Loop and Scheduler Worker stay generic
//! over the concrete Tool Registry and Notification Bus implementations.

use agentcore_models::{Notification, UserId};
use async_trait::async_trait;

/// Substrings that mark a tool failure as permanent rather than transient
/// (§4.3, §4.6 and §7: "not found / does not exist / unknown tool").
const PERMANENT_ERROR_MARKERS: &[&str] = &["not found", "does not exist", "unknown tool"];

#[must_use]
pub fn is_permanent_error_message(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    PERMANENT_ERROR_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool_use_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
    pub user_id: Option<UserId>,
}

#[derive(Debug, Clone)]
pub struct ToolOutcome {
    pub result: Option<serde_json::Value>,
}

/// §7 taxonomy: `ToolDispatchError` (network failure reaching the module) vs
/// `ToolBusinessError` (the module answered but reported `success: false`).
#[derive(Debug, Clone, thiserror::Error)]
pub enum ToolError {
    #[error("dispatch error calling tool {tool_name}: {message}")]
    Dispatch { tool_name: String, message: String },
    #[error("tool {tool_name} reported failure: {message}")]
    Business { tool_name: String, message: String },
}

impl ToolError {
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Dispatch { message, .. } | Self::Business { message, .. } => message,
        }
    }

    /// §4.3/§4.6: a permanent check error ("unknown tool" etc) is never retried.
    #[must_use]
    pub fn is_permanent(&self) -> bool {
        is_permanent_error_message(self.message())
    }
}

pub type ToolExecutionResult = Result<ToolOutcome, ToolError>;

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, invocation: ToolInvocation) -> ToolExecutionResult;
}

#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: Notification) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_permanent_error_phrases() {
        assert!(is_permanent_error_message("Error: unknown tool 'foo'"));
        assert!(is_permanent_error_message("module does not exist"));
        assert!(is_permanent_error_message("Resource not found"));
        assert!(!is_permanent_error_message("connection reset by peer"));
    }
}
