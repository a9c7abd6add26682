//! Context Builder (§4.4), grounded on
//! `original_source/agent/core/orchestrator/context_builder.py`.

use std::sync::Arc;

use agentcore_models::{Conversation, MessageContent, MessageRole, Persona, User};
use agentcore_providers::{ChatMessage, ChatRole, ModelRouter};
use chrono::Utc;

use crate::classifier::ContextDepthClassifier;
use crate::repository::{ConversationRepository, MemoryRepository, MessageRepository};
use crate::token_estimate::TokenEstimator;

const RESERVED_WORKING_FRACTION: f32 = 0.8;
const SEMANTIC_MEMORY_CAP: i64 = 3;
const ELLIPSIS_MARKER: &str = " … [truncated]";

#[derive(Debug, Clone)]
pub struct ContextBuilderConfig {
    pub working_memory_messages: usize,
    pub minimal_memory_messages: usize,
    pub memory_relevance_threshold: f32,
    pub history_tool_result_max_chars: usize,
    pub tool_schema_token_budget: u32,
}

/// Hook for §4.4 step 3 ("project context injection"). Project tracking
/// isn't part of the core data model in §3 (only User/PlatformLink/Persona/
/// Conversation/Message/MemorySummary/TokenLog/ScheduledJob are); this trait
/// lets a deployment wire in whatever module owns project state without the
/// Context Builder depending on it. The default never injects anything.
pub trait ProjectContextProvider: Send + Sync {
    fn project_summary(&self, user: &User) -> Option<String>;
}

#[derive(Debug, Default)]
pub struct NoProjectContext;

impl ProjectContextProvider for NoProjectContext {
    fn project_summary(&self, _user: &User) -> Option<String> {
        None
    }
}

pub struct ContextBuilder {
    conversation_repo: Arc<ConversationRepository>,
    message_repo: Arc<MessageRepository>,
    memory_repo: Arc<MemoryRepository>,
    router: Arc<ModelRouter>,
    classifier: Arc<dyn ContextDepthClassifier>,
    estimator: Arc<dyn TokenEstimator>,
    project_context: Arc<dyn ProjectContextProvider>,
    config: ContextBuilderConfig,
}

impl ContextBuilder {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_repo: Arc<ConversationRepository>,
        message_repo: Arc<MessageRepository>,
        memory_repo: Arc<MemoryRepository>,
        router: Arc<ModelRouter>,
        classifier: Arc<dyn ContextDepthClassifier>,
        estimator: Arc<dyn TokenEstimator>,
        project_context: Arc<dyn ProjectContextProvider>,
        config: ContextBuilderConfig,
    ) -> Self {
        Self {
            conversation_repo,
            message_repo,
            memory_repo,
            router,
            classifier,
            estimator,
            project_context,
            config,
        }
    }

    pub async fn build(
        &self,
        user: &User,
        conversation: &Conversation,
        persona: Option<&Persona>,
        new_user_text: &str,
        target_model: &str,
        has_tools: bool,
    ) -> anyhow::Result<Vec<ChatMessage>> {
        // 1. Budget computation.
        let context_window = self.estimator.context_window(target_model);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let mut working_budget = (context_window as f32 * RESERVED_WORKING_FRACTION) as u32;
        if has_tools {
            working_budget = working_budget.saturating_sub(self.config.tool_schema_token_budget);
        }

        let mut messages = Vec::new();

        // 2. System prompt (the only system-role message).
        let base_prompt = persona.map_or_else(
            || "You are a helpful assistant.".to_string(),
            |p| p.system_prompt.clone(),
        );
        let system_prompt = format!(
            "{base_prompt}\n\nCurrent UTC time: {now}\n\n\
            You may schedule follow-up work with the scheduler; a scheduled job can \
            notify the user or resume this conversation once its condition is met. \
            When executing a multi-step project, prefer continuing an in-progress \
            workspace over starting a new one.",
            now = Utc::now().to_rfc3339(),
        );
        messages.push(ChatMessage::text(ChatRole::System, system_prompt));

        // 3. Project context injection (optional).
        if let Some(summary) = self.project_context.project_summary(user) {
            messages.push(ChatMessage::text(ChatRole::System, summary));
        }

        // 4. Semantic memory injection.
        if let Ok(embeddings) = self.router.embed(&[new_user_text.to_string()]).await {
            if let Some(query_embedding) = embeddings.into_iter().next() {
                if let Ok(ranked) = self
                    .memory_repo
                    .search(user.id, &query_embedding, self.config.memory_relevance_threshold, SEMANTIC_MEMORY_CAP)
                    .await
                {
                    if !ranked.is_empty() {
                        let joined = ranked
                            .iter()
                            .map(|r| format!("- {}", r.memory.summary))
                            .collect::<Vec<_>>()
                            .join("\n");
                        messages.push(ChatMessage::text(
                            ChatRole::System,
                            format!("Relevant memories:\n{joined}"),
                        ));
                    }
                }
            }
        }

        // 5. Prior conversation summary.
        if conversation.is_summarized {
            if let Ok(Some(summary)) = self.conversation_repo.latest_summary(conversation.id).await {
                messages.push(ChatMessage::text(ChatRole::System, format!("Conversation summary so far:\n{summary}")));
            }
        }

        // 6. Working memory depth decision (adaptive, deterministic).
        let window = if self.classifier.needs_full_context(new_user_text) {
            self.config.working_memory_messages
        } else {
            self.config.minimal_memory_messages
        };

        // 7. Materialize working memory.
        let history = self.message_repo.recent(conversation.id, window as i64).await?;
        for message in &history {
            messages.push(self.render_history_message(message));
        }

        // 8. Append the new user message.
        messages.push(ChatMessage::text(ChatRole::User, new_user_text));

        // 9. Budget trim.
        trim_to_budget(&mut messages, working_budget, self.estimator.as_ref(), target_model);

        // 10. Orphan sanitization.
        sanitize_orphans(&mut messages);

        Ok(messages)
    }

    fn render_history_message(&self, message: &agentcore_models::Message) -> ChatMessage {
        match message.parsed_content() {
            MessageContent::Text(text) => {
                let role = match message.role {
                    MessageRole::System => ChatRole::System,
                    MessageRole::User => ChatRole::User,
                    _ => ChatRole::Assistant,
                };
                ChatMessage::text(role, text)
            }
            MessageContent::ToolCall { name, arguments, tool_use_id } => ChatMessage {
                role: ChatRole::ToolCall,
                content: String::new(),
                name: Some(name),
                arguments: Some(arguments),
                tool_use_id: Some(tool_use_id),
            },
            MessageContent::ToolResult { name, result, error, tool_use_id } => {
                let mut content = error.unwrap_or_else(|| {
                    result.map(|v| v.to_string()).unwrap_or_default()
                });
                if content.chars().count() > self.config.history_tool_result_max_chars {
                    let truncated: String = content.chars().take(self.config.history_tool_result_max_chars).collect();
                    content = format!("{truncated}{ELLIPSIS_MARKER}");
                }
                ChatMessage {
                    role: ChatRole::ToolResult,
                    content,
                    name: Some(name),
                    arguments: None,
                    tool_use_id: Some(tool_use_id),
                }
            }
        }
    }
}

/// An atomic removable unit for §4.4 step 9: a lone non-tool message, or a
/// maximal run of consecutive `tool_call`/`tool_result` messages.
fn atomic_groups(messages: &[ChatMessage]) -> Vec<(usize, usize)> {
    let mut groups = Vec::new();
    let mut i = 0;
    while i < messages.len() {
        if is_tool_shaped(&messages[i]) {
            let start = i;
            while i < messages.len() && is_tool_shaped(&messages[i]) {
                i += 1;
            }
            groups.push((start, i));
        } else {
            groups.push((i, i + 1));
            i += 1;
        }
    }
    groups
}

fn is_tool_shaped(message: &ChatMessage) -> bool {
    matches!(message.role, ChatRole::ToolCall | ChatRole::ToolResult)
}

/// §4.4 step 9: drop oldest atomic groups from the middle until the estimate
/// fits, always preserving system messages and the final user message.
fn trim_to_budget(messages: &mut Vec<ChatMessage>, budget: u32, estimator: &dyn TokenEstimator, model: &str) {
    let estimate_total = |msgs: &[ChatMessage]| -> u32 {
        msgs.iter().map(|m| estimator.estimate(&m.content, model)).sum()
    };

    while estimate_total(messages) > budget {
        let last_index = messages.len().saturating_sub(1);
        let groups = atomic_groups(messages);
        let removable = groups.iter().find(|&&(start, end)| {
            end <= last_index && !messages[start..end].iter().any(|m| m.role == ChatRole::System)
        });

        let Some(&(start, end)) = removable else { break };
        messages.drain(start..end);
    }

    strip_leading_orphan_tool_results(messages);
}

/// After trimming, a leading `tool_result` with no preceding `tool_call` in
/// the surviving list must go (Testable Property 6: trim stability).
fn strip_leading_orphan_tool_results(messages: &mut Vec<ChatMessage>) {
    while let Some(first) = messages.iter().position(|m| m.role != ChatRole::System) {
        if messages[first].role == ChatRole::ToolResult {
            messages.remove(first);
        } else {
            break;
        }
    }
}

/// §4.4 step 10: remove any message whose `tool_use_id` appears in exactly
/// one of the call-set/result-set (Invariant 1, Testable Property 1).
fn sanitize_orphans(messages: &mut Vec<ChatMessage>) {
    use std::collections::HashSet;

    let call_ids: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::ToolCall)
        .filter_map(|m| m.tool_use_id.as_deref())
        .collect();
    let result_ids: HashSet<&str> = messages
        .iter()
        .filter(|m| m.role == ChatRole::ToolResult)
        .filter_map(|m| m.tool_use_id.as_deref())
        .collect();

    messages.retain(|m| match (&m.role, m.tool_use_id.as_deref()) {
        (ChatRole::ToolCall, Some(id)) => result_ids.contains(id),
        (ChatRole::ToolResult, Some(id)) => call_ids.contains(id),
        _ => true,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_call(id: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::ToolCall,
            content: String::new(),
            name: Some("tool".to_string()),
            arguments: Some(serde_json::json!({})),
            tool_use_id: Some(id.to_string()),
        }
    }

    fn tool_result(id: &str) -> ChatMessage {
        ChatMessage {
            role: ChatRole::ToolResult,
            content: "result".to_string(),
            name: Some("tool".to_string()),
            arguments: None,
            tool_use_id: Some(id.to_string()),
        }
    }

    #[test]
    fn orphan_tool_call_without_result_is_dropped() {
        let mut messages = vec![
            ChatMessage::text(ChatRole::User, "hi"),
            tool_call("a"),
            ChatMessage::text(ChatRole::Assistant, "done"),
        ];
        sanitize_orphans(&mut messages);
        assert!(!messages.iter().any(|m| m.role == ChatRole::ToolCall));
    }

    #[test]
    fn paired_tool_call_and_result_survive() {
        let mut messages = vec![tool_call("a"), tool_result("a")];
        sanitize_orphans(&mut messages);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn orphan_tool_result_without_call_is_dropped() {
        let mut messages = vec![tool_result("orphan"), ChatMessage::text(ChatRole::User, "hi")];
        sanitize_orphans(&mut messages);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, ChatRole::User);
    }

    #[test]
    fn atomic_groups_treats_consecutive_tool_messages_as_one_unit() {
        let messages = vec![
            ChatMessage::text(ChatRole::User, "hi"),
            tool_call("a"),
            tool_result("a"),
            ChatMessage::text(ChatRole::Assistant, "done"),
        ];
        let groups = atomic_groups(&messages);
        assert_eq!(groups, vec![(0, 1), (1, 3), (3, 4)]);
    }

    #[test]
    fn strip_leading_orphan_result_after_trim() {
        let mut messages = vec![
            ChatMessage::text(ChatRole::System, "sys"),
            tool_result("dangling"),
            ChatMessage::text(ChatRole::User, "hi"),
        ];
        strip_leading_orphan_tool_results(&mut messages);
        assert!(messages.iter().all(|m| m.role != ChatRole::ToolResult));
    }
}
