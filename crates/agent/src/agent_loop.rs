//! Agent Loop (§4.5), grounded on
//! `original_source/agent/core/orchestrator/agent_loop.py`.

use std::sync::Arc;

use agentcore_models::{
    describe_attachments, Attachment, Conversation, FileRecord, Message, MessageRole, Persona,
    TokenLog, ToolCallPayload, ToolResultPayload, User,
};
use agentcore_providers::{ChatMessage, ChatRole, ModelRouter};
use agentcore_tools::ToolRegistry;
use agentcore_traits::{ToolExecutionResult, ToolExecutor, ToolInvocation};
use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use crate::context_builder::ContextBuilder;
use crate::repository::{
    ConversationRepository, FileRepository, MessageRepository, PersonaRepository,
    TokenLogRepository, UserRepository,
};

#[derive(Debug, Clone)]
pub struct AgentLoopConfig {
    pub max_agent_iterations: u32,
    pub conversation_timeout_minutes: i64,
    pub tool_result_max_chars: usize,
    pub default_guest_token_budget: i64,
    pub default_guest_modules: Vec<String>,
    pub max_response_tokens: u32,
    pub temperature: f32,
}

/// §4.5: what's carried in from a platform adapter for a single turn. Used
/// by both `POST /message` (§6.1) and the Scheduler Worker's completion
/// dispatch via `POST /continue` (§4.6), which synthesizes one of these.
#[derive(Debug, Clone)]
pub struct IncomingTurn {
    pub platform: String,
    pub platform_user_id: String,
    pub platform_username: Option<String>,
    pub platform_channel_id: String,
    pub platform_thread_id: Option<String>,
    pub platform_server_id: Option<String>,
    pub content: String,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub content: String,
    pub files: Vec<agentcore_models::OutputFile>,
}

/// §4.5 step 8: pulls file-like payloads out of a successful tool result,
/// grounded on `agent_loop.py:264-277` — a top-level `url` key, plus any
/// `url`-bearing objects nested under a `files` array (e.g. `code_executor`).
fn collect_files(result: &serde_json::Value, out: &mut Vec<agentcore_models::OutputFile>) {
    let Some(object) = result.as_object() else { return };

    if let Some(url) = object.get("url").and_then(|v| v.as_str()) {
        let filename = object.get("filename").and_then(|v| v.as_str()).unwrap_or("file");
        out.push(agentcore_models::OutputFile { filename: filename.to_string(), url: url.to_string() });
    }

    if let Some(files) = object.get("files").and_then(|v| v.as_array()) {
        for entry in files {
            let Some(entry) = entry.as_object() else { continue };
            let Some(url) = entry.get("url").and_then(|v| v.as_str()) else { continue };
            let filename = entry.get("filename").and_then(|v| v.as_str()).unwrap_or("file");
            out.push(agentcore_models::OutputFile { filename: filename.to_string(), url: url.to_string() });
        }
    }
}

pub struct AgentLoop {
    user_repo: Arc<UserRepository>,
    persona_repo: Arc<PersonaRepository>,
    conversation_repo: Arc<ConversationRepository>,
    message_repo: Arc<MessageRepository>,
    token_log_repo: Arc<TokenLogRepository>,
    file_repo: Arc<FileRepository>,
    context_builder: Arc<ContextBuilder>,
    router: Arc<ModelRouter>,
    tools: Arc<ToolRegistry>,
    config: AgentLoopConfig,
}

impl AgentLoop {
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_repo: Arc<UserRepository>,
        persona_repo: Arc<PersonaRepository>,
        conversation_repo: Arc<ConversationRepository>,
        message_repo: Arc<MessageRepository>,
        token_log_repo: Arc<TokenLogRepository>,
        file_repo: Arc<FileRepository>,
        context_builder: Arc<ContextBuilder>,
        router: Arc<ModelRouter>,
        tools: Arc<ToolRegistry>,
        config: AgentLoopConfig,
    ) -> Self {
        Self {
            user_repo,
            persona_repo,
            conversation_repo,
            message_repo,
            token_log_repo,
            file_repo,
            context_builder,
            router,
            tools,
            config,
        }
    }

    /// Runs one full turn: §4.5 steps 1 through 10.
    pub async fn handle_turn(&self, turn: &IncomingTurn) -> anyhow::Result<TurnOutcome> {
        let now = Utc::now();
        let user = self.resolve_user(turn, now).await?;
        self.run_turn(user, turn).await
    }

    /// §4.6 completion dispatch / §6.1 `POST /continue`: the Scheduler
    /// Worker's sole re-entry point into the Agent Loop. The user already
    /// exists (the original `/message` turn created it), so this skips
    /// step 1's platform-link resolution and looks the user up directly by
    /// id instead.
    pub async fn handle_continue(
        &self,
        request: &agentcore_models::ContinueRequest,
    ) -> anyhow::Result<TurnOutcome> {
        let user = self
            .user_repo
            .find_by_id(request.user_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("continue request references unknown user {}", request.user_id))?;

        let turn = IncomingTurn {
            platform: request.platform.clone(),
            platform_user_id: request.user_id.to_string(),
            platform_username: None,
            platform_channel_id: request.platform_channel_id.clone(),
            platform_thread_id: request.platform_thread_id.clone(),
            platform_server_id: None,
            content: request.content.clone(),
            attachments: Vec::new(),
        };
        self.run_turn(user, &turn).await
    }

    /// §4.5 steps 2 through 10, shared by `handle_turn` and `handle_continue`
    /// once a `User` has been resolved by either path.
    async fn run_turn(&self, mut user: User, turn: &IncomingTurn) -> anyhow::Result<TurnOutcome> {
        let now = Utc::now();

        // 2. Budget gate.
        if user.is_over_budget() {
            return Ok(TurnOutcome {
                content: "You've reached your monthly usage budget. It resets automatically."
                    .to_string(),
                files: Vec::new(),
            });
        }

        // 3. Resolve persona.
        let personas = self.persona_repo.list_all().await?;
        let persona = agentcore_models::resolve_persona(
            &personas,
            &turn.platform,
            turn.platform_server_id.as_deref(),
        )
        .cloned();

        // 4. Resolve conversation (with idle-timeout rollover).
        let conversation = self.resolve_conversation(&user, persona.as_ref(), turn, now).await?;

        // 5. Register attachments.
        let attachment_suffix = self.register_attachments(&user, &turn.attachments, now).await?;
        let user_text = format!("{}{attachment_suffix}", turn.content);

        let allowed_modules: Vec<String> = persona.as_ref().map_or_else(
            || self.config.default_guest_modules.clone(),
            |p| p.allowed_modules.iter().cloned().collect(),
        );
        let target_model = persona.as_ref().and_then(|p| p.default_model.clone());
        let target_model = match target_model {
            Some(model) => model,
            None => self.router.resolve("").1,
        };

        let tools = self.tools.tools_for(user.permission_level, &allowed_modules).await;

        // 6. Build context.
        let mut messages = self
            .context_builder
            .build(&user, &conversation, persona.as_ref(), &user_text, &target_model, !tools.is_empty())
            .await?;

        // 7. Persist the user message.
        self.message_repo
            .insert(&Message::text(conversation.id, MessageRole::User, user_text, now))
            .await?;

        // 8. Iterate up to max_agent_iterations.
        let mut final_text = None;
        let mut files = Vec::new();
        for iteration in 0..self.config.max_agent_iterations {
            let tools_arg = if tools.is_empty() { None } else { Some(tools.as_slice()) };
            let result = self
                .router
                .chat(&messages, tools_arg, &target_model, self.config.max_response_tokens, self.config.temperature)
                .await;

            let result = match result {
                Ok(result) => result,
                Err(err) => {
                    warn!(iteration, error = %err, "model call failed for this turn");
                    final_text = Some(
                        "I ran into a problem reaching the model provider. Please try again."
                            .to_string(),
                    );
                    break;
                }
            };

            user.record_usage(result.input_tokens, result.output_tokens);
            self.token_log_repo
                .insert(&TokenLog::new(
                    user.id,
                    conversation.id,
                    result.model_returned.clone(),
                    result.input_tokens,
                    result.output_tokens,
                    0.0,
                    now,
                ))
                .await?;

            if result.is_terminal() {
                let text = result.text.unwrap_or_default();
                self.message_repo
                    .insert(&Message::text(conversation.id, MessageRole::Assistant, text.clone(), now))
                    .await?;
                final_text = Some(text);
                break;
            }

            for call in result.tool_calls {
                let call_payload = ToolCallPayload {
                    name: call.tool_name.clone(),
                    arguments: call.arguments.clone(),
                    tool_use_id: call.tool_use_id.clone(),
                };
                self.message_repo
                    .insert(&Message::tool_call(conversation.id, &call_payload, now))
                    .await?;
                messages.push(ChatMessage {
                    role: ChatRole::ToolCall,
                    content: String::new(),
                    name: Some(call.tool_name.clone()),
                    arguments: Some(call.arguments.clone()),
                    tool_use_id: Some(call.tool_use_id.clone()),
                });

                let invocation = ToolInvocation {
                    tool_use_id: call.tool_use_id.clone(),
                    name: call.tool_name.clone(),
                    arguments: call.arguments.clone(),
                    user_id: Some(user.id),
                };
                let (result_value, error_text) = self.dispatch_tool(invocation).await;

                if error_text.is_none() {
                    if let Some(value) = &result_value {
                        collect_files(value, &mut files);
                    }
                }

                let mut content = error_text.clone().unwrap_or_else(|| {
                    result_value.as_ref().map(ToString::to_string).unwrap_or_default()
                });
                if content.chars().count() > self.config.tool_result_max_chars {
                    let truncated: String =
                        content.chars().take(self.config.tool_result_max_chars).collect();
                    content = format!("{truncated} … [truncated]");
                }

                let result_payload = ToolResultPayload {
                    name: call.tool_name.clone(),
                    result: result_value.clone(),
                    error: error_text,
                    tool_use_id: call.tool_use_id.clone(),
                };
                self.message_repo
                    .insert(&Message::tool_result(conversation.id, &result_payload, now))
                    .await?;
                messages.push(ChatMessage {
                    role: ChatRole::ToolResult,
                    content,
                    name: Some(call.tool_name),
                    arguments: None,
                    tool_use_id: Some(call.tool_use_id),
                });
            }
        }

        self.user_repo.save_budget_state(&user).await?;

        // 9. Bounded-effort fallback if the loop never reached a terminal turn.
        let content = final_text.unwrap_or_else(|| {
            "I wasn't able to finish this within my step budget, so here's what I have so far."
                .to_string()
        });

        // 10. Commit.
        self.conversation_repo.touch(conversation.id, now).await?;

        info!(conversation_id = %conversation.id, user_id = %user.id, "turn complete");

        Ok(TurnOutcome { content, files })
    }

    async fn resolve_user(&self, turn: &IncomingTurn, now: DateTime<Utc>) -> anyhow::Result<User> {
        let existing = self
            .user_repo
            .find_by_platform_link(&turn.platform, &turn.platform_user_id)
            .await?;

        let mut user = match existing {
            Some((user, _link)) => user,
            None => {
                let (user, _link) = self
                    .user_repo
                    .create_guest_with_link(
                        &turn.platform,
                        &turn.platform_user_id,
                        turn.platform_username.as_deref(),
                        self.config.default_guest_token_budget,
                    )
                    .await?;
                user
            }
        };

        if user.needs_budget_reset(now) {
            user.reset_budget_if_due(now);
            self.user_repo.save_budget_state(&user).await?;
        }

        Ok(user)
    }

    async fn resolve_conversation(
        &self,
        user: &User,
        persona: Option<&Persona>,
        turn: &IncomingTurn,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Conversation> {
        let idle_timeout = Duration::minutes(self.config.conversation_timeout_minutes);
        let existing = self
            .conversation_repo
            .find_latest_for_channel(
                user.id,
                &turn.platform,
                &turn.platform_channel_id,
                turn.platform_thread_id.as_deref(),
            )
            .await?;

        if let Some(conversation) = existing {
            if conversation.is_active(now, idle_timeout) {
                return Ok(conversation);
            }
        }

        let conversation = Conversation::new(
            user.id,
            persona.map(|p| p.id),
            turn.platform.clone(),
            turn.platform_channel_id.clone(),
            turn.platform_thread_id.clone(),
            now,
        );
        self.conversation_repo.create(&conversation).await?;
        Ok(conversation)
    }

    async fn register_attachments(
        &self,
        user: &User,
        attachments: &[Attachment],
        now: DateTime<Utc>,
    ) -> anyhow::Result<String> {
        let mut records = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let record = FileRecord::new(
                user.id,
                attachment.filename.clone(),
                attachment.url.clone(),
                attachment.mime_type.clone(),
                now,
            );
            self.file_repo.insert(&record).await?;
            records.push(record);
        }
        Ok(describe_attachments(&records))
    }

    async fn dispatch_tool(
        &self,
        invocation: ToolInvocation,
    ) -> (Option<serde_json::Value>, Option<String>) {
        let tool_name = invocation.name.clone();
        let outcome: ToolExecutionResult = self.tools.execute(invocation).await;
        match outcome {
            Ok(outcome) => (outcome.result, None),
            Err(err) => {
                warn!(tool = %tool_name, error = %err, "tool dispatch failed");
                (None, Some(err.message().to_string()))
            }
        }
    }
}
