//! `AppContext` (§10 of `SPEC_FULL.md`): the single wiring point that turns
//! an `AppConfig` into every repository, the Model Router, Tool Registry,
//! Notification Bus, Agent Loop and Scheduler Worker `bin/orchestrator`
//! needs. Grounded on the teacher's `crates/app/runtime/src/context.rs`
//! `AppContext` shape, simplified to a single async constructor rather than
//! a separate builder type since this core has far fewer optional
//! subsystems (no extension registry, no geoip, no content routing) to
//! stage through a builder.

use std::sync::Arc;

use agentcore_agent::{
    AgentLoop, AgentLoopConfig, ContextBuilder, ContextBuilderConfig, EnglishHeuristicClassifier,
    CharHeuristicEstimator, NoProjectContext,
};
use agentcore_agent::repository::{
    ConversationRepository, FileRepository, MemoryRepository, MessageRepository,
    PersonaRepository, TokenLogRepository, UserRepository,
};
use agentcore_config::AppConfig;
use agentcore_database::DbPool;
use agentcore_events::NotificationBus;
use agentcore_providers::{build_providers, parse_fallback_chain, ModelRouter, RouterConfig};
use agentcore_scheduler::{CompletionDispatcher, JobEvaluator, ScheduledJobRepository, SchedulerWorker};
use agentcore_tools::{spawn_resync_loop, ManifestCache, ToolRegistry};
use agentcore_traits::NotificationPublisher;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: DbPool,
    pub router: Arc<ModelRouter>,
    pub tools: Arc<ToolRegistry>,
    pub notifications: Arc<NotificationBus>,
    pub agent_loop: Arc<AgentLoop>,
    pub scheduler: Arc<SchedulerWorker>,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &"AppConfig")
            .field("db", &"DbPool")
            .field("router", &"ModelRouter")
            .field("tools", &"ToolRegistry")
            .finish_non_exhaustive()
    }
}

impl AppContext {
    /// Builds every subsystem from one loaded `AppConfig`. Fails fast if the
    /// database or Redis can't be reached — both are required for every
    /// code path past `GET /health`.
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        config.validate_production()?;
        let config = Arc::new(config);

        let db = DbPool::connect(&config.database_url).await?;

        let notifications = Arc::new(NotificationBus::connect(&config.redis_url).await?);
        let manifest_cache = ManifestCache::connect(&config.redis_url).await.ok();

        let providers = build_providers(&config);
        let router_config = RouterConfig {
            default_model: config.default_model.clone(),
            embedding_model: config.embedding_model.clone(),
            fallback_chain: parse_fallback_chain(&config.fallback_chain),
        };
        let router = Arc::new(ModelRouter::new(providers, router_config));

        let tools = Arc::new(ToolRegistry::new(
            config.module_urls.clone(),
            config.slow_modules.clone(),
            config.tool_execution_timeout_secs,
            manifest_cache,
        ));
        tools.warm_from_cache().await;
        spawn_resync_loop(Arc::clone(&tools));

        let user_repo = Arc::new(UserRepository::new(&db)?);
        let persona_repo = Arc::new(PersonaRepository::new(&db)?);
        let conversation_repo = Arc::new(ConversationRepository::new(&db)?);
        let message_repo = Arc::new(MessageRepository::new(&db)?);
        let token_log_repo = Arc::new(TokenLogRepository::new(&db)?);
        let memory_repo = Arc::new(MemoryRepository::new(&db)?);
        let file_repo = Arc::new(FileRepository::new(&db)?);

        let context_builder = Arc::new(ContextBuilder::new(
            Arc::clone(&conversation_repo),
            Arc::clone(&message_repo),
            Arc::clone(&memory_repo),
            Arc::clone(&router),
            Arc::new(EnglishHeuristicClassifier),
            Arc::new(CharHeuristicEstimator),
            Arc::new(NoProjectContext),
            ContextBuilderConfig {
                working_memory_messages: config.working_memory_messages,
                minimal_memory_messages: config.minimal_memory_messages,
                memory_relevance_threshold: config.memory_relevance_threshold,
                history_tool_result_max_chars: config.history_tool_result_max_chars,
                tool_schema_token_budget: config.tool_schema_token_budget,
            },
        ));

        let agent_loop = Arc::new(AgentLoop::new(
            Arc::clone(&user_repo),
            Arc::clone(&persona_repo),
            Arc::clone(&conversation_repo),
            Arc::clone(&message_repo),
            Arc::clone(&token_log_repo),
            Arc::clone(&file_repo),
            context_builder,
            Arc::clone(&router),
            Arc::clone(&tools),
            AgentLoopConfig {
                max_agent_iterations: config.max_agent_iterations,
                conversation_timeout_minutes: config.conversation_timeout_minutes,
                tool_result_max_chars: config.tool_result_max_chars,
                default_guest_token_budget: config.default_guest_token_budget,
                default_guest_modules: config.default_guest_modules.clone(),
                max_response_tokens: DEFAULT_MAX_RESPONSE_TOKENS,
                temperature: DEFAULT_TEMPERATURE,
            },
        ));

        let job_repo = Arc::new(ScheduledJobRepository::new(&db)?);
        let evaluator = Arc::new(JobEvaluator::new(Arc::clone(&tools)));
        let publisher: Arc<dyn NotificationPublisher> = Arc::clone(&notifications);
        let dispatcher = Arc::new(CompletionDispatcher::new(
            publisher,
            config.orchestrator_url.clone(),
            config.service_auth_token.clone(),
        ));
        let scheduler = Arc::new(SchedulerWorker::new(
            job_repo,
            evaluator,
            dispatcher,
            agentcore_scheduler::DEFAULT_LOOP_INTERVAL_SECONDS,
        ));

        Ok(Self { config, db, router, tools, notifications, agent_loop, scheduler })
    }

    /// Spawns the Scheduler Worker's main loop as its own task; intended to
    /// run alongside the HTTP server for the lifetime of the process.
    #[must_use]
    pub fn spawn_scheduler(&self) -> tokio::task::JoinHandle<()> {
        let scheduler = Arc::clone(&self.scheduler);
        tokio::spawn(async move {
            scheduler.run().await;
        })
    }
}

/// `spec.md` names `max_tokens`/`temperature` as per-request provider
/// parameters (§4.1) but doesn't add them to §6.6's environment list;
/// these are fixed at sane defaults rather than over-parameterizing config
/// for knobs the spec never asks to be tunable.
const DEFAULT_MAX_RESPONSE_TOKENS: u32 = 4096;
const DEFAULT_TEMPERATURE: f32 = 0.7;
