pub mod conversation;
pub mod file_record;
pub mod memory;
pub mod message;
pub mod permission;
pub mod persona;
pub mod scheduled_job;
pub mod token_log;
pub mod user;
pub mod wire;

pub use conversation::Conversation;
pub use file_record::{describe_attachments, FileRecord};
pub use memory::{MemorySummary, RankedMemory};
pub use message::{Message, MessageContent, MessageRole, ToolCallPayload, ToolResultPayload};
pub use permission::PermissionLevel;
pub use persona::{resolve_persona, Persona, PersonaBinding};
pub use scheduled_job::{
    ConditionOperator, DelayConfig, JobStatus, JobType, OnComplete, PollModuleConfig,
    PollUrlConfig, ScheduledJob, WebhookConfig,
};
pub use token_log::TokenLog;
pub use user::{PlatformLink, User, BUDGET_RESET_PERIOD_DAYS};
pub use wire::{
    summarize_result_data, AgentResponse, Attachment, ContinueRequest, HealthResponse,
    IncomingMessage, ModuleManifest, Notification, OutputFile, ToolCallRequest, ToolCallResponse,
    ToolSpec, RESULT_DATA_WHITELIST,
};
