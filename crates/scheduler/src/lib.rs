//! Scheduler Worker (§4.6): polls due jobs, evaluates their check condition,
//! and dispatches completion — either a plain notification or a resumed
//! conversation turn back through the orchestrator.

pub mod dispatch;
pub mod evaluator;
pub mod interpolate;
pub mod repository;
pub mod webhook;
pub mod worker;

pub use dispatch::CompletionDispatcher;
pub use evaluator::{CheckOutcome, JobEvaluator};
pub use repository::ScheduledJobRepository;
pub use webhook::verify_signature;
pub use worker::{SchedulerWorker, WebhookOutcome, DEFAULT_LOOP_INTERVAL_SECONDS};
