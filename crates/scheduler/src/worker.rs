//! The Scheduler Worker main loop (§4.6), grounded on the teacher's
//! `crates/app/scheduler/src/worker.rs` poll-and-dispatch shape.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use agentcore_identifiers::ScheduledJobId;
use agentcore_models::{JobStatus, JobType, ScheduledJob};
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::dispatch::CompletionDispatcher;
use crate::evaluator::{CheckOutcome, JobEvaluator};
use crate::interpolate::interpolate;
use crate::repository::ScheduledJobRepository;

/// §4.6: the worker polls every ten seconds by default.
pub const DEFAULT_LOOP_INTERVAL_SECONDS: u64 = 10;
const BATCH_SIZE: i64 = 50;

pub struct SchedulerWorker {
    repo: Arc<ScheduledJobRepository>,
    evaluator: Arc<JobEvaluator>,
    dispatcher: Arc<CompletionDispatcher>,
    loop_interval: StdDuration,
}

impl SchedulerWorker {
    #[must_use]
    pub fn new(
        repo: Arc<ScheduledJobRepository>,
        evaluator: Arc<JobEvaluator>,
        dispatcher: Arc<CompletionDispatcher>,
        loop_interval_seconds: u64,
    ) -> Self {
        Self {
            repo,
            evaluator,
            dispatcher,
            loop_interval: StdDuration::from_secs(loop_interval_seconds),
        }
    }

    /// Runs forever, ticking every `loop_interval`. Intended to be spawned
    /// as its own task alongside the HTTP server in `bin/orchestrator`.
    pub async fn run(&self) -> ! {
        let mut ticker = tokio::time::interval(self.loop_interval);
        loop {
            ticker.tick().await;
            if let Err(e) = self.tick().await {
                tracing::warn!(error = %e, "scheduler tick failed");
            }
        }
    }

    async fn tick(&self) -> anyhow::Result<()> {
        let due = self.repo.find_due(Utc::now(), BATCH_SIZE).await?;
        for job in due {
            self.process_job(job.id).await;
        }
        Ok(())
    }

    /// Re-reads the job's row inside this per-job scope so a job already
    /// finalized by a concurrent worker instance is skipped (§5).
    async fn process_job(&self, job_id: ScheduledJobId) {
        let job = match self.repo.fetch_for_update(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(job_id = %job_id, error = %e, "failed to re-read job before processing");
                return;
            }
        };

        if let Err(e) = self.repo.increment_attempts(job.id).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to increment attempts");
            return;
        }
        let attempts = job.attempts + 1;

        let outcome = self.evaluator.evaluate(&job).await;
        let now = Utc::now();

        match outcome {
            CheckOutcome::Met(result) => {
                let message = interpolate(&job.on_success_message, result.as_ref(), job.id, job.workflow_id);
                if let Err(e) = self.repo.finalize(job.id, JobStatus::Completed, now).await {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to mark job completed");
                    return;
                }
                self.dispatcher.dispatch(&job, message, result).await;
            }
            CheckOutcome::NotMet => {
                if attempts >= job.max_attempts {
                    self.fail_job(&job, now, None).await;
                } else {
                    let next_run_at = now + Duration::seconds(job.interval_seconds);
                    if let Err(e) = self.repo.reschedule(job.id, next_run_at).await {
                        tracing::warn!(job_id = %job.id, error = %e, "failed to reschedule job");
                    }
                }
            }
            CheckOutcome::PermanentError(message) => {
                self.fail_job(&job, now, Some(message)).await;
            }
            CheckOutcome::TransientError(message) => {
                tracing::warn!(job_id = %job.id, error = %message, "transient check error, will retry");
                if attempts >= job.max_attempts {
                    self.fail_job(&job, now, Some(message)).await;
                } else {
                    let next_run_at = now + Duration::seconds(job.interval_seconds);
                    if let Err(e) = self.repo.reschedule(job.id, next_run_at).await {
                        tracing::warn!(job_id = %job.id, error = %e, "failed to reschedule job");
                    }
                }
            }
        }
    }

    async fn fail_job(&self, job: &ScheduledJob, now: DateTime<Utc>, reason: Option<String>) {
        if let Err(e) = self.repo.finalize(job.id, JobStatus::Failed, now).await {
            tracing::warn!(job_id = %job.id, error = %e, "failed to mark job failed");
            return;
        }
        let template = job
            .on_failure_message
            .clone()
            .unwrap_or_else(|| "The task didn't complete in time.".to_string());
        let message = interpolate(&template, None, job.id, job.workflow_id);
        let message = match reason {
            Some(reason) => format!("{message} ({reason})"),
            None => message,
        };
        self.dispatcher.dispatch(job, message, None).await;
    }

    /// §4.6: cancels every active job sharing `workflow_id`.
    pub async fn cancel_workflow(&self, workflow_id: Uuid) -> anyhow::Result<u64> {
        self.repo.cancel_workflow(workflow_id, Utc::now()).await
    }

    /// §6.3 `POST /webhook/{job_id}`: a `webhook` job is externally driven
    /// rather than polled, so `JobEvaluator` never reports it `Met` on its
    /// own — the HTTP handler finalizes it directly here, after signature
    /// verification, following the same finalize-then-dispatch shape as
    /// `process_job`'s `Met` branch.
    pub async fn complete_webhook(
        &self,
        job_id: ScheduledJobId,
        payload: Option<serde_json::Value>,
    ) -> anyhow::Result<WebhookOutcome> {
        let Some(job) = self.repo.find_by_id(job_id).await? else {
            return Ok(WebhookOutcome::NotFound);
        };
        if job.job_type != JobType::Webhook {
            return Ok(WebhookOutcome::WrongJobType);
        }
        if job.status != JobStatus::Active {
            return Ok(WebhookOutcome::NotActive);
        }

        let message = interpolate(&job.on_success_message, payload.as_ref(), job.id, job.workflow_id);
        self.repo.finalize(job.id, JobStatus::Completed, Utc::now()).await?;
        self.dispatcher.dispatch(&job, message, payload).await;
        Ok(WebhookOutcome::Completed)
    }

    /// For signature verification, the handler needs the job's
    /// `check_config` before deciding whether to call `complete_webhook`.
    pub async fn find_job(&self, job_id: ScheduledJobId) -> anyhow::Result<Option<ScheduledJob>> {
        self.repo.find_by_id(job_id).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookOutcome {
    Completed,
    NotFound,
    NotActive,
    WrongJobType,
}
