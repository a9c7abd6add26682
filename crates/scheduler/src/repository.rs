//! `ScheduledJob` persistence, grounded on the teacher's
//! `crates/app/scheduler/src/repository/jobs/mod.rs` (`JobRepository`: a
//! struct wrapping `Arc<PgPool>` with one method per operation).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_identifiers::ScheduledJobId;
use agentcore_models::{JobStatus, ScheduledJob};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

const JOB_COLUMNS: &str = r"
    id, user_id, platform, platform_channel_id, platform_thread_id, job_type,
    check_config, interval_seconds, max_attempts, attempts, on_success_message,
    on_failure_message, on_complete, workflow_id, status, next_run_at, created_at,
    completed_at
";

#[derive(Debug, Clone)]
pub struct ScheduledJobRepository {
    pool: Arc<PgPool>,
}

impl ScheduledJobRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn create(&self, job: &ScheduledJob) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO scheduled_jobs
                (id, user_id, platform, platform_channel_id, platform_thread_id, job_type,
                 check_config, interval_seconds, max_attempts, attempts, on_success_message,
                 on_failure_message, on_complete, workflow_id, status, next_run_at, created_at,
                 completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            ",
        )
        .bind(job.id)
        .bind(job.user_id)
        .bind(&job.platform)
        .bind(&job.platform_channel_id)
        .bind(&job.platform_thread_id)
        .bind(job.job_type)
        .bind(&job.check_config)
        .bind(job.interval_seconds)
        .bind(job.max_attempts)
        .bind(job.attempts)
        .bind(&job.on_success_message)
        .bind(&job.on_failure_message)
        .bind(job.on_complete)
        .bind(job.workflow_id)
        .bind(job.status)
        .bind(job.next_run_at)
        .bind(job.created_at)
        .bind(job.completed_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// §4.6 main loop: jobs due now. Re-read per-job inside the worker's own
    /// scope (via `fetch_for_update`) provides the idempotence guarantee
    /// described in §5, not this listing query itself.
    pub async fn find_due(&self, now: DateTime<Utc>, limit: i64) -> anyhow::Result<Vec<ScheduledJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM scheduled_jobs
             WHERE status = 'active' AND next_run_at <= $1
             ORDER BY next_run_at ASC
             LIMIT $2"
        );
        sqlx::query_as::<_, ScheduledJob>(&query)
            .bind(now)
            .bind(limit)
            .fetch_all(&*self.pool)
            .await
            .map_err(Into::into)
    }

    /// Looks up a job regardless of status, for the `/webhook/{job_id}`
    /// handler (§6.3), which needs to tell a caller "already completed" or
    /// "not found" apart from "not active yet".
    pub async fn find_by_id(&self, id: ScheduledJobId) -> anyhow::Result<Option<ScheduledJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE id = $1");
        sqlx::query_as::<_, ScheduledJob>(&query)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Into::into)
    }

    /// Re-reads a single job's row immediately before acting on it, so a job
    /// already claimed/finalized by a concurrent pass is a no-op here.
    pub async fn fetch_for_update(&self, id: ScheduledJobId) -> anyhow::Result<Option<ScheduledJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE id = $1 AND status = 'active'");
        sqlx::query_as::<_, ScheduledJob>(&query)
            .bind(id)
            .fetch_optional(&*self.pool)
            .await
            .map_err(Into::into)
    }

    pub async fn increment_attempts(&self, id: ScheduledJobId) -> anyhow::Result<()> {
        sqlx::query("UPDATE scheduled_jobs SET attempts = attempts + 1 WHERE id = $1")
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    pub async fn reschedule(&self, id: ScheduledJobId, next_run_at: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE scheduled_jobs SET next_run_at = $1 WHERE id = $2")
            .bind(next_run_at)
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Invariant 5: terminal statuses carry `completed_at`, never `next_run_at`.
    pub async fn finalize(
        &self,
        id: ScheduledJobId,
        status: JobStatus,
        completed_at: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "UPDATE scheduled_jobs SET status = $1, completed_at = $2, next_run_at = NULL WHERE id = $3",
        )
        .bind(status)
        .bind(completed_at)
        .bind(id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_workflow(&self, workflow_id: Uuid) -> anyhow::Result<Vec<ScheduledJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM scheduled_jobs WHERE workflow_id = $1 AND status = 'active'"
        );
        sqlx::query_as::<_, ScheduledJob>(&query)
            .bind(workflow_id)
            .fetch_all(&*self.pool)
            .await
            .map_err(Into::into)
    }

    /// §4.6 workflow cancellation: every active member sharing `workflow_id`
    /// transitions to `cancelled`.
    pub async fn cancel_workflow(&self, workflow_id: Uuid, now: DateTime<Utc>) -> anyhow::Result<u64> {
        let result = sqlx::query(
            r"
            UPDATE scheduled_jobs
            SET status = 'cancelled', completed_at = $1, next_run_at = NULL
            WHERE workflow_id = $2 AND status = 'active'
            ",
        )
        .bind(now)
        .bind(workflow_id)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
