//! TokenLog persistence (§3, Testable Property 3).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_models::TokenLog;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct TokenLogRepository {
    pool: Arc<PgPool>,
}

impl TokenLogRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn insert(&self, log: &TokenLog) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO token_logs (id, user_id, conversation_id, model, input_tokens, output_tokens, cost_estimate, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ",
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(log.conversation_id)
        .bind(&log.model)
        .bind(log.input_tokens)
        .bind(log.output_tokens)
        .bind(log.cost_estimate)
        .bind(log.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}
