//! Semantic memory persistence (§3, §4.4 step 4, §9 "vector similarity
//! below a relevance floor" — the threshold is applied inside the query).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_identifiers::UserId;
use agentcore_models::{MemorySummary, RankedMemory};
use pgvector::Vector;
use sqlx::{PgPool, Row};

#[derive(Debug, Clone)]
pub struct MemoryRepository {
    pool: Arc<PgPool>,
}

impl MemoryRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    /// Cosine-distance search, `distance < relevance_threshold`, capped at
    /// `limit`. The threshold is a `WHERE` clause, not a post-filter, so
    /// fewer-than-`limit` results never pad themselves with irrelevant rows.
    pub async fn search(
        &self,
        user_id: UserId,
        query_embedding: &[f32],
        relevance_threshold: f32,
        limit: i64,
    ) -> anyhow::Result<Vec<RankedMemory>> {
        let vector = Vector::from(query_embedding.to_vec());
        let rows = sqlx::query(
            r"
            SELECT id, user_id, conversation_id, summary, embedding, created_at,
                   (embedding <=> $2) as distance
            FROM memory_summaries
            WHERE user_id = $1 AND (embedding <=> $2) < $3
            ORDER BY embedding <=> $2
            LIMIT $4
            ",
        )
        .bind(user_id)
        .bind(vector)
        .bind(relevance_threshold)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let embedding: Vector = row.try_get("embedding")?;
                Ok(RankedMemory {
                    memory: MemorySummary {
                        id: row.try_get("id")?,
                        user_id: row.try_get("user_id")?,
                        conversation_id: row.try_get("conversation_id")?,
                        summary: row.try_get("summary")?,
                        embedding: embedding.to_vec(),
                        created_at: row.try_get("created_at")?,
                    },
                    distance: row.try_get::<f64, _>("distance")? as f32,
                })
            })
            .collect()
    }

    pub async fn insert(&self, memory: &MemorySummary) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO memory_summaries (id, user_id, conversation_id, summary, embedding, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ",
        )
        .bind(memory.id)
        .bind(memory.user_id)
        .bind(memory.conversation_id)
        .bind(&memory.summary)
        .bind(Vector::from(memory.embedding.clone()))
        .bind(memory.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}
