//! Message persistence (§3, §4.4 step 7, §4.5 step 7/8).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_identifiers::ConversationId;
use agentcore_models::Message;
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: Arc<PgPool>,
}

impl MessageRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn insert(&self, message: &Message) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO messages (id, conversation_id, role, content, token_count, model_used, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ",
        )
        .bind(message.id)
        .bind(message.conversation_id)
        .bind(message.role)
        .bind(&message.content)
        .bind(message.token_count)
        .bind(&message.model_used)
        .bind(message.created_at)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    /// Most recent `limit` messages, oldest first (§4.4 step 7).
    pub async fn recent(&self, conversation_id: ConversationId, limit: i64) -> anyhow::Result<Vec<Message>> {
        let mut rows = sqlx::query_as::<_, Message>(
            r"
            SELECT id, conversation_id, role, content, token_count, model_used, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(conversation_id)
        .bind(limit)
        .fetch_all(&*self.pool)
        .await?;
        rows.reverse();
        Ok(rows)
    }
}
