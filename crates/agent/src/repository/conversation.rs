//! Conversation persistence (§3, §4.5 step 4, Invariant 4/Testable Property 4).

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_identifiers::{ConversationId, UserId};
use agentcore_models::Conversation;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: Arc<PgPool>,
}

impl ConversationRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    /// Finds the most recently active conversation for this channel/thread,
    /// regardless of idle-timeout — the caller applies `Conversation::is_active`.
    pub async fn find_latest_for_channel(
        &self,
        user_id: UserId,
        platform: &str,
        platform_channel_id: &str,
        platform_thread_id: Option<&str>,
    ) -> anyhow::Result<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            r"
            SELECT id, user_id, persona_id, platform, platform_channel_id, platform_thread_id,
                   started_at, last_active_at, is_summarized, title
            FROM conversations
            WHERE user_id = $1 AND platform = $2 AND platform_channel_id = $3
              AND platform_thread_id IS NOT DISTINCT FROM $4
            ORDER BY last_active_at DESC
            LIMIT 1
            ",
        )
        .bind(user_id)
        .bind(platform)
        .bind(platform_channel_id)
        .bind(platform_thread_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn create(&self, conversation: &Conversation) -> anyhow::Result<()> {
        sqlx::query(
            r"
            INSERT INTO conversations
                (id, user_id, persona_id, platform, platform_channel_id, platform_thread_id,
                 started_at, last_active_at, is_summarized, title)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ",
        )
        .bind(conversation.id)
        .bind(conversation.user_id)
        .bind(conversation.persona_id)
        .bind(&conversation.platform)
        .bind(&conversation.platform_channel_id)
        .bind(&conversation.platform_thread_id)
        .bind(conversation.started_at)
        .bind(conversation.last_active_at)
        .bind(conversation.is_summarized)
        .bind(&conversation.title)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn touch(&self, conversation_id: ConversationId, now: DateTime<Utc>) -> anyhow::Result<()> {
        sqlx::query("UPDATE conversations SET last_active_at = $1 WHERE id = $2")
            .bind(now)
            .bind(conversation_id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    pub async fn latest_summary(&self, conversation_id: ConversationId) -> anyhow::Result<Option<String>> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT summary FROM memory_summaries WHERE conversation_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(conversation_id)
        .fetch_optional(&*self.pool)
        .await?;
        Ok(row.map(|(s,)| s))
    }
}
