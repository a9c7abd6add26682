use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{ConversationId, TokenLogId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TokenLog {
    pub id: TokenLogId,
    pub user_id: UserId,
    pub conversation_id: ConversationId,
    pub model: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_estimate: f64,
    pub created_at: DateTime<Utc>,
}

impl TokenLog {
    #[must_use]
    pub fn new(
        user_id: UserId,
        conversation_id: ConversationId,
        model: impl Into<String>,
        input_tokens: i64,
        output_tokens: i64,
        cost_estimate: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TokenLogId::generate(),
            user_id,
            conversation_id,
            model: model.into(),
            input_tokens,
            output_tokens,
            cost_estimate,
            created_at: now,
        }
    }

    #[must_use]
    pub const fn total_tokens(&self) -> i64 {
        self.input_tokens + self.output_tokens
    }
}
