use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{ConversationId, PersonaId, UserId};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: ConversationId,
    pub user_id: UserId,
    pub persona_id: Option<PersonaId>,
    pub platform: String,
    pub platform_channel_id: String,
    pub platform_thread_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    pub is_summarized: bool,
    pub title: Option<String>,
}

impl Conversation {
    #[must_use]
    pub fn new(
        user_id: UserId,
        persona_id: Option<PersonaId>,
        platform: impl Into<String>,
        platform_channel_id: impl Into<String>,
        platform_thread_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ConversationId::generate(),
            user_id,
            persona_id,
            platform: platform.into(),
            platform_channel_id: platform_channel_id.into(),
            platform_thread_id,
            started_at: now,
            last_active_at: now,
            is_summarized: false,
            title: None,
        }
    }

    /// Invariant 4: a conversation is still "active" for rollover purposes
    /// when the idle gap since its last activity is within the timeout.
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>, idle_timeout: Duration) -> bool {
        now - self.last_active_at <= idle_timeout
    }

    #[must_use]
    pub fn matches_channel(
        &self,
        platform: &str,
        platform_channel_id: &str,
        platform_thread_id: Option<&str>,
    ) -> bool {
        self.platform == platform
            && self.platform_channel_id == platform_channel_id
            && self.platform_thread_id.as_deref() == platform_thread_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_rollover_boundary() {
        let now = Utc::now();
        let convo = Conversation::new(UserId::generate(), None, "discord", "chan-1", None, now);
        let timeout = Duration::minutes(30);

        assert!(convo.is_active(now + Duration::minutes(29), timeout));
        assert!(!convo.is_active(now + Duration::minutes(31), timeout));
    }

    #[test]
    fn channel_and_thread_must_match_exactly() {
        let now = Utc::now();
        let convo = Conversation::new(
            UserId::generate(),
            None,
            "discord",
            "chan-1",
            Some("thread-1".to_string()),
            now,
        );
        assert!(convo.matches_channel("discord", "chan-1", Some("thread-1")));
        assert!(!convo.matches_channel("discord", "chan-1", None));
        assert!(!convo.matches_channel("discord", "chan-2", Some("thread-1")));
    }
}
