//! Redis pub/sub notification bus (§4.7, §6.4).
//!
//! Publish-only from the Scheduler Worker's perspective; external chat
//! adapters subscribe to `notifications:<platform>` and are out of scope here.

use agentcore_models::Notification;
use agentcore_traits::NotificationPublisher;
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

#[derive(Clone)]
pub struct NotificationBus {
    conn: ConnectionManager,
}

impl std::fmt::Debug for NotificationBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationBus").finish_non_exhaustive()
    }
}

impl NotificationBus {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }

    fn channel_for(platform: &str) -> String {
        format!("notifications:{platform}")
    }
}

#[async_trait]
impl NotificationPublisher for NotificationBus {
    async fn publish(&self, notification: Notification) -> anyhow::Result<()> {
        let channel = Self::channel_for(&notification.platform);
        let payload = serde_json::to_string(&notification)?;

        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(&channel, payload).await?;

        tracing::info!(channel = %channel, job_id = ?notification.job_id, "notification published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_name_follows_platform_convention() {
        assert_eq!(NotificationBus::channel_for("discord"), "notifications:discord");
    }
}
