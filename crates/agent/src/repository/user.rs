//! User + PlatformLink persistence (§3, §4.5 step 1), grounded on the
//! teacher's `JobRepository` shape (`app/scheduler/src/repository/jobs/mod.rs`):
//! a thin struct wrapping `Arc<PgPool>`, one method per operation.
//!
//! Runtime-checked queries (`sqlx::query_as` + `.bind`) are used instead of
//! the teacher's `query!`/`query_as!` macros, which require a live database
//! or an offline `.sqlx` cache at compile time — unavailable in this build.

use std::sync::Arc;

use agentcore_database::DbPool;
use agentcore_identifiers::UserId;
use agentcore_models::{PermissionLevel, PlatformLink, User};
use sqlx::PgPool;

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: Arc<PgPool>,
}

impl UserRepository {
    pub fn new(db: &DbPool) -> anyhow::Result<Self> {
        Ok(Self { pool: db.pool_arc()? })
    }

    pub async fn find_by_platform_link(
        &self,
        platform: &str,
        platform_user_id: &str,
    ) -> anyhow::Result<Option<(User, PlatformLink)>> {
        let row = sqlx::query(
            r"
            SELECT u.id as user_id, u.permission_level, u.monthly_token_budget,
                   u.tokens_used_this_month, u.budget_reset_at,
                   l.id as link_id, l.platform_username
            FROM platform_links l
            JOIN users u ON u.id = l.user_id
            WHERE l.platform = $1 AND l.platform_user_id = $2
            ",
        )
        .bind(platform)
        .bind(platform_user_id)
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        use sqlx::Row;

        let user = User {
            id: row.try_get("user_id")?,
            permission_level: row.try_get("permission_level")?,
            monthly_token_budget: row.try_get("monthly_token_budget")?,
            tokens_used_this_month: row.try_get("tokens_used_this_month")?,
            budget_reset_at: row.try_get("budget_reset_at")?,
        };
        let link = PlatformLink {
            id: row.try_get("link_id")?,
            user_id: user.id,
            platform: platform.to_string(),
            platform_user_id: platform_user_id.to_string(),
            platform_username: row.try_get("platform_username")?,
        };
        Ok(Some((user, link)))
    }

    pub async fn create_guest_with_link(
        &self,
        platform: &str,
        platform_user_id: &str,
        platform_username: Option<&str>,
        default_guest_token_budget: i64,
    ) -> anyhow::Result<(User, PlatformLink)> {
        let user = User::new_guest(default_guest_token_budget);
        sqlx::query(
            r"
            INSERT INTO users (id, permission_level, monthly_token_budget, tokens_used_this_month, budget_reset_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(user.id)
        .bind(user.permission_level)
        .bind(user.monthly_token_budget)
        .bind(user.tokens_used_this_month)
        .bind(user.budget_reset_at)
        .execute(&*self.pool)
        .await?;

        let mut link = PlatformLink::new(user.id, platform, platform_user_id);
        link.platform_username = platform_username.map(str::to_string);
        sqlx::query(
            r"
            INSERT INTO platform_links (id, user_id, platform, platform_user_id, platform_username)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(link.id)
        .bind(link.user_id)
        .bind(&link.platform)
        .bind(&link.platform_user_id)
        .bind(&link.platform_username)
        .execute(&*self.pool)
        .await?;

        Ok((user, link))
    }

    pub async fn update_platform_username(&self, link_id: agentcore_identifiers::PlatformLinkId, username: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE platform_links SET platform_username = $1 WHERE id = $2")
            .bind(username)
            .bind(link_id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    /// Persists the budget-gate mutations from §4.5 step 1/2/8: reset window
    /// and usage accounting.
    pub async fn save_budget_state(&self, user: &User) -> anyhow::Result<()> {
        sqlx::query(
            r"
            UPDATE users
            SET tokens_used_this_month = $1, budget_reset_at = $2
            WHERE id = $3
            ",
        )
        .bind(user.tokens_used_this_month)
        .bind(user.budget_reset_at)
        .bind(user.id)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    pub async fn find_by_id(&self, user_id: UserId) -> anyhow::Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, permission_level, monthly_token_budget, tokens_used_this_month, budget_reset_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&*self.pool)
        .await?;

        let Some(row) = row else { return Ok(None) };
        use sqlx::Row;
        Ok(Some(User {
            id: row.try_get("id")?,
            permission_level: row.try_get::<PermissionLevel, _>("permission_level")?,
            monthly_token_budget: row.try_get("monthly_token_budget")?,
            tokens_used_this_month: row.try_get("tokens_used_this_month")?,
            budget_reset_at: row.try_get("budget_reset_at")?,
        }))
    }
}
