use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use agentcore_identifiers::{PlatformLinkId, UserId};

use crate::permission::PermissionLevel;

pub const BUDGET_RESET_PERIOD_DAYS: i64 = 30;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub permission_level: PermissionLevel,
    pub monthly_token_budget: Option<i64>,
    pub tokens_used_this_month: i64,
    pub budget_reset_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new_guest(default_guest_token_budget: i64) -> Self {
        Self {
            id: UserId::generate(),
            permission_level: PermissionLevel::Guest,
            monthly_token_budget: Some(default_guest_token_budget),
            tokens_used_this_month: 0,
            budget_reset_at: Utc::now(),
        }
    }

    /// Invariant 2: reset when more than 30 days have elapsed since the last reset.
    #[must_use]
    pub fn needs_budget_reset(&self, now: DateTime<Utc>) -> bool {
        now - self.budget_reset_at > Duration::days(BUDGET_RESET_PERIOD_DAYS)
    }

    pub fn reset_budget_if_due(&mut self, now: DateTime<Utc>) {
        if self.needs_budget_reset(now) {
            self.tokens_used_this_month = 0;
            self.budget_reset_at = now;
        }
    }

    /// Budget gate (§4.5 step 2): a `None` budget means unlimited.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        match self.monthly_token_budget {
            Some(budget) => self.tokens_used_this_month >= budget,
            None => false,
        }
    }

    pub fn record_usage(&mut self, input_tokens: i64, output_tokens: i64) {
        self.tokens_used_this_month += input_tokens + output_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlatformLink {
    pub id: PlatformLinkId,
    pub user_id: UserId,
    pub platform: String,
    pub platform_user_id: String,
    pub platform_username: Option<String>,
}

impl PlatformLink {
    #[must_use]
    pub fn new(user_id: UserId, platform: impl Into<String>, platform_user_id: impl Into<String>) -> Self {
        Self {
            id: PlatformLinkId::generate(),
            user_id,
            platform: platform.into(),
            platform_user_id: platform_user_id.into(),
            platform_username: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_exceeded_gate() {
        let mut user = User::new_guest(100);
        user.record_usage(60, 60);
        assert!(user.is_over_budget());
    }

    #[test]
    fn unlimited_budget_never_exceeded() {
        let mut user = User::new_guest(100);
        user.monthly_token_budget = None;
        user.record_usage(1_000_000, 1_000_000);
        assert!(!user.is_over_budget());
    }

    #[test]
    fn reset_after_30_days() {
        let mut user = User::new_guest(100);
        user.tokens_used_this_month = 90;
        let now = user.budget_reset_at + Duration::days(31);
        assert!(user.needs_budget_reset(now));
        user.reset_budget_if_due(now);
        assert_eq!(user.tokens_used_this_month, 0);
    }

    #[test]
    fn no_reset_within_window() {
        let mut user = User::new_guest(100);
        user.tokens_used_this_month = 90;
        let now = user.budget_reset_at + Duration::days(29);
        user.reset_budget_if_due(now);
        assert_eq!(user.tokens_used_this_month, 90);
    }
}
