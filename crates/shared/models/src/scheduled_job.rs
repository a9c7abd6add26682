use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agentcore_identifiers::{ScheduledJobId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    PollModule,
    Delay,
    PollUrl,
    Webhook,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Active,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OnComplete {
    Notify,
    ResumeConversation,
}

/// Shared by `poll_module` success checks and `poll_url` response-field checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    In,
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
}

impl ConditionOperator {
    /// Evaluate `actual <op> expected`. Numeric operators coerce both sides to
    /// `f64`; on coercion failure the comparison is `false`, never an error
    /// (§4.6 condition operators).
    #[must_use]
    pub fn evaluate(self, actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
        match self {
            Self::Eq => actual == expected,
            Self::Neq => actual != expected,
            Self::In => expected
                .as_array()
                .is_some_and(|values| values.iter().any(|v| v == actual)),
            Self::Contains => match (actual.as_str(), expected.as_str()) {
                (Some(haystack), Some(needle)) => haystack.contains(needle),
                _ => false,
            },
            Self::Gt | Self::Gte | Self::Lt | Self::Lte => {
                Self::numeric_compare(self, actual, expected)
            },
        }
    }

    fn numeric_compare(self, actual: &serde_json::Value, expected: &serde_json::Value) -> bool {
        let (Some(a), Some(b)) = (Self::coerce_f64(actual), Self::coerce_f64(expected)) else {
            return false;
        };
        match self {
            Self::Gt => a > b,
            Self::Gte => a >= b,
            Self::Lt => a < b,
            Self::Lte => a <= b,
            Self::Eq | Self::Neq | Self::In | Self::Contains => unreachable!(),
        }
    }

    fn coerce_f64(value: &serde_json::Value) -> Option<f64> {
        match value {
            serde_json::Value::Number(n) => n.as_f64(),
            serde_json::Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollModuleConfig {
    pub module: String,
    pub tool: String,
    #[serde(default)]
    pub args: serde_json::Value,
    pub success_field: String,
    pub success_values: Vec<String>,
    #[serde(default)]
    pub condition: Option<ConditionOperator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayConfig {
    pub delay_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollUrlConfig {
    pub url: String,
    #[serde(default = "default_http_method")]
    pub method: String,
    pub expected_status: u16,
    #[serde(default)]
    pub response_field: Option<String>,
    #[serde(default)]
    pub response_value: Option<serde_json::Value>,
    #[serde(default)]
    pub response_operator: Option<ConditionOperator>,
}

fn default_http_method() -> String {
    "GET".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WebhookConfig {
    #[serde(default)]
    pub secret: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScheduledJob {
    pub id: ScheduledJobId,
    pub user_id: UserId,
    pub platform: String,
    pub platform_channel_id: String,
    pub platform_thread_id: Option<String>,
    pub job_type: JobType,
    pub check_config: serde_json::Value,
    pub interval_seconds: i64,
    pub max_attempts: i32,
    pub attempts: i32,
    pub on_success_message: String,
    pub on_failure_message: Option<String>,
    pub on_complete: OnComplete,
    pub workflow_id: Option<Uuid>,
    pub status: JobStatus,
    pub next_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ScheduledJob {
    /// Invariant 6: crossing `max_attempts` means failed, not merely "due again".
    #[must_use]
    pub const fn attempts_exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }

    /// Invariant 5: active jobs carry `next_run_at`; terminal ones carry `completed_at`.
    #[must_use]
    pub fn upholds_status_invariant(&self) -> bool {
        match self.status {
            JobStatus::Active => self.next_run_at.is_some() && self.completed_at.is_none(),
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled => {
                self.completed_at.is_some()
            },
        }
    }

    pub fn poll_module_config(&self) -> Result<PollModuleConfig, serde_json::Error> {
        serde_json::from_value(self.check_config.clone())
    }

    pub fn delay_config(&self) -> Result<DelayConfig, serde_json::Error> {
        serde_json::from_value(self.check_config.clone())
    }

    pub fn poll_url_config(&self) -> Result<PollUrlConfig, serde_json::Error> {
        serde_json::from_value(self.check_config.clone())
    }

    pub fn webhook_config(&self) -> Result<WebhookConfig, serde_json::Error> {
        serde_json::from_value(self.check_config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_operator_coercion_failure_is_false_not_panic() {
        let actual = serde_json::json!("not-a-number");
        let expected = serde_json::json!(5);
        assert!(!ConditionOperator::Gt.evaluate(&actual, &expected));
    }

    #[test]
    fn in_operator_checks_membership() {
        let actual = serde_json::json!("completed");
        let expected = serde_json::json!(["completed", "done"]);
        assert!(ConditionOperator::In.evaluate(&actual, &expected));
    }

    #[test]
    fn contains_operator_on_strings() {
        let actual = serde_json::json!("hello world");
        let expected = serde_json::json!("world");
        assert!(ConditionOperator::Contains.evaluate(&actual, &expected));
    }

    #[test]
    fn string_numbers_coerce_for_comparison() {
        let actual = serde_json::json!("42");
        let expected = serde_json::json!(40);
        assert!(ConditionOperator::Gte.evaluate(&actual, &expected));
    }
}
