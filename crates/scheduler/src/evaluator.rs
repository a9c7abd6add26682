//! Per-job-type check evaluation (§4.6): `poll_module` dispatches a tool
//! call, `delay` checks wall-clock elapsed time, `poll_url` hits an external
//! HTTP endpoint, `webhook` never polls — it's driven by the inbound route.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use agentcore_models::{ConditionOperator, DelayConfig, JobType, PollModuleConfig, PollUrlConfig, ScheduledJob};
use agentcore_traits::{ToolExecutor, ToolInvocation};
use agentcore_tools::ToolRegistry;
use chrono::{Duration, Utc};
use reqwest::Client;

use crate::interpolate::resolve_path;

/// Outcome of evaluating a job's check this tick.
pub enum CheckOutcome {
    /// Condition met: job is done. Carries the raw result value for
    /// placeholder interpolation in the completion message.
    Met(Option<serde_json::Value>),
    /// Condition not yet met; try again at the next interval.
    NotMet,
    /// The module/endpoint reported the check itself is impossible (e.g.
    /// "unknown tool") — §4.6/§7: permanent, do not retry.
    PermanentError(String),
    /// Network blip, timeout, 5xx, etc — retry until `max_attempts`.
    TransientError(String),
}

pub struct JobEvaluator {
    tools: Arc<ToolRegistry>,
    http: Client,
}

impl JobEvaluator {
    #[must_use]
    pub fn new(tools: Arc<ToolRegistry>) -> Self {
        Self { tools, http: Client::new() }
    }

    pub async fn evaluate(&self, job: &ScheduledJob) -> CheckOutcome {
        match job.job_type {
            JobType::PollModule => self.evaluate_poll_module(job).await,
            JobType::Delay => Self::evaluate_delay(job),
            JobType::PollUrl => self.evaluate_poll_url(job).await,
            JobType::Webhook => CheckOutcome::NotMet,
        }
    }

    async fn evaluate_poll_module(&self, job: &ScheduledJob) -> CheckOutcome {
        let config: PollModuleConfig = match job.poll_module_config() {
            Ok(config) => config,
            Err(e) => return CheckOutcome::PermanentError(format!("malformed poll_module config: {e}")),
        };

        let invocation = ToolInvocation {
            tool_use_id: job.id.to_string(),
            name: config.tool.clone(),
            arguments: config.args.clone(),
            user_id: Some(job.user_id),
        };

        let outcome = match self.tools.execute(invocation).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_permanent() => {
                return CheckOutcome::PermanentError(err.message().to_string());
            }
            Err(err) => return CheckOutcome::TransientError(err.message().to_string()),
        };

        let Some(result) = &outcome.result else {
            return CheckOutcome::NotMet;
        };
        let Some(actual) = result.get(&config.success_field) else {
            return CheckOutcome::NotMet;
        };

        let operator = config.condition.unwrap_or(ConditionOperator::In);
        let expected = serde_json::json!(config.success_values);
        if operator.evaluate(actual, &expected) {
            CheckOutcome::Met(Some(result.clone()))
        } else {
            CheckOutcome::NotMet
        }
    }

    fn evaluate_delay(job: &ScheduledJob) -> CheckOutcome {
        let config: DelayConfig = match job.delay_config() {
            Ok(config) => config,
            Err(e) => return CheckOutcome::PermanentError(format!("malformed delay config: {e}")),
        };
        let due_at = job.created_at + Duration::seconds(config.delay_seconds);
        if Utc::now() >= due_at {
            CheckOutcome::Met(None)
        } else {
            CheckOutcome::NotMet
        }
    }

    async fn evaluate_poll_url(&self, job: &ScheduledJob) -> CheckOutcome {
        let config: PollUrlConfig = match job.poll_url_config() {
            Ok(config) => config,
            Err(e) => return CheckOutcome::PermanentError(format!("malformed poll_url config: {e}")),
        };

        let method = match config.method.to_ascii_uppercase().as_str() {
            "POST" => reqwest::Method::POST,
            "PUT" => reqwest::Method::PUT,
            _ => reqwest::Method::GET,
        };

        let response = match self
            .http
            .request(method, &config.url)
            .timeout(StdDuration::from_secs(30))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return CheckOutcome::TransientError(e.to_string()),
        };

        let status = response.status().as_u16();
        if status != config.expected_status {
            return CheckOutcome::NotMet;
        }

        let Some(field) = &config.response_field else {
            return CheckOutcome::Met(None);
        };

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(e) => return CheckOutcome::TransientError(format!("malformed poll_url response: {e}")),
        };

        let Some(actual) = resolve_path(&body, field) else {
            return CheckOutcome::NotMet;
        };
        let operator = config.response_operator.unwrap_or(ConditionOperator::Eq);
        let expected = config.response_value.clone().unwrap_or(serde_json::Value::Null);
        if operator.evaluate(actual, &expected) {
            CheckOutcome::Met(Some(body))
        } else {
            CheckOutcome::NotMet
        }
    }
}
