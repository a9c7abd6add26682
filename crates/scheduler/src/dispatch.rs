//! Completion dispatch (§4.6): `notify` publishes to the notification bus;
//! `resume_conversation` re-enters the Agent Loop via the orchestrator's
//! `POST /continue`, falling back to a plain notification if that fails.

use std::sync::Arc;

use agentcore_models::{summarize_result_data, ContinueRequest, Notification, OnComplete, ScheduledJob};
use agentcore_traits::NotificationPublisher;
use reqwest::Client;

const CONTINUATION_PREFIX: &str = "[Automated workflow continuation — job";

pub struct CompletionDispatcher {
    publisher: Arc<dyn NotificationPublisher>,
    http: Client,
    orchestrator_url: String,
    service_auth_token: String,
}

impl CompletionDispatcher {
    #[must_use]
    pub fn new(
        publisher: Arc<dyn NotificationPublisher>,
        orchestrator_url: String,
        service_auth_token: String,
    ) -> Self {
        Self { publisher, http: Client::new(), orchestrator_url, service_auth_token }
    }

    pub async fn dispatch(
        &self,
        job: &ScheduledJob,
        message: String,
        result_data: Option<serde_json::Value>,
    ) {
        match job.on_complete {
            OnComplete::Notify => {
                if let Err(e) = self.notify(job, message).await {
                    tracing::warn!(job_id = %job.id, error = %e, "failed to publish completion notification");
                }
            }
            OnComplete::ResumeConversation => {
                self.resume_conversation(job, message, result_data).await;
            }
        }
    }

    async fn notify(&self, job: &ScheduledJob, content: String) -> anyhow::Result<()> {
        self.publisher
            .publish(Notification {
                platform: job.platform.clone(),
                channel: job.platform_channel_id.clone(),
                thread: job.platform_thread_id.clone(),
                content,
                user_id: job.user_id,
                job_id: Some(job.id),
            })
            .await
    }

    async fn resume_conversation(
        &self,
        job: &ScheduledJob,
        message: String,
        result_data: Option<serde_json::Value>,
    ) {
        let content = format!("{CONTINUATION_PREFIX} {}] {message}", job.id);
        let summarized = result_data.as_ref().map(summarize_result_data);
        let request = ContinueRequest {
            platform: job.platform.clone(),
            platform_channel_id: job.platform_channel_id.clone(),
            platform_thread_id: job.platform_thread_id.clone(),
            user_id: job.user_id,
            content,
            job_id: Some(job.id),
            workflow_id: job.workflow_id,
            result_data: summarized,
        };

        let response = self
            .http
            .post(format!("{}/continue", self.orchestrator_url))
            .bearer_auth(&self.service_auth_token)
            .json(&request)
            .send()
            .await;

        let failed = match response {
            Ok(response) if response.status().is_success() => false,
            Ok(response) => {
                tracing::warn!(job_id = %job.id, status = %response.status(), "/continue returned failure");
                true
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "/continue request failed");
                true
            }
        };

        if failed {
            let fallback = format!("{message}\n\n(Automatic follow-up failed — the conversation wasn't resumed.)");
            if let Err(e) = self.notify(job, fallback).await {
                tracing::warn!(job_id = %job.id, error = %e, "fallback notification after /continue failure also failed");
            }
        }
    }
}
