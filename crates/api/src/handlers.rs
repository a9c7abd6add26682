//! Route handlers for §6.1 (orchestrator endpoints) and §6.3
//! (`/webhook/{job_id}`).

use axum::extract::{Path, State};
use bytes::Bytes;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use agentcore_agent::IncomingTurn;
use agentcore_identifiers::ScheduledJobId;
use agentcore_models::{AgentResponse, ContinueRequest, HealthResponse, IncomingMessage, Notification};
use agentcore_runtime::AppContext;
use agentcore_scheduler::WebhookOutcome;
use agentcore_traits::NotificationPublisher;

use crate::error::ApiError;

/// `POST /message` (§6.1): the entry point every chat adapter calls.
pub async fn message(
    State(ctx): State<AppContext>,
    Json(body): Json<IncomingMessage>,
) -> Result<Json<AgentResponse>, ApiError> {
    let turn = IncomingTurn {
        platform: body.platform,
        platform_user_id: body.platform_user_id,
        platform_username: body.platform_username,
        platform_channel_id: body.platform_channel_id,
        platform_thread_id: body.platform_thread_id,
        platform_server_id: body.platform_server_id,
        content: body.content,
        attachments: body.attachments,
    };

    let outcome = ctx.agent_loop.handle_turn(&turn).await?;
    Ok(Json(AgentResponse { content: outcome.content, files: outcome.files, error: None }))
}

/// `POST /continue` (§4.6, §6.1): the Scheduler Worker's re-entry point.
/// The loop's reply is both returned in the response body and published as
/// a notification, since the caller here is the Scheduler Worker, not the
/// platform the user is actually watching.
pub async fn continue_conversation(
    State(ctx): State<AppContext>,
    Json(body): Json<ContinueRequest>,
) -> Result<Json<AgentResponse>, ApiError> {
    let notification_target = Notification {
        platform: body.platform.clone(),
        channel: body.platform_channel_id.clone(),
        thread: body.platform_thread_id.clone(),
        content: String::new(),
        user_id: body.user_id,
        job_id: body.job_id,
    };

    let outcome = ctx.agent_loop.handle_continue(&body).await?;

    let notification = Notification { content: outcome.content.clone(), ..notification_target };
    if let Err(e) = ctx.notifications.publish(notification).await {
        tracing::warn!(error = %e, "failed to publish /continue reply as a notification");
    }

    Ok(Json(AgentResponse { content: outcome.content, files: outcome.files, error: None }))
}

/// `POST /refresh-tools` (§4.3): forces an out-of-cycle manifest discovery
/// pass rather than waiting for the background resync loop.
#[derive(Debug, Serialize)]
pub struct RefreshToolsResponse {
    pub discovered: Vec<String>,
}

pub async fn refresh_tools(State(ctx): State<AppContext>) -> Json<RefreshToolsResponse> {
    let discovered = ctx.tools.discover_all().await;
    Json(RefreshToolsResponse { discovered })
}

/// `POST /embed` (§4.2, §6.1): thin passthrough to the Model Router's
/// embedding path, for callers (e.g. the Context Builder's semantic memory
/// search) that need a vector without going through a full turn.
#[derive(Debug, Deserialize)]
pub struct EmbedRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct EmbedResponse {
    pub embedding: Vec<f32>,
}

pub async fn embed(
    State(ctx): State<AppContext>,
    Json(body): Json<EmbedRequest>,
) -> Result<Json<EmbedResponse>, ApiError> {
    let mut vectors = ctx.router.embed(std::slice::from_ref(&body.text)).await.map_err(ApiError::internal)?;
    if vectors.len() != 1 {
        return Err(ApiError::internal(format!(
            "embedding provider returned {} vectors for a single input",
            vectors.len()
        )));
    }
    Ok(Json(EmbedResponse { embedding: vectors.remove(0) }))
}

/// `GET /health` (§6.1): unauthenticated, used by orchestration/liveness
/// probes ahead of any bearer-token check.
pub async fn health(State(ctx): State<AppContext>) -> Result<Json<HealthResponse>, ApiError> {
    ctx.db.health_check().await.map_err(ApiError::internal)?;
    Ok(Json(HealthResponse::default()))
}

/// `POST /webhook/{job_id}` (§6.3): unauthenticated at the service-auth
/// layer — a job without a configured `check_config.secret` accepts any
/// caller, one with a secret requires `X-Webhook-Signature`.
pub async fn webhook(
    State(ctx): State<AppContext>,
    Path(job_id): Path<uuid::Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<AgentResponse>, ApiError> {
    let job_id = ScheduledJobId::from(job_id);
    let Some(job) = ctx.scheduler.find_job(job_id).await? else {
        return Err(ApiError::not_found(format!("no scheduled job {job_id}")));
    };

    let webhook_config = job.webhook_config().map_err(|e| {
        ApiError::bad_request(format!("job {job_id} has a malformed webhook check_config: {e}"))
    })?;

    let signature_header =
        headers.get("X-Webhook-Signature").and_then(|v| v.to_str().ok());
    if !agentcore_scheduler::verify_signature(webhook_config.secret.as_deref(), &body, signature_header) {
        return Err(ApiError::unauthorized());
    }

    let payload = if body.is_empty() {
        None
    } else {
        serde_json::from_slice::<serde_json::Value>(&body).ok()
    };

    match ctx.scheduler.complete_webhook(job_id, payload).await? {
        WebhookOutcome::Completed => Ok(Json(AgentResponse::text("job completed"))),
        WebhookOutcome::NotFound => Err(ApiError::not_found(format!("no scheduled job {job_id}"))),
        WebhookOutcome::WrongJobType => {
            Err(ApiError::bad_request(format!("job {job_id} is not a webhook job")))
        }
        WebhookOutcome::NotActive => {
            Ok(Json(AgentResponse::text("job already finalized, ignoring")))
        }
    }
}
