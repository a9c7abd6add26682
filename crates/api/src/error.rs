//! Maps internal failures onto the error taxonomy in §7: most of them
//! surface as a best-effort `AgentResponse::error(..)` body rather than a
//! bare HTTP status, since chat adapters expect a response they can show
//! the user even when the turn failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        tracing::warn!(error = %err, "internal error handling request");
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, message: err.to_string() }
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self { status: StatusCode::UNAUTHORIZED, message: "missing or invalid bearer token".to_string() }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self { status: StatusCode::NOT_FOUND, message: message.into() }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, message: message.into() }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(agentcore_models::AgentResponse::error(self.message))).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self::internal(err)
    }
}
