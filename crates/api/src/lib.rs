//! axum HTTP surface (§6.1, §6.3), grounded on the teacher's
//! `crates/entry/api/src/services/server/routes.rs` router-assembly shape,
//! simplified to one bearer-auth middleware layer rather than the
//! teacher's JWT/rate-limit/ip-ban stack, since this core has a single
//! service-to-service caller rather than end-user browser sessions.

pub mod auth;
pub mod error;
pub mod handlers;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use agentcore_runtime::AppContext;

#[must_use]
pub fn build_router(ctx: AppContext) -> Router {
    let authenticated = Router::new()
        .route("/message", post(handlers::message))
        .route("/continue", post(handlers::continue_conversation))
        .route("/refresh-tools", post(handlers::refresh_tools))
        .route("/embed", post(handlers::embed))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth::require_service_token));

    let public = Router::new()
        .route("/health", get(handlers::health))
        .route("/webhook/:job_id", post(handlers::webhook));

    Router::new()
        .merge(authenticated)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}
