//! HTTP route definitions for the control API.

use crate::web::handlers;
use crate::web::state::AppState;
use axum::routing::{get, post};
use axum::Router;

/// Operator control surface:
/// - `POST /failover/:target_region` - trigger a failover attempt
/// - `GET /status` - routing authority and attempt state
/// - `GET /history` - recent failover records
/// - `GET /metrics` - aggregate statistics
pub fn control_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/failover/:target_region",
            post(handlers::failover::trigger_failover),
        )
        .route("/status", get(handlers::status::get_status))
        .route("/history", get(handlers::status::get_history))
        .route("/metrics", get(handlers::status::get_metrics))
}

/// Health probe route, kept separate so deployments can expose it without
/// the control surface.
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
