//! Control API.
//!
//! Axum-based HTTP surface for operators: trigger failovers, inspect
//! status, history, and metrics, and probe orchestrator health. Internal
//! result values become transport responses at this boundary only.

pub mod handlers;
pub mod response_types;
pub mod routes;
pub mod state;

use axum::Router;
use state::AppState;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the control API router with all routes and middleware.
pub fn create_app(app_state: AppState) -> Router {
    Router::new()
        .merge(routes::health_routes())
        .merge(routes::control_routes())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
