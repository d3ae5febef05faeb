//! Orchestrator self-health handler.

use crate::web::response_types::{ApiError, ApiResult, HealthResponse};
use crate::web::state::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use tracing::debug;

/// Health probe for the orchestrator process: GET /health
///
/// Healthy iff the sentinel quorum answers and at least one configured
/// relational endpoint is reachable. Anything less is 503 degraded with
/// detail; load balancers use this to keep the orchestrator itself out of
/// rotation.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    debug!("Performing orchestrator health probe");

    if let Err(e) = state
        .cache
        .current_master(&state.config.cache_service_name)
        .await
    {
        return Err(ApiError::Degraded(format!("sentinel quorum: {e}")));
    }

    let mut relational_reachable = false;
    let mut last_error = None;
    for endpoint in state.config.relational_endpoints() {
        match state.relational.check_reachable(&endpoint).await {
            Ok(()) => {
                relational_reachable = true;
                break;
            }
            Err(e) => last_error = Some(e.to_string()),
        }
    }

    if !relational_reachable {
        let detail = last_error.unwrap_or_else(|| "no relational endpoints configured".to_string());
        return Err(ApiError::Degraded(format!("relational tier: {detail}")));
    }

    let routing = state.routing.read().await;
    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        service: "failover-orchestrator".to_string(),
        active_region: routing.active_region,
        timestamp: Utc::now(),
    }))
}
