//! Status, history, and metrics handlers.

use crate::models::MetricsSnapshot;
use crate::web::response_types::{HistoryResponse, StatusResponse};
use crate::web::state::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

const DEFAULT_HISTORY_LIMIT: usize = 10;

/// Current routing authority and attempt state: GET /status
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let routing = state.routing.read().await;
    let last_attempt = state.history.last().await.map(|record| record.summary());

    Json(StatusResponse {
        active_region: routing.active_region,
        version: routing.version,
        in_flight: state.coordinator.in_flight(),
        phase: state.coordinator.phase(),
        last_attempt,
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Recent failover records, newest first: GET /history?limit=N
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let records = state.history.recent(limit).await;

    Json(HistoryResponse {
        count: records.len(),
        records,
    })
}

/// Aggregate statistics over stored attempts: GET /metrics
pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.history.summary().await)
}
