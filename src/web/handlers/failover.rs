//! Failover trigger handler.

use crate::models::FailoverRecord;
use crate::web::response_types::ApiResult;
use crate::web::state::AppState;
use axum::extract::{Path, State};
use axum::Json;
use tracing::info;

/// Trigger a failover: POST /failover/{target_region}
///
/// Synchronous: returns once the coordinator has sealed the record. Both
/// successful and failed attempts come back as 200 with the full per-step
/// breakdown; rejections map to 409/400.
pub async fn trigger_failover(
    State(state): State<AppState>,
    Path(target_region): Path<String>,
) -> ApiResult<Json<FailoverRecord>> {
    info!(target_region = %target_region, "Failover trigger received");

    let record = state.coordinator.trigger(&target_region).await?;
    Ok(Json(record))
}
