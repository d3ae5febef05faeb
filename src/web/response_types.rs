//! Control API error and response types.
//!
//! Internal result values are converted to transport responses here and
//! nowhere else. A failed failover is a recognised outcome (200 with
//! `success=false`); only rejections and transport faults map to non-200
//! statuses.

use crate::coordinator::TriggerRejection;
use crate::error::ErrorKind;
use crate::models::{FailoverRecord, FailoverSummary};
use crate::state_machine::FailoverPhase;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Rejected(#[from] TriggerRejection),

    #[error("service degraded: {0}")]
    Degraded(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Rejected(rejection) => {
                let status = match rejection.kind() {
                    ErrorKind::UnknownRegion => StatusCode::BAD_REQUEST,
                    _ => StatusCode::CONFLICT,
                };
                let body = json!({
                    "error": rejection.kind().as_str(),
                    "message": rejection.to_string(),
                });
                (status, Json(body)).into_response()
            }
            Self::Degraded(detail) => {
                let body = json!({ "status": "degraded", "detail": detail });
                (StatusCode::SERVICE_UNAVAILABLE, Json(body)).into_response()
            }
            Self::Internal(message) => {
                let body = json!({ "error": "internal_error", "message": message });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

/// Response body for `GET /status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub active_region: String,
    pub version: u64,
    pub in_flight: bool,
    pub phase: FailoverPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_attempt: Option<FailoverSummary>,
}

/// Response body for `GET /history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub count: usize,
    pub records: Vec<FailoverRecord>,
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub active_region: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_status_mapping() {
        let conflict = ApiError::Rejected(TriggerRejection::AlreadyInProgress);
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let conflict = ApiError::Rejected(TriggerRejection::AlreadyAtTarget("region1".into()));
        assert_eq!(conflict.into_response().status(), StatusCode::CONFLICT);

        let bad_request = ApiError::Rejected(TriggerRejection::UnknownRegion("nope".into()));
        assert_eq!(bad_request.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_degraded_maps_to_service_unavailable() {
        let error = ApiError::Degraded("sentinel quorum unreachable".into());
        assert_eq!(
            error.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
