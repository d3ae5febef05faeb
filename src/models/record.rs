//! Step and failover records.
//!
//! A [`FailoverRecord`] is the sealed, immutable audit artefact of one
//! failover attempt. Step records are appended while the attempt runs and
//! become immutable with the parent record.

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// The five named operations composing a failover attempt, in execution
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    HealthCheck,
    PromoteRelational,
    FailoverCache,
    UpdateRouting,
    Validate,
}

impl StepName {
    /// The fixed execution order of a failover attempt.
    pub const SEQUENCE: [StepName; 5] = [
        StepName::HealthCheck,
        StepName::PromoteRelational,
        StepName::FailoverCache,
        StepName::UpdateRouting,
        StepName::Validate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HealthCheck => "health_check",
            Self::PromoteRelational => "promote_relational",
            Self::FailoverCache => "failover_cache",
            Self::UpdateRouting => "update_routing",
            Self::Validate => "validate",
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "health_check" => Ok(Self::HealthCheck),
            "promote_relational" => Ok(Self::PromoteRelational),
            "failover_cache" => Ok(Self::FailoverCache),
            "update_routing" => Ok(Self::UpdateRouting),
            "validate" => Ok(Self::Validate),
            _ => Err(format!("Invalid step name: {s}")),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    Ok,
    Failed,
    Skipped,
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Structured step detail: a tagged variant instead of a schemaless map.
///
/// Successful steps may carry typed payloads (observed lag, new master
/// address, validation token); failed steps carry the error kind and a
/// human-readable message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepDetail {
    Ok {
        #[serde(skip_serializing_if = "Option::is_none")]
        observed_lag_ms: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        new_master: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        validation_token: Option<Uuid>,
    },
    Failed { kind: ErrorKind, message: String },
}

impl StepDetail {
    pub fn observed_lag(lag: Duration) -> Self {
        Self::Ok {
            observed_lag_ms: Some(lag.as_millis() as u64),
            new_master: None,
            validation_token: None,
        }
    }

    pub fn new_master(endpoint: impl Into<String>) -> Self {
        Self::Ok {
            observed_lag_ms: None,
            new_master: Some(endpoint.into()),
            validation_token: None,
        }
    }

    pub fn validation_token(token: Uuid) -> Self {
        Self::Ok {
            observed_lag_ms: None,
            new_master: None,
            validation_token: Some(token),
        }
    }

    pub fn failed(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Failed {
            kind,
            message: message.into(),
        }
    }
}

/// Timing and outcome of one executed (or skipped) step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: StepName,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<StepDetail>,
}

/// First fatal error of a failed attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverError {
    pub kind: ErrorKind,
    pub message: String,
}

/// Sealed audit artefact of one failover attempt. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverRecord {
    pub id: Uuid,
    pub source_region: String,
    pub target_region: String,
    pub triggered_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub success: bool,
    pub total_duration_ms: u64,
    pub sla_compliant: bool,
    pub steps: Vec<StepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FailoverError>,
}

impl FailoverRecord {
    pub fn summary(&self) -> FailoverSummary {
        FailoverSummary {
            id: self.id,
            source_region: self.source_region.clone(),
            target_region: self.target_region.clone(),
            success: self.success,
            total_duration_ms: self.total_duration_ms,
            sla_compliant: self.sla_compliant,
            completed_at: self.completed_at,
        }
    }
}

/// Condensed view of an attempt for the status endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailoverSummary {
    pub id: Uuid,
    pub source_region: String,
    pub target_region: String,
    pub success: bool,
    pub total_duration_ms: u64,
    pub sla_compliant: bool,
    pub completed_at: DateTime<Utc>,
}
