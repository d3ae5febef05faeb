//! Error types for the failover orchestrator.
//!
//! The public error surface is the closed [`ErrorKind`] set; component-local
//! errors map into it at the coordinator boundary. Failures are values
//! end-to-end, nothing crosses a component boundary as a panic.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of failure kinds recorded in failover records and surfaced
/// through the control API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Endpoint did not answer within its timeout
    Unreachable,
    /// Node reported the opposite role from the one expected
    WrongRole,
    /// Observed replication lag exceeded tolerance
    LagTooHigh,
    /// Promotion command errored or confirmation polling timed out
    PromotionFailed,
    /// Sentinel quorum did not respond or did not agree
    QuorumUnavailable,
    /// Sentinel accepted the command but the master did not change in budget
    CacheFailoverFailed,
    /// Routing registry refused the swap
    RoutingUpdateFailed,
    /// Post-swap write or read-back did not succeed
    ValidationFailed,
    /// Overall or per-step deadline passed
    DeadlineExceeded,
    /// A failover attempt is already running
    AlreadyInProgress,
    /// Trigger named the currently active region
    AlreadyAtTarget,
    /// Trigger named a region not present in configuration
    UnknownRegion,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unreachable => "unreachable",
            Self::WrongRole => "wrong_role",
            Self::LagTooHigh => "lag_too_high",
            Self::PromotionFailed => "promotion_failed",
            Self::QuorumUnavailable => "quorum_unavailable",
            Self::CacheFailoverFailed => "cache_failover_failed",
            Self::RoutingUpdateFailed => "routing_update_failed",
            Self::ValidationFailed => "validation_failed",
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::AlreadyInProgress => "already_in_progress",
            Self::AlreadyAtTarget => "already_at_target",
            Self::UnknownRegion => "unknown_region",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unreachable" => Ok(Self::Unreachable),
            "wrong_role" => Ok(Self::WrongRole),
            "lag_too_high" => Ok(Self::LagTooHigh),
            "promotion_failed" => Ok(Self::PromotionFailed),
            "quorum_unavailable" => Ok(Self::QuorumUnavailable),
            "cache_failover_failed" => Ok(Self::CacheFailoverFailed),
            "routing_update_failed" => Ok(Self::RoutingUpdateFailed),
            "validation_failed" => Ok(Self::ValidationFailed),
            "deadline_exceeded" => Ok(Self::DeadlineExceeded),
            "already_in_progress" => Ok(Self::AlreadyInProgress),
            "already_at_target" => Ok(Self::AlreadyAtTarget),
            "unknown_region" => Ok(Self::UnknownRegion),
            _ => Err(format!("Invalid error kind: {s}")),
        }
    }
}

/// Errors returned by the relational probe. Never escalated past the
/// coordinator; each maps into an [`ErrorKind`] at the step boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProbeError {
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("query failed: {0}")]
    Query(String),
    #[error("operation timed out after {0} ms")]
    Timeout(u64),
    #[error("promotion did not complete: {0}")]
    Promotion(String),
    #[error("endpoint not configured: {0}")]
    UnknownEndpoint(String),
}

/// Errors returned by the cache sentinel client.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SentinelError {
    #[error("sentinel quorum unavailable: {0}")]
    QuorumUnavailable(String),
    #[error("sentinels disagree on the master address: {0}")]
    QuorumDisagreement(String),
    #[error("cache master did not change within budget: {0}")]
    FailoverIncomplete(String),
    #[error("cache endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("cache command failed: {0}")]
    Command(String),
}

/// Errors returned by the routing registry.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RoutingError {
    #[error("another routing swap is in progress")]
    Busy,
}

/// Configuration loading and validation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
    #[error("region {0} is not configured")]
    MissingRegion(String),
    #[error("no sentinel endpoints configured")]
    NoSentinels,
    #[error("no regions configured")]
    NoRegions,
}
