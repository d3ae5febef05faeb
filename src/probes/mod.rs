//! Health and leadership probes for the two data-plane tiers.
//!
//! The coordinator talks to the tiers through the [`RelationalProbe`] and
//! [`CacheLeadership`] traits so the failover sequence is testable without a
//! live cluster. Production implementations are [`PgProbe`] (sqlx) and
//! [`SentinelClient`] (redis).

pub mod relational;
pub mod sentinel;

pub use relational::PgProbe;
pub use sentinel::SentinelClient;

use crate::error::{ProbeError, SentinelError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

pub type ProbeResult<T> = Result<T, ProbeError>;
pub type SentinelResult<T> = Result<T, SentinelError>;

/// Role a relational node reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryState {
    /// Accepting writes
    Primary,
    /// Applying replication
    Standby,
    /// Role could not be determined
    Unknown,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primary => write!(f, "primary"),
            Self::Standby => write!(f, "standby"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Read-side and promotion operations against relational nodes.
///
/// All operations are bounded by per-call timeouts and return errors as
/// values. Probe reads never mutate state; `promote` is idempotent against
/// an already-promoted node.
#[async_trait]
pub trait RelationalProbe: Send + Sync {
    /// Connection, authentication, and a trivial round-trip.
    async fn check_reachable(&self, endpoint: &str) -> ProbeResult<()>;

    /// Whether the node is accepting writes or applying replication.
    async fn recovery_state(&self, endpoint: &str) -> RecoveryState;

    /// Acknowledged replication lag between `primary` and `standby`.
    /// `None` means the deployment exposed no usable lag evidence.
    async fn replication_lag(
        &self,
        primary: &str,
        standby: &str,
    ) -> ProbeResult<Option<Duration>>;

    /// Request that the named standby assume primary status, confirming via
    /// recovery-state polling. Complete only once the node reports primary.
    async fn promote(&self, endpoint: &str, budget: Duration) -> ProbeResult<()>;

    /// End-to-end write of a token-keyed sentinel row plus read-back.
    async fn validation_write(
        &self,
        endpoint: &str,
        token: Uuid,
        budget: Duration,
    ) -> ProbeResult<()>;
}

/// Cache leadership operations against the sentinel quorum.
///
/// The quorum is the source of truth for cache leadership; the client never
/// designates a master itself.
#[async_trait]
pub trait CacheLeadership: Send + Sync {
    /// The master address the quorum currently advertises.
    async fn current_master(&self, service_name: &str) -> SentinelResult<String>;

    /// Instruct the quorum to elect a new master; resolves with the new
    /// address once `current_master` reflects a change.
    async fn request_failover(
        &self,
        service_name: &str,
        budget: Duration,
    ) -> SentinelResult<String>;

    /// Trivial health probe of a cache endpoint.
    async fn check_reachable(&self, endpoint: &str) -> SentinelResult<()>;

    /// Token write and read-back on the named master.
    async fn validation_round_trip(
        &self,
        master_endpoint: &str,
        token: Uuid,
        budget: Duration,
    ) -> SentinelResult<()>;
}
