//! PostgreSQL probe.
//!
//! Owns one lazily-connected pool per configured endpoint, created at
//! orchestrator start and dropped at shutdown. Lag is taken from real
//! acknowledgement state (`pg_stat_replication.replay_lag` on the primary,
//! replay timestamp age on the standby), never from heartbeat presence.

use crate::error::ProbeError;
use crate::probes::{ProbeResult, RecoveryState, RelationalProbe};
use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const PROMOTION_CAP: Duration = Duration::from_secs(3);

pub struct PgProbe {
    pools: HashMap<String, PgPool>,
    call_timeout: Duration,
}

impl PgProbe {
    /// Build pools for every configured endpoint. Connections are
    /// established lazily on first use; construction fails only on a
    /// malformed endpoint URL.
    pub fn new(
        endpoints: impl IntoIterator<Item = String>,
        call_timeout: Duration,
    ) -> ProbeResult<Self> {
        let mut pools = HashMap::new();
        for endpoint in endpoints {
            let pool = PgPoolOptions::new()
                .max_connections(2)
                .acquire_timeout(call_timeout)
                .connect_lazy(&endpoint)
                .map_err(|e| ProbeError::Query(format!("invalid endpoint {endpoint}: {e}")))?;
            pools.insert(endpoint, pool);
        }
        Ok(Self {
            pools,
            call_timeout,
        })
    }

    fn pool(&self, endpoint: &str) -> ProbeResult<&PgPool> {
        self.pools
            .get(endpoint)
            .ok_or_else(|| ProbeError::UnknownEndpoint(endpoint.to_string()))
    }

    async fn query_in_recovery(&self, endpoint: &str) -> ProbeResult<bool> {
        let pool = self.pool(endpoint)?;
        let fut = sqlx::query_scalar::<_, bool>("SELECT pg_is_in_recovery()").fetch_one(pool);
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(in_recovery)) => Ok(in_recovery),
            Ok(Err(e)) => Err(ProbeError::Query(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }

    /// Primary-side lag: worst acknowledged replay lag across attached
    /// standbys.
    async fn primary_side_lag(&self, primary: &str) -> ProbeResult<Option<Duration>> {
        let pool = self.pool(primary)?;
        let fut = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT extract(epoch FROM replay_lag)::float8 \
             FROM pg_stat_replication \
             ORDER BY replay_lag DESC NULLS LAST LIMIT 1",
        )
        .fetch_optional(pool);

        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(row)) => Ok(row.flatten().map(seconds_to_duration)),
            Ok(Err(e)) => Err(ProbeError::Query(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }

    /// Standby-side lag: age of the last applied transaction.
    async fn standby_side_lag(&self, standby: &str) -> ProbeResult<Option<Duration>> {
        let pool = self.pool(standby)?;
        let fut = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT extract(epoch FROM (now() - pg_last_xact_replay_timestamp()))::float8",
        )
        .fetch_one(pool);

        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(age)) => Ok(age.map(seconds_to_duration)),
            Ok(Err(e)) => Err(ProbeError::Query(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }
}

fn seconds_to_duration(seconds: f64) -> Duration {
    Duration::from_secs_f64(seconds.max(0.0))
}

#[async_trait]
impl RelationalProbe for PgProbe {
    async fn check_reachable(&self, endpoint: &str) -> ProbeResult<()> {
        let pool = self.pool(endpoint)?;
        let fut = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(pool);
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ProbeError::Unreachable(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.call_timeout.as_millis() as u64)),
        }
    }

    async fn recovery_state(&self, endpoint: &str) -> RecoveryState {
        match self.query_in_recovery(endpoint).await {
            Ok(true) => RecoveryState::Standby,
            Ok(false) => RecoveryState::Primary,
            Err(e) => {
                warn!(endpoint = endpoint, error = %e, "Recovery state query failed");
                RecoveryState::Unknown
            }
        }
    }

    async fn replication_lag(
        &self,
        primary: &str,
        standby: &str,
    ) -> ProbeResult<Option<Duration>> {
        match self.primary_side_lag(primary).await {
            Ok(Some(lag)) => return Ok(Some(lag)),
            Ok(None) => {
                debug!(primary = primary, "No replay_lag exposed, falling back to standby view");
            }
            Err(e) => {
                debug!(primary = primary, error = %e, "Primary-side lag query failed, falling back to standby view");
            }
        }
        self.standby_side_lag(standby).await
    }

    async fn promote(&self, endpoint: &str, budget: Duration) -> ProbeResult<()> {
        let deadline = Instant::now() + budget.min(PROMOTION_CAP);

        // Idempotent against a node that already assumed primary status
        if self.recovery_state(endpoint).await == RecoveryState::Primary {
            debug!(endpoint = endpoint, "Node already primary, promotion is a no-op");
            return Ok(());
        }

        let pool = self.pool(endpoint)?;
        let fut = sqlx::query_scalar::<_, bool>("SELECT pg_promote(false)").fetch_one(pool);
        match tokio::time::timeout(self.call_timeout, fut).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(ProbeError::Promotion(e.to_string())),
            Err(_) => {
                return Err(ProbeError::Promotion(format!(
                    "promotion command timed out after {} ms",
                    self.call_timeout.as_millis()
                )))
            }
        }

        loop {
            if self.recovery_state(endpoint).await == RecoveryState::Primary {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ProbeError::Promotion(
                    "confirmation polling timed out before the node reported primary".to_string(),
                ));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn validation_write(
        &self,
        endpoint: &str,
        token: Uuid,
        budget: Duration,
    ) -> ProbeResult<()> {
        let pool = self.pool(endpoint)?;

        let fut = async {
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS failover_validation (\
                 token uuid PRIMARY KEY, \
                 written_at timestamptz NOT NULL DEFAULT now())",
            )
            .execute(pool)
            .await?;

            sqlx::query("INSERT INTO failover_validation (token) VALUES ($1)")
                .bind(token)
                .execute(pool)
                .await?;

            sqlx::query_scalar::<_, Uuid>(
                "SELECT token FROM failover_validation WHERE token = $1",
            )
            .bind(token)
            .fetch_one(pool)
            .await
        };

        match tokio::time::timeout(budget, fut).await {
            Ok(Ok(read_back)) if read_back == token => Ok(()),
            Ok(Ok(read_back)) => Err(ProbeError::Query(format!(
                "read-back returned {read_back}, expected {token}"
            ))),
            Ok(Err(e)) => Err(ProbeError::Query(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(budget.as_millis() as u64)),
        }
    }
}
