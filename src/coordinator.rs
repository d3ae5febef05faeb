//! Failover coordinator.
//!
//! Top-level state machine composing the probes, the step executor, the
//! routing registry, and the history store into one failover attempt. The
//! relational promotion is the durable commit point: nothing after it is
//! rolled back, and a failed attempt leaves a truthful record of exactly
//! where it stopped.

use crate::config::{OrchestratorConfig, RegionConfig};
use crate::error::{ErrorKind, SentinelError};
use crate::executor::{StepDefinition, StepExecutor, StepFailure, StepResult};
use crate::history::FailoverHistory;
use crate::models::{FailoverError, FailoverRecord, RoutingRecord, StepDetail, StepName};
use crate::probes::{CacheLeadership, RecoveryState, RelationalProbe};
use crate::routing::RoutingRegistry;
use crate::state_machine::{FailoverPhase, PhaseCell};
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// Control-plane rejections: the trigger never started a sequence and no
/// record was produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TriggerRejection {
    #[error("a failover attempt is already in progress")]
    AlreadyInProgress,
    #[error("region {0} is already active")]
    AlreadyAtTarget(String),
    #[error("region {0} is not configured")]
    UnknownRegion(String),
}

impl TriggerRejection {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadyInProgress => ErrorKind::AlreadyInProgress,
            Self::AlreadyAtTarget(_) => ErrorKind::AlreadyAtTarget,
            Self::UnknownRegion(_) => ErrorKind::UnknownRegion,
        }
    }
}

pub struct FailoverCoordinator {
    config: Arc<OrchestratorConfig>,
    relational: Arc<dyn RelationalProbe>,
    cache: Arc<dyn CacheLeadership>,
    routing: Arc<RoutingRegistry>,
    history: Arc<FailoverHistory>,
    in_flight: AtomicBool,
    phase: PhaseCell,
}

/// Releases the single-flight gate when the attempt ends, including on a
/// cancelled request. A cancelled attempt leaves the phase at `idle_failed`.
struct FlightClaim<'a> {
    in_flight: &'a AtomicBool,
    phase: &'a PhaseCell,
}

impl Drop for FlightClaim<'_> {
    fn drop(&mut self) {
        if self.phase.load().is_in_flight() {
            self.phase.store(FailoverPhase::IdleFailed);
        }
        self.in_flight.store(false, Ordering::Release);
    }
}

impl FailoverCoordinator {
    pub fn new(
        config: Arc<OrchestratorConfig>,
        relational: Arc<dyn RelationalProbe>,
        cache: Arc<dyn CacheLeadership>,
        routing: Arc<RoutingRegistry>,
        history: Arc<FailoverHistory>,
    ) -> Self {
        Self {
            config,
            relational,
            cache,
            routing,
            history,
            in_flight: AtomicBool::new(false),
            phase: PhaseCell::new(),
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn phase(&self) -> FailoverPhase {
        self.phase.load()
    }

    /// Perform one failover attempt toward `target_region`. Returns the
    /// sealed record for both successful and failed attempts; rejections
    /// carry no record and perform no mutation.
    pub async fn trigger(&self, target_region: &str) -> Result<FailoverRecord, TriggerRejection> {
        let target = self
            .config
            .region(target_region)
            .cloned()
            .ok_or_else(|| TriggerRejection::UnknownRegion(target_region.to_string()))?;

        let current = self.routing.read().await;
        if current.active_region == target_region {
            return Err(TriggerRejection::AlreadyAtTarget(target_region.to_string()));
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(TriggerRejection::AlreadyInProgress);
        }
        let _claim = FlightClaim {
            in_flight: &self.in_flight,
            phase: &self.phase,
        };

        info!(
            source_region = %current.active_region,
            target_region = target_region,
            budget_ms = self.config.overall_budget.as_millis() as u64,
            "🔁 Failover sequence starting"
        );

        let record = self.run_sequence(&current, target_region, &target).await;

        self.phase.store(if record.success {
            FailoverPhase::IdleSuccess
        } else {
            FailoverPhase::IdleFailed
        });

        if record.success {
            info!(
                failover_id = %record.id,
                target_region = target_region,
                total_duration_ms = record.total_duration_ms,
                sla_compliant = record.sla_compliant,
                "✅ Failover complete"
            );
        } else {
            let kind = record.error.as_ref().map(|e| e.kind.as_str()).unwrap_or("unknown");
            warn!(
                failover_id = %record.id,
                target_region = target_region,
                error_kind = kind,
                total_duration_ms = record.total_duration_ms,
                "Failover attempt failed"
            );
        }

        self.history.append(record.clone()).await;
        Ok(record)
    }

    async fn run_sequence(
        &self,
        current: &RoutingRecord,
        target_id: &str,
        target: &RegionConfig,
    ) -> FailoverRecord {
        let id = Uuid::new_v4();
        let triggered_at = Utc::now();
        let budgets = &self.config.step_budgets;

        let steps = vec![
            StepDefinition::new(
                StepName::HealthCheck,
                true,
                budgets.health_check,
                self.health_check_step(current, target),
            ),
            StepDefinition::new(
                StepName::PromoteRelational,
                true,
                budgets.promote_relational,
                self.promote_step(target),
            ),
            StepDefinition::new(
                StepName::FailoverCache,
                true,
                budgets.failover_cache,
                self.cache_failover_step(),
            ),
            StepDefinition::new(
                StepName::UpdateRouting,
                true,
                budgets.update_routing,
                self.routing_step(target_id, target),
            ),
            StepDefinition::new(
                StepName::Validate,
                true,
                budgets.validate,
                self.validation_step(target),
            ),
        ];

        let executor = StepExecutor::new(self.config.overall_budget);
        let report = executor
            .run(steps, |name| self.phase.store(FailoverPhase::for_step(name)))
            .await;

        let completed_at = Utc::now();
        let success = report.succeeded;
        let sla_compliant = success && report.total_duration < self.config.overall_budget;
        let error = report.first_failure.map(|(step, failure)| FailoverError {
            kind: failure.kind,
            message: format!("{step}: {}", failure.message),
        });

        FailoverRecord {
            id,
            source_region: current.active_region.clone(),
            target_region: target_id.to_string(),
            triggered_at,
            completed_at,
            success,
            total_duration_ms: report.total_duration.as_millis() as u64,
            sla_compliant,
            steps: report.steps,
            error,
        }
    }

    /// Step 1: target standby must be reachable, in standby role, within
    /// lag tolerance; the sentinel quorum must answer and the target cache
    /// node must ping. No mutations.
    fn health_check_step(
        &self,
        current: &RoutingRecord,
        target: &RegionConfig,
    ) -> impl std::future::Future<Output = StepResult> + Send + 'static {
        let relational = Arc::clone(&self.relational);
        let cache = Arc::clone(&self.cache);
        let source_endpoint = current.relational_primary.clone();
        let target_endpoint = target.relational_endpoint.clone();
        let target_cache = target.cache_endpoint.clone();
        let service_name = self.config.cache_service_name.clone();
        let max_lag = self.config.max_lag_tolerated;

        async move {
            relational
                .check_reachable(&target_endpoint)
                .await
                .map_err(|e| {
                    StepFailure::new(
                        ErrorKind::Unreachable,
                        format!("target relational endpoint: {e}"),
                    )
                })?;

            match relational.recovery_state(&target_endpoint).await {
                RecoveryState::Standby => {}
                RecoveryState::Primary => {
                    return Err(StepFailure::new(
                        ErrorKind::WrongRole,
                        "target node already reports primary",
                    ));
                }
                RecoveryState::Unknown => {
                    return Err(StepFailure::new(
                        ErrorKind::WrongRole,
                        "target recovery state could not be determined",
                    ));
                }
            }

            let lag = relational
                .replication_lag(&source_endpoint, &target_endpoint)
                .await
                .map_err(|e| {
                    StepFailure::new(ErrorKind::LagTooHigh, format!("lag query failed: {e}"))
                })?
                .ok_or_else(|| {
                    StepFailure::new(
                        ErrorKind::LagTooHigh,
                        "replication lag could not be determined",
                    )
                })?;

            if lag > max_lag {
                return Err(StepFailure::new(
                    ErrorKind::LagTooHigh,
                    format!(
                        "observed {} ms exceeds tolerance {} ms",
                        lag.as_millis(),
                        max_lag.as_millis()
                    ),
                ));
            }

            cache.current_master(&service_name).await.map_err(|e| {
                StepFailure::new(ErrorKind::QuorumUnavailable, e.to_string())
            })?;

            cache.check_reachable(&target_cache).await.map_err(|e| {
                StepFailure::new(
                    ErrorKind::Unreachable,
                    format!("target cache endpoint: {e}"),
                )
            })?;

            Ok(Some(StepDetail::observed_lag(lag)))
        }
    }

    /// Step 2: the durable commit point. Promote the target standby and
    /// confirm it reports primary.
    fn promote_step(
        &self,
        target: &RegionConfig,
    ) -> impl std::future::Future<Output = StepResult> + Send + 'static {
        let relational = Arc::clone(&self.relational);
        let endpoint = target.relational_endpoint.clone();
        let budget = self.config.step_budgets.promote_relational;

        async move {
            relational.promote(&endpoint, budget).await.map_err(|e| {
                StepFailure::new(ErrorKind::PromotionFailed, e.to_string())
            })?;

            match relational.recovery_state(&endpoint).await {
                RecoveryState::Primary => Ok(None),
                state => Err(StepFailure::new(
                    ErrorKind::PromotionFailed,
                    format!("post-promotion state is {state}"),
                )),
            }
        }
    }

    /// Step 3: sentinel-led cache failover. Not rolled back on later
    /// failure; the relational promotion already committed.
    fn cache_failover_step(
        &self,
    ) -> impl std::future::Future<Output = StepResult> + Send + 'static {
        let cache = Arc::clone(&self.cache);
        let service_name = self.config.cache_service_name.clone();
        let budget = self.config.step_budgets.failover_cache;

        async move {
            let new_master = cache
                .request_failover(&service_name, budget)
                .await
                .map_err(|e| {
                    let kind = match &e {
                        SentinelError::QuorumUnavailable(_)
                        | SentinelError::QuorumDisagreement(_) => ErrorKind::QuorumUnavailable,
                        _ => ErrorKind::CacheFailoverFailed,
                    };
                    StepFailure::new(kind, e.to_string())
                })?;

            Ok(Some(StepDetail::new_master(new_master)))
        }
    }

    /// Step 4: publish the new topology. The point at which external
    /// routers observe the switch.
    fn routing_step(
        &self,
        target_id: &str,
        target: &RegionConfig,
    ) -> impl std::future::Future<Output = StepResult> + Send + 'static {
        let routing = Arc::clone(&self.routing);
        let region = target_id.to_string();
        let relational_endpoint = target.relational_endpoint.clone();
        let cache_endpoint = target.cache_endpoint.clone();

        async move {
            routing
                .swap(&region, &relational_endpoint, &cache_endpoint)
                .await
                .map_err(|e| StepFailure::new(ErrorKind::RoutingUpdateFailed, e.to_string()))?;
            Ok(None)
        }
    }

    /// Step 5: real writes against both new primaries, keyed by a fresh
    /// token. Routing is not reverted on failure.
    fn validation_step(
        &self,
        target: &RegionConfig,
    ) -> impl std::future::Future<Output = StepResult> + Send + 'static {
        let relational = Arc::clone(&self.relational);
        let cache = Arc::clone(&self.cache);
        let relational_endpoint = target.relational_endpoint.clone();
        let cache_endpoint = target.cache_endpoint.clone();
        let budget = self.config.step_budgets.validate;

        async move {
            let token = Uuid::new_v4();

            relational
                .validation_write(&relational_endpoint, token, budget)
                .await
                .map_err(|e| {
                    StepFailure::new(
                        ErrorKind::ValidationFailed,
                        format!("relational validation: {e}"),
                    )
                })?;

            cache
                .validation_round_trip(&cache_endpoint, token, budget)
                .await
                .map_err(|e| {
                    StepFailure::new(ErrorKind::ValidationFailed, format!("cache validation: {e}"))
                })?;

            Ok(Some(StepDetail::validation_token(token)))
        }
    }
}
