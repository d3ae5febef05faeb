//! Shared test infrastructure: scriptable mock probes and a spawned-server
//! harness for driving the control API over real HTTP.
#![allow(dead_code)]

use async_trait::async_trait;
use failover_core::config::OrchestratorConfig;
use failover_core::error::{ProbeError, SentinelError};
use failover_core::probes::{
    CacheLeadership, ProbeResult, RecoveryState, RelationalProbe, SentinelResult,
};
use failover_core::web;
use failover_core::web::state::AppState;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

/// Scriptable behaviour for the mock relational probe.
#[derive(Debug, Clone)]
struct RelationalBehaviour {
    reachable: bool,
    recovery_state: RecoveryState,
    lag: Option<Duration>,
    fail_promotion: bool,
    promote_delay: Duration,
    fail_validation: bool,
    validation_delay: Duration,
}

impl Default for RelationalBehaviour {
    fn default() -> Self {
        Self {
            reachable: true,
            recovery_state: RecoveryState::Standby,
            lag: Some(Duration::from_millis(200)),
            fail_promotion: false,
            promote_delay: Duration::ZERO,
            fail_validation: false,
            validation_delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Default)]
struct RelationalState {
    behaviour: RelationalBehaviour,
    calls: Vec<String>,
}

/// Mock relational probe tracking calls and simulating a healthy standby by
/// default.
pub struct MockRelationalProbe {
    state: Arc<Mutex<RelationalState>>,
}

impl MockRelationalProbe {
    pub fn healthy() -> Self {
        Self {
            state: Arc::new(Mutex::new(RelationalState {
                behaviour: RelationalBehaviour::default(),
                calls: Vec::new(),
            })),
        }
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().behaviour.reachable = reachable;
    }

    pub fn set_recovery_state(&self, state: RecoveryState) {
        self.state.lock().unwrap().behaviour.recovery_state = state;
    }

    pub fn set_lag(&self, lag: Option<Duration>) {
        self.state.lock().unwrap().behaviour.lag = lag;
    }

    pub fn fail_promotion(&self) {
        self.state.lock().unwrap().behaviour.fail_promotion = true;
    }

    pub fn set_promote_delay(&self, delay: Duration) {
        self.state.lock().unwrap().behaviour.promote_delay = delay;
    }

    pub fn fail_validation(&self) {
        self.state.lock().unwrap().behaviour.fail_validation = true;
    }

    pub fn set_validation_delay(&self, delay: Duration) {
        self.state.lock().unwrap().behaviour.validation_delay = delay;
    }

    pub fn recovery_state_now(&self) -> RecoveryState {
        self.state.lock().unwrap().behaviour.recovery_state
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record_call(&self, name: &str) -> RelationalBehaviour {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name.to_string());
        state.behaviour.clone()
    }
}

#[async_trait]
impl RelationalProbe for MockRelationalProbe {
    async fn check_reachable(&self, _endpoint: &str) -> ProbeResult<()> {
        let behaviour = self.record_call("check_reachable");
        if behaviour.reachable {
            Ok(())
        } else {
            Err(ProbeError::Unreachable("connection refused".to_string()))
        }
    }

    async fn recovery_state(&self, _endpoint: &str) -> RecoveryState {
        self.record_call("recovery_state").recovery_state
    }

    async fn replication_lag(
        &self,
        _primary: &str,
        _standby: &str,
    ) -> ProbeResult<Option<Duration>> {
        Ok(self.record_call("replication_lag").lag)
    }

    async fn promote(&self, _endpoint: &str, _budget: Duration) -> ProbeResult<()> {
        let behaviour = self.record_call("promote");
        if !behaviour.promote_delay.is_zero() {
            tokio::time::sleep(behaviour.promote_delay).await;
        }
        if behaviour.fail_promotion {
            return Err(ProbeError::Promotion("pg_promote refused".to_string()));
        }
        self.state.lock().unwrap().behaviour.recovery_state = RecoveryState::Primary;
        Ok(())
    }

    async fn validation_write(
        &self,
        _endpoint: &str,
        _token: Uuid,
        _budget: Duration,
    ) -> ProbeResult<()> {
        let behaviour = self.record_call("validation_write");
        if !behaviour.validation_delay.is_zero() {
            tokio::time::sleep(behaviour.validation_delay).await;
        }
        if behaviour.fail_validation {
            return Err(ProbeError::Query("insert failed".to_string()));
        }
        Ok(())
    }
}

/// Scriptable behaviour for the mock sentinel client.
#[derive(Debug, Clone)]
struct SentinelBehaviour {
    master: String,
    next_master: String,
    quorum_available: bool,
    endpoints_reachable: bool,
    reject_failover_command: bool,
    stall_failover: bool,
    fail_validation: bool,
}

#[derive(Debug)]
struct SentinelState {
    behaviour: SentinelBehaviour,
    calls: Vec<String>,
}

pub struct MockSentinelClient {
    state: Arc<Mutex<SentinelState>>,
}

impl MockSentinelClient {
    pub fn healthy() -> Self {
        Self {
            state: Arc::new(Mutex::new(SentinelState {
                behaviour: SentinelBehaviour {
                    master: "redis://redis-region1:6379".to_string(),
                    next_master: "redis://redis-region2:6379".to_string(),
                    quorum_available: true,
                    endpoints_reachable: true,
                    reject_failover_command: false,
                    stall_failover: false,
                    fail_validation: false,
                },
                calls: Vec::new(),
            })),
        }
    }

    pub fn set_quorum_available(&self, available: bool) {
        self.state.lock().unwrap().behaviour.quorum_available = available;
    }

    pub fn set_endpoints_reachable(&self, reachable: bool) {
        self.state.lock().unwrap().behaviour.endpoints_reachable = reachable;
    }

    pub fn reject_failover_command(&self) {
        self.state.lock().unwrap().behaviour.reject_failover_command = true;
    }

    /// Sentinel accepts the failover command but the master never changes.
    pub fn stall_failover(&self) {
        self.state.lock().unwrap().behaviour.stall_failover = true;
    }

    pub fn fail_validation(&self) {
        self.state.lock().unwrap().behaviour.fail_validation = true;
    }

    pub fn current_master_now(&self) -> String {
        self.state.lock().unwrap().behaviour.master.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    fn record_call(&self, name: &str) -> SentinelBehaviour {
        let mut state = self.state.lock().unwrap();
        state.calls.push(name.to_string());
        state.behaviour.clone()
    }
}

#[async_trait]
impl CacheLeadership for MockSentinelClient {
    async fn current_master(&self, _service_name: &str) -> SentinelResult<String> {
        let behaviour = self.record_call("current_master");
        if behaviour.quorum_available {
            Ok(behaviour.master)
        } else {
            Err(SentinelError::QuorumUnavailable(
                "no sentinel answered".to_string(),
            ))
        }
    }

    async fn request_failover(
        &self,
        _service_name: &str,
        budget: Duration,
    ) -> SentinelResult<String> {
        let behaviour = self.record_call("request_failover");
        if !behaviour.quorum_available {
            return Err(SentinelError::QuorumUnavailable(
                "no sentinel answered".to_string(),
            ));
        }
        if behaviour.reject_failover_command {
            return Err(SentinelError::Command("NOGOODSLAVE".to_string()));
        }
        if behaviour.stall_failover {
            // Burn half the budget polling, then give up, so the failure is
            // attributed to the sentinel rather than the step deadline
            tokio::time::sleep(budget / 2).await;
            return Err(SentinelError::FailoverIncomplete(format!(
                "master still {}",
                behaviour.master
            )));
        }

        let mut state = self.state.lock().unwrap();
        state.behaviour.master = state.behaviour.next_master.clone();
        Ok(state.behaviour.master.clone())
    }

    async fn check_reachable(&self, endpoint: &str) -> SentinelResult<()> {
        let behaviour = self.record_call("check_reachable");
        if behaviour.endpoints_reachable {
            Ok(())
        } else {
            Err(SentinelError::Unreachable(endpoint.to_string()))
        }
    }

    async fn validation_round_trip(
        &self,
        _master_endpoint: &str,
        _token: Uuid,
        _budget: Duration,
    ) -> SentinelResult<()> {
        let behaviour = self.record_call("validation_round_trip");
        if behaviour.fail_validation {
            return Err(SentinelError::Command("read-back mismatch".to_string()));
        }
        Ok(())
    }
}

/// Two-region config pointing at mock endpoints.
pub fn test_config() -> OrchestratorConfig {
    let mut config = OrchestratorConfig::default();
    config.regions = HashMap::from([
        (
            "region1".to_string(),
            failover_core::config::RegionConfig {
                relational_endpoint: "postgres://pg-region1:5432/app".to_string(),
                cache_endpoint: "redis://redis-region1:6379".to_string(),
            },
        ),
        (
            "region2".to_string(),
            failover_core::config::RegionConfig {
                relational_endpoint: "postgres://pg-region2:5432/app".to_string(),
                cache_endpoint: "redis://redis-region2:6379".to_string(),
            },
        ),
    ]);
    config.sentinel_endpoints = vec!["redis://sentinel:26379".to_string()];
    config.history_capacity = 100;
    config
}

pub struct TestHarness {
    pub state: AppState,
    pub relational: Arc<MockRelationalProbe>,
    pub cache: Arc<MockSentinelClient>,
}

/// Assemble the orchestrator around mock probes.
pub fn harness(config: OrchestratorConfig) -> TestHarness {
    let relational = Arc::new(MockRelationalProbe::healthy());
    let cache = Arc::new(MockSentinelClient::healthy());

    let state = AppState::build(
        Arc::new(config),
        Arc::clone(&relational) as Arc<dyn RelationalProbe>,
        Arc::clone(&cache) as Arc<dyn CacheLeadership>,
    )
    .expect("harness assembly failed");

    TestHarness {
        state,
        relational,
        cache,
    }
}

/// Serve the control API on an ephemeral port, returning its base URL.
pub async fn spawn_server(state: AppState) -> String {
    let app = web::create_app(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test listener");
    let addr = listener.local_addr().expect("listener has no local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test server failed");
    });

    format!("http://{addr}")
}
