//! Redis Sentinel client.
//!
//! Talks the sentinel text protocol against every configured sentinel and
//! treats the quorum as the sole authority on cache leadership. Client
//! handles are created at orchestrator start; connections are established
//! per call and bounded by the probe timeout.

use crate::error::SentinelError;
use crate::probes::{CacheLeadership, SentinelResult};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use uuid::Uuid;

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const FAILOVER_CAP: Duration = Duration::from_secs(2);

pub struct SentinelClient {
    sentinels: Vec<(String, redis::Client)>,
    call_timeout: Duration,
}

impl SentinelClient {
    pub fn new(endpoints: &[String], call_timeout: Duration) -> SentinelResult<Self> {
        let mut sentinels = Vec::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let client = redis::Client::open(endpoint.as_str()).map_err(|e| {
                SentinelError::Command(format!("invalid sentinel endpoint {endpoint}: {e}"))
            })?;
            sentinels.push((endpoint.clone(), client));
        }
        Ok(Self {
            sentinels,
            call_timeout,
        })
    }

    async fn connect(&self, client: &redis::Client) -> Option<MultiplexedConnection> {
        match tokio::time::timeout(self.call_timeout, client.get_multiplexed_async_connection())
            .await
        {
            Ok(Ok(conn)) => Some(conn),
            Ok(Err(e)) => {
                debug!(error = %e, "Sentinel connection failed");
                None
            }
            Err(_) => None,
        }
    }

    /// Ask one sentinel for the master address. `None` when the sentinel is
    /// down or does not know the service.
    async fn master_addr_from(
        &self,
        endpoint: &str,
        client: &redis::Client,
        service_name: &str,
    ) -> Option<String> {
        let mut conn = self.connect(client).await?;
        let reply = tokio::time::timeout(
            self.call_timeout,
            redis::cmd("SENTINEL")
                .arg("GET-MASTER-ADDR-BY-NAME")
                .arg(service_name)
                .query_async::<Option<(String, String)>>(&mut conn),
        )
        .await;

        match reply {
            Ok(Ok(Some((host, port)))) => Some(format!("redis://{host}:{port}")),
            Ok(Ok(None)) => {
                warn!(sentinel = endpoint, service = service_name, "Sentinel does not track service");
                None
            }
            Ok(Err(e)) => {
                warn!(sentinel = endpoint, error = %e, "Master address query failed");
                None
            }
            Err(_) => None,
        }
    }

    /// Issue `SENTINEL FAILOVER` on the first sentinel that accepts it.
    async fn issue_failover(&self, service_name: &str) -> SentinelResult<()> {
        let mut last_error = None;
        for (endpoint, client) in &self.sentinels {
            let Some(mut conn) = self.connect(client).await else {
                continue;
            };
            let reply = tokio::time::timeout(
                self.call_timeout,
                redis::cmd("SENTINEL")
                    .arg("FAILOVER")
                    .arg(service_name)
                    .query_async::<String>(&mut conn),
            )
            .await;

            match reply {
                Ok(Ok(_)) => {
                    debug!(sentinel = endpoint, service = service_name, "Failover command accepted");
                    return Ok(());
                }
                Ok(Err(e)) => {
                    warn!(sentinel = endpoint, error = %e, "Failover command rejected");
                    last_error = Some(e.to_string());
                }
                Err(_) => last_error = Some("failover command timed out".to_string()),
            }
        }

        match last_error {
            Some(e) => Err(SentinelError::Command(e)),
            None => Err(SentinelError::QuorumUnavailable(
                "no sentinel accepted the failover command".to_string(),
            )),
        }
    }
}

#[async_trait]
impl CacheLeadership for SentinelClient {
    async fn current_master(&self, service_name: &str) -> SentinelResult<String> {
        let mut answers = Vec::new();
        for (endpoint, client) in &self.sentinels {
            if let Some(addr) = self.master_addr_from(endpoint, client, service_name).await {
                answers.push(addr);
            }
        }

        let Some(first) = answers.first().cloned() else {
            return Err(SentinelError::QuorumUnavailable(
                "no sentinel answered the master address query".to_string(),
            ));
        };

        if answers.iter().any(|a| *a != first) {
            return Err(SentinelError::QuorumDisagreement(format!(
                "advertised masters: {}",
                answers.join(", ")
            )));
        }

        Ok(first)
    }

    async fn request_failover(
        &self,
        service_name: &str,
        budget: Duration,
    ) -> SentinelResult<String> {
        let deadline = Instant::now() + budget.min(FAILOVER_CAP);
        let previous = self.current_master(service_name).await?;

        self.issue_failover(service_name).await?;

        loop {
            tokio::time::sleep(POLL_INTERVAL).await;
            if let Ok(current) = self.current_master(service_name).await {
                if current != previous {
                    return Ok(current);
                }
            }
            if Instant::now() >= deadline {
                return Err(SentinelError::FailoverIncomplete(format!(
                    "master still {previous}"
                )));
            }
        }
    }

    async fn check_reachable(&self, endpoint: &str) -> SentinelResult<()> {
        let client = redis::Client::open(endpoint)
            .map_err(|e| SentinelError::Unreachable(format!("invalid endpoint: {e}")))?;
        let Some(mut conn) = self.connect(&client).await else {
            return Err(SentinelError::Unreachable(endpoint.to_string()));
        };

        let reply = tokio::time::timeout(
            self.call_timeout,
            redis::cmd("PING").query_async::<String>(&mut conn),
        )
        .await;

        match reply {
            Ok(Ok(pong)) if pong == "PONG" => Ok(()),
            Ok(Ok(other)) => Err(SentinelError::Command(format!(
                "unexpected ping reply: {other}"
            ))),
            Ok(Err(e)) => Err(SentinelError::Unreachable(e.to_string())),
            Err(_) => Err(SentinelError::Unreachable(endpoint.to_string())),
        }
    }

    async fn validation_round_trip(
        &self,
        master_endpoint: &str,
        token: Uuid,
        budget: Duration,
    ) -> SentinelResult<()> {
        let client = redis::Client::open(master_endpoint)
            .map_err(|e| SentinelError::Unreachable(format!("invalid endpoint: {e}")))?;

        let key = format!("failover:validation:{token}");
        let value = token.to_string();

        let fut = async {
            let mut conn = client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| SentinelError::Unreachable(e.to_string()))?;

            redis::cmd("SET")
                .arg(&key)
                .arg(&value)
                .arg("PX")
                .arg(60_000)
                .query_async::<String>(&mut conn)
                .await
                .map_err(|e| SentinelError::Command(format!("validation SET failed: {e}")))?;

            let read_back: Option<String> = redis::cmd("GET")
                .arg(&key)
                .query_async(&mut conn)
                .await
                .map_err(|e| SentinelError::Command(format!("validation GET failed: {e}")))?;

            if read_back.as_deref() == Some(value.as_str()) {
                Ok(())
            } else {
                Err(SentinelError::Command(format!(
                    "validation read-back mismatch for {key}"
                )))
            }
        };

        match tokio::time::timeout(budget, fut).await {
            Ok(result) => result,
            Err(_) => Err(SentinelError::Unreachable(format!(
                "validation round-trip timed out after {} ms",
                budget.as_millis()
            ))),
        }
    }
}
