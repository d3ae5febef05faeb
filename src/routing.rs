//! Routing registry: the single piece of mutable shared state touched
//! during failover.
//!
//! Readers take atomic snapshots; the swap path is guarded by an atomic
//! gate so a second concurrent writer is refused instead of queued. The
//! coordinator is the only component that invokes [`RoutingRegistry::swap`].

use crate::error::RoutingError;
use crate::models::RoutingRecord;
use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::RwLock;
use tracing::info;

pub struct RoutingRegistry {
    record: RwLock<RoutingRecord>,
    swap_gate: AtomicBool,
}

/// Releases the swap gate when the claim goes out of scope, including on
/// cancellation mid-swap.
struct SwapClaim<'a>(&'a AtomicBool);

impl Drop for SwapClaim<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl RoutingRegistry {
    pub fn new(
        active_region: impl Into<String>,
        relational_primary: impl Into<String>,
        cache_master: impl Into<String>,
    ) -> Self {
        Self {
            record: RwLock::new(RoutingRecord::new(
                active_region,
                relational_primary,
                cache_master,
            )),
            swap_gate: AtomicBool::new(false),
        }
    }

    /// Self-consistent snapshot of the current routing authority.
    pub async fn read(&self) -> RoutingRecord {
        self.record.read().await.clone()
    }

    /// Atomically replace the active region and both endpoints, bumping the
    /// version. Fails with `Busy` when another swap is in flight.
    pub async fn swap(
        &self,
        active_region: &str,
        relational_primary: &str,
        cache_master: &str,
    ) -> Result<RoutingRecord, RoutingError> {
        if self
            .swap_gate
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(RoutingError::Busy);
        }
        let _claim = SwapClaim(&self.swap_gate);

        let mut record = self.record.write().await;
        record.active_region = active_region.to_string();
        record.relational_primary = relational_primary.to_string();
        record.cache_master = cache_master.to_string();
        record.version += 1;
        record.updated_at = Utc::now();

        let snapshot = record.clone();
        drop(record);

        info!(
            active_region = active_region,
            version = snapshot.version,
            "Routing authority updated"
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> RoutingRegistry {
        RoutingRegistry::new("region1", "postgres://r1", "redis://r1")
    }

    #[tokio::test]
    async fn test_swap_replaces_all_fields_and_bumps_version() {
        let registry = registry();
        let before = registry.read().await;

        let after = registry
            .swap("region2", "postgres://r2", "redis://r2")
            .await
            .unwrap();

        assert_eq!(after.version, before.version + 1);
        assert_eq!(after.active_region, "region2");
        assert_eq!(after.relational_primary, "postgres://r2");
        assert_eq!(after.cache_master, "redis://r2");
        assert!(after.updated_at >= before.updated_at);
        assert_eq!(registry.read().await, after);
    }

    #[tokio::test]
    async fn test_versions_are_strictly_increasing() {
        let registry = registry();
        let mut last = registry.read().await.version;
        for target in ["region2", "region1", "region2"] {
            let record = registry
                .swap(target, "postgres://x", "redis://x")
                .await
                .unwrap();
            assert_eq!(record.version, last + 1);
            last = record.version;
        }
    }

    #[tokio::test]
    async fn test_second_concurrent_swap_is_refused() {
        let registry = registry();

        // Claim the gate as an in-flight swap would
        registry.swap_gate.store(true, Ordering::Release);
        let result = registry.swap("region2", "postgres://r2", "redis://r2").await;
        assert_eq!(result, Err(RoutingError::Busy));

        // Release and verify the registry recovers
        registry.swap_gate.store(false, Ordering::Release);
        assert!(registry
            .swap("region2", "postgres://r2", "redis://r2")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_readers_observe_consistent_snapshots() {
        let registry = registry();
        registry
            .swap("region2", "postgres://r2", "redis://r2")
            .await
            .unwrap();

        let snapshot = registry.read().await;
        // All three topology fields travel together
        assert_eq!(snapshot.active_region, "region2");
        assert!(snapshot.relational_primary.ends_with("r2"));
        assert!(snapshot.cache_master.ends_with("r2"));
    }
}
