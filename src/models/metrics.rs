//! Derived metrics over stored failover records.

use crate::models::record::FailoverRecord;
use serde::{Deserialize, Serialize};

/// Point-in-time aggregate over the history store, computed on demand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub mean_duration_ms: f64,
    pub median_duration_ms: u64,
    pub p99_duration_ms: u64,
    /// Fraction of attempts with `sla_compliant = true`.
    pub compliance_rate: f64,
}

impl MetricsSnapshot {
    pub fn empty() -> Self {
        Self {
            total: 0,
            successful: 0,
            failed: 0,
            mean_duration_ms: 0.0,
            median_duration_ms: 0,
            p99_duration_ms: 0,
            compliance_rate: 0.0,
        }
    }

    /// Aggregate a set of records. O(n log n) on the stored bound.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FailoverRecord>,
    {
        let records: Vec<&FailoverRecord> = records.into_iter().collect();
        if records.is_empty() {
            return Self::empty();
        }

        let total = records.len();
        let successful = records.iter().filter(|r| r.success).count();
        let compliant = records.iter().filter(|r| r.sla_compliant).count();

        let mut durations: Vec<u64> = records.iter().map(|r| r.total_duration_ms).collect();
        durations.sort_unstable();

        let sum: u64 = durations.iter().sum();

        Self {
            total,
            successful,
            failed: total - successful,
            mean_duration_ms: sum as f64 / total as f64,
            median_duration_ms: percentile(&durations, 50),
            p99_duration_ms: percentile(&durations, 99),
            compliance_rate: compliant as f64 / total as f64,
        }
    }
}

/// Nearest-rank percentile over an ascending-sorted slice.
fn percentile(sorted: &[u64], pct: u32) -> u64 {
    debug_assert!(!sorted.is_empty());
    let rank = (pct as usize * sorted.len()).div_ceil(100);
    sorted[rank.saturating_sub(1).min(sorted.len() - 1)]
}
