//! History and metrics store.
//!
//! Append-only log of sealed failover records with bounded capacity and
//! oldest-first eviction. Metrics are derived on demand. Optionally mirrors
//! each sealed record to an append-only JSONL file for post-mortem use; the
//! file is never rewritten and never read back for correctness.

use crate::models::{FailoverRecord, MetricsSnapshot};
use std::collections::VecDeque;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::warn;

pub struct FailoverHistory {
    records: RwLock<VecDeque<FailoverRecord>>,
    capacity: usize,
    persist_path: Option<PathBuf>,
}

impl FailoverHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::with_capacity(capacity.min(64))),
            capacity,
            persist_path: None,
        }
    }

    pub fn with_persistence(capacity: usize, path: PathBuf) -> Self {
        Self {
            persist_path: Some(path),
            ..Self::new(capacity)
        }
    }

    /// Append a sealed record, evicting the oldest when the insertion would
    /// exceed capacity. Persistence failures are logged, not propagated;
    /// the in-memory store is the source of truth.
    pub async fn append(&self, record: FailoverRecord) {
        if let Some(path) = &self.persist_path {
            if let Err(e) = persist_record(path, &record).await {
                warn!(path = %path.display(), error = %e, "Failed to persist failover record");
            }
        }

        let mut records = self.records.write().await;
        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(record);
    }

    /// Most recent records, newest first.
    pub async fn recent(&self, limit: usize) -> Vec<FailoverRecord> {
        let records = self.records.read().await;
        records.iter().rev().take(limit).cloned().collect()
    }

    pub async fn last(&self) -> Option<FailoverRecord> {
        self.records.read().await.back().cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Point-in-time metrics over every stored record.
    pub async fn summary(&self) -> MetricsSnapshot {
        let records = self.records.read().await;
        MetricsSnapshot::from_records(records.iter())
    }
}

async fn persist_record(path: &PathBuf, record: &FailoverRecord) -> std::io::Result<()> {
    let mut line = serde_json::to_string(record)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    line.push('\n');

    let mut file = tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn record(duration_ms: u64, success: bool) -> FailoverRecord {
        FailoverRecord {
            id: Uuid::new_v4(),
            source_region: "region1".to_string(),
            target_region: "region2".to_string(),
            triggered_at: Utc::now(),
            completed_at: Utc::now(),
            success,
            total_duration_ms: duration_ms,
            sla_compliant: success && duration_ms < 5000,
            steps: vec![],
            error: None,
        }
    }

    #[tokio::test]
    async fn test_append_and_recent_ordering() {
        let history = FailoverHistory::new(10);
        history.append(record(100, true)).await;
        history.append(record(200, true)).await;
        history.append(record(300, false)).await;

        let recent = history.recent(2).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].total_duration_ms, 300);
        assert_eq!(recent[1].total_duration_ms, 200);
    }

    #[tokio::test]
    async fn test_eviction_happens_exactly_at_capacity() {
        let history = FailoverHistory::new(3);
        for duration in [1, 2, 3] {
            history.append(record(duration, true)).await;
        }
        // At capacity, nothing evicted yet
        assert_eq!(history.len().await, 3);
        assert_eq!(history.recent(10).await.last().unwrap().total_duration_ms, 1);

        // The insertion that would exceed capacity evicts the oldest
        history.append(record(4, true)).await;
        assert_eq!(history.len().await, 3);
        assert_eq!(history.recent(10).await.last().unwrap().total_duration_ms, 2);
    }

    #[tokio::test]
    async fn test_appended_record_reads_back_equal() {
        let history = FailoverHistory::new(10);
        let sealed = record(1234, true);
        history.append(sealed.clone()).await;

        let first_read = history.last().await.unwrap();
        let second_read = history.last().await.unwrap();
        assert_eq!(first_read, sealed);
        assert_eq!(second_read, sealed);
    }

    #[tokio::test]
    async fn test_summary_over_records() {
        let history = FailoverHistory::new(10);
        history.append(record(1000, true)).await;
        history.append(record(2000, true)).await;
        history.append(record(6000, false)).await;

        let summary = history.summary().await;
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.mean_duration_ms, 3000.0);
        assert!((summary.compliance_rate - 2.0 / 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_persistence_appends_jsonl() {
        let dir = std::env::temp_dir().join(format!("failover-history-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("history.jsonl");

        let history = FailoverHistory::with_persistence(10, path.clone());
        history.append(record(100, true)).await;
        history.append(record(200, false)).await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let parsed: FailoverRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(parsed.total_duration_ms, 200);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
