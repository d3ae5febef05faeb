//! The routing record: the authoritative statement of the active region and
//! its primary endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Versioned snapshot of current routing authority.
///
/// Updates are totally ordered; `version` increases by one per successful
/// failover, which lets readers cache-invalidate on change. Snapshots are
/// always self-consistent: all three topology fields were written together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRecord {
    pub active_region: String,
    pub relational_primary: String,
    pub cache_master: String,
    pub version: u64,
    pub updated_at: DateTime<Utc>,
}

impl RoutingRecord {
    pub fn new(
        active_region: impl Into<String>,
        relational_primary: impl Into<String>,
        cache_master: impl Into<String>,
    ) -> Self {
        Self {
            active_region: active_region.into(),
            relational_primary: relational_primary.into(),
            cache_master: cache_master.into(),
            version: 1,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_starts_at_version_one() {
        let record = RoutingRecord::new("region1", "postgres://a", "redis://b");
        assert_eq!(record.version, 1);
        assert_eq!(record.active_region, "region1");
    }

    #[test]
    fn test_routing_record_serde_shape() {
        let record = RoutingRecord::new("region1", "postgres://a", "redis://b");
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["active_region"], "region1");
        assert_eq!(json["relational_primary"], "postgres://a");
        assert_eq!(json["cache_master"], "redis://b");
        assert_eq!(json["version"], 1);
    }
}
