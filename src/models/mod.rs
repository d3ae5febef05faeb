//! Domain data model: step and failover records, the routing record, and
//! derived metrics.

pub mod metrics;
pub mod record;
pub mod routing;

pub use metrics::MetricsSnapshot;
pub use record::{
    FailoverError, FailoverRecord, FailoverSummary, StepDetail, StepName, StepOutcome, StepRecord,
};
pub use routing::RoutingRecord;
