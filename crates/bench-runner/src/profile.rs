//! Merge execution-log counters into run records.

use crate::executor::FlushBarrier;
use crate::metrics::{RunRecord, RunStatus};
use bench_core::{BenchService, ServiceError};
use tracing::warn;

/// Outcome of one collection pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub complete: usize,
    pub incomplete: usize,
}

/// Fetch the profiles of the runs behind `barrier` and merge them into
/// `records`. Runs missing from the log are marked incomplete.
pub async fn collect_profiles(
    service: &dyn BenchService,
    barrier: &FlushBarrier,
    records: &mut [RunRecord],
) -> Result<CollectionSummary, ServiceError> {
    let mut profiles = service.fetch_profiles(barrier.run_ids()).await?;
    let mut summary = CollectionSummary::default();

    for record in records.iter_mut() {
        match profiles.remove(&record.run_id) {
            Some(counters) => {
                record.profile = Some(counters);
                record.status = RunStatus::Complete;
                summary.complete += 1;
            }
            None => {
                warn!(
                    "Run {} of {}/{} missing from the query log; excluded from aggregation",
                    record.run_id, record.query, record.schema
                );
                record.status = RunStatus::Incomplete;
                summary.incomplete += 1;
            }
        }
    }
    Ok(summary)
}
