//! Scenario orchestration engine for schema-bench.
//!
//! Takes a resolved [`bench_core::ScenarioSpec`] through one benchmarking pass:
//! 1. Check free disk space against the dataset estimate
//! 2. Start a service instance through a [`ServiceLauncher`]
//! 3. Create one table per schema and load identical batches into all of them
//! 4. Compact and measure storage
//! 5. Run every (query, schema) pair with cold caches, one pair at a time
//! 6. Attach query-log profiles, aggregate metrics, cross-check results
//! 7. Tear the instance down and hand the report to a [`ReportSink`]
//!
//! # Example
//!
//! ```ignore
//! use bench_runner::Orchestrator;
//!
//! let orchestrator = Orchestrator::new(launcher, disk_probe, exporter)
//!     .with_cancellation(ctrl_c_token);
//! let outcome = orchestrator.run(&scenario).await;
//! std::process::exit(outcome.status.exit_code());
//! ```

pub mod distributor;
pub mod error;
pub mod executor;
pub mod lifecycle;
pub mod metrics;
pub mod orchestrator;
pub mod profile;
pub mod report;
pub mod stats;
pub mod validate;

#[cfg(test)]
pub(crate) mod testing;

pub use distributor::{LoadSummary, StorageReport, TableLoad};
pub use error::BenchError;
pub use executor::{PairExecutor, PairState};
pub use lifecycle::{DiskProbe, ServiceGuard, ServiceInstance, ServiceLauncher};
pub use metrics::{Metric, RunRecord, RunStatus};
pub use orchestrator::Orchestrator;
pub use report::{
    FailurePhase, PairReport, ReportSink, ScenarioOutcome, ScenarioReport, ScenarioSnapshot,
    SchemaFailure, TerminalStatus,
};
pub use stats::AggregatedMetric;
pub use validate::{RowDiff, SchemaMismatch, ValidationOutcome};
