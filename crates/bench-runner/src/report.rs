//! Scenario report types.

use crate::distributor::StorageReport;
use crate::executor::PairState;
use crate::metrics::{Metric, RunRecord};
use crate::stats::AggregatedMetric;
use crate::validate::ValidationOutcome;
use bench_core::ScenarioSpec;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// How a scenario ended. Maps one-to-one to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalStatus {
    Success,
    ValidationMismatch,
    EnvironmentError,
    ConfigurationError,
    ResourceError,
    Cancelled,
}

impl TerminalStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            TerminalStatus::Success => 0,
            TerminalStatus::ConfigurationError => 2,
            TerminalStatus::ValidationMismatch => 3,
            TerminalStatus::EnvironmentError => 4,
            TerminalStatus::ResourceError => 5,
            TerminalStatus::Cancelled => 130,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TerminalStatus::Success)
    }
}

impl std::fmt::Display for TerminalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TerminalStatus::Success => "SUCCESS",
            TerminalStatus::ValidationMismatch => "VALIDATION MISMATCH",
            TerminalStatus::EnvironmentError => "ENVIRONMENT ERROR",
            TerminalStatus::ConfigurationError => "CONFIGURATION ERROR",
            TerminalStatus::ResourceError => "RESOURCE ERROR",
            TerminalStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Phase in which a schema dropped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePhase {
    Create,
    PostCreate,
    Load,
    Finalize,
}

/// A schema excluded from the rest of the scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaFailure {
    pub schema: String,
    pub table: String,
    pub phase: FailurePhase,
    pub error: String,
}

/// Measurements and outcome of one (query, schema) pair.
#[derive(Debug, Clone, Serialize)]
pub struct PairReport {
    pub query: String,
    pub schema: String,
    pub table: String,
    pub final_state: PairState,
    pub runs: Vec<RunRecord>,
    pub incomplete_runs: usize,
    pub aggregates: BTreeMap<Metric, AggregatedMetric>,
    pub error: Option<String>,
}

impl PairReport {
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Scenario and service facts captured for the environment artifact.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioSnapshot {
    pub scenario: ScenarioSpec,
    pub launcher: String,
    pub endpoint: Option<String>,
    pub service_version: Option<String>,
    pub estimated_bytes_per_schema: u64,
}

/// Everything a scenario produced.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioReport {
    pub scenario: String,
    pub status: TerminalStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub snapshot: ScenarioSnapshot,
    pub storage: Vec<StorageReport>,
    pub pairs: Vec<PairReport>,
    pub validations: Vec<ValidationOutcome>,
    pub schema_failures: Vec<SchemaFailure>,
    pub errors: Vec<String>,
}

impl ScenarioReport {
    /// Multi-line human summary.
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "Scenario Report: {}\n\
             ================\n\
             Status: {}\n\
             Schemas: {}\n\
             Queries: {}\n\
             Rows: {}\n",
            self.scenario,
            self.status,
            self.snapshot
                .scenario
                .schemas
                .iter()
                .map(|s| s.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            self.snapshot.scenario.queries.len(),
            self.snapshot.scenario.params.row_count,
        );

        if !self.storage.is_empty() {
            summary.push_str("\nStorage:\n");
            for s in &self.storage {
                summary.push_str(&format!(
                    "  {}: {} compressed, {} uncompressed (estimate {}, x{:.2})\n",
                    s.schema,
                    s.compressed_bytes,
                    s.uncompressed_bytes,
                    s.estimated_bytes,
                    s.estimate_ratio
                ));
            }
        }

        if !self.pairs.is_empty() {
            summary.push_str("\nQueries (wall time ms, p50 / p95):\n");
            for pair in &self.pairs {
                match (&pair.error, pair.aggregates.get(&Metric::WallTimeMs)) {
                    (Some(e), _) => summary.push_str(&format!(
                        "  {} on {}: FAILED ({e})\n",
                        pair.query, pair.schema
                    )),
                    (None, Some(wall)) => summary.push_str(&format!(
                        "  {} on {}: {:.2} / {:.2}\n",
                        pair.query, pair.schema, wall.p50, wall.p95
                    )),
                    (None, None) => summary.push_str(&format!(
                        "  {} on {}: no complete runs\n",
                        pair.query, pair.schema
                    )),
                }
            }
        }

        let mismatched: Vec<&ValidationOutcome> =
            self.validations.iter().filter(|v| !v.matched).collect();
        if !mismatched.is_empty() {
            summary.push_str("\nValidation mismatches:\n");
            for outcome in mismatched {
                for m in &outcome.mismatches {
                    summary.push_str(&format!(
                        "  {}: {} vs {} ({} vs {} rows)\n",
                        outcome.query, m.left, m.right, m.left_rows, m.right_rows
                    ));
                }
            }
        }

        if !self.schema_failures.is_empty() || !self.errors.is_empty() {
            summary.push_str("\nErrors:\n");
            for f in &self.schema_failures {
                summary.push_str(&format!(
                    "  schema {} ({:?}): {}\n",
                    f.schema, f.phase, f.error
                ));
            }
            for e in &self.errors {
                summary.push_str(&format!("  {e}\n"));
            }
        }

        summary
    }
}

/// Writes a finished report somewhere durable.
pub trait ReportSink: Send + Sync {
    /// Export the report; returns the location of the written artifacts.
    fn export(&self, report: &ScenarioReport) -> std::io::Result<PathBuf>;
}

/// What one orchestration pass returns to its caller.
#[derive(Debug)]
pub struct ScenarioOutcome {
    pub status: TerminalStatus,
    /// Absent when the scenario stopped before a service was started.
    pub report: Option<ScenarioReport>,
    pub artifacts: Option<PathBuf>,
    /// Error that ended the scenario early, if any.
    pub error: Option<String>,
}
