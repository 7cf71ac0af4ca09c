//! Scenario orchestration.
//!
//! One pass runs the phases in order:
//!
//! ```text
//! disk check ─► start service ─► create schemas ─► load ─► finalize storage
//!                    │                                            │
//!                    │        ┌───────────────────────────────────┘
//!                    │        ▼
//!                    │   benchmark matrix (query-major, one pair at a time)
//!                    │        │
//!                    │        ▼
//!                    │   validation ─► teardown ─► export
//!                    │                    ▲
//!                    └── ServiceGuard ────┘ (also on every early exit)
//! ```
//!
//! Configuration and resource errors stop before the service starts and
//! produce no artifacts. Environment errors drop the affected schema or pair
//! and let siblings continue. Validation mismatches never stop the pass.

use crate::distributor::{finalize_storage, load_tables, LoadTarget};
use crate::error::BenchError;
use crate::executor::PairExecutor;
use crate::lifecycle::{DiskProbe, ServiceGuard, ServiceLauncher};
use crate::metrics::RunStatus;
use crate::profile::collect_profiles;
use crate::report::{
    FailurePhase, PairReport, ReportSink, ScenarioOutcome, ScenarioReport, ScenarioSnapshot,
    SchemaFailure, TerminalStatus,
};
use crate::stats::aggregate_runs;
use crate::validate::validate_query;
use bench_core::{BenchService, ResultSet, ScenarioSpec};
use bench_generator::estimate_dataset_bytes;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// State shared by the phases of one scenario run.
struct RunContext {
    service: Arc<dyn BenchService>,
    /// Held from cache drop through profile collection of each pair, so no
    /// two pairs ever interleave statements against the service.
    exclusive: Mutex<()>,
    cancel: CancellationToken,
}

impl RunContext {
    fn check_cancelled(&self) -> Result<(), BenchError> {
        if self.cancel.is_cancelled() {
            return Err(BenchError::Cancelled);
        }
        Ok(())
    }
}

/// Runs scenarios against instances produced by a launcher.
pub struct Orchestrator {
    launcher: Arc<dyn ServiceLauncher>,
    disk: Arc<dyn DiskProbe>,
    sink: Arc<dyn ReportSink>,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        launcher: Arc<dyn ServiceLauncher>,
        disk: Arc<dyn DiskProbe>,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        Self {
            launcher,
            disk,
            sink,
            cancel: CancellationToken::new(),
        }
    }

    /// Observe `cancel` at batch, phase and pair boundaries.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run one scenario to its terminal status.
    pub async fn run(&self, scenario: &ScenarioSpec) -> ScenarioOutcome {
        let started_at = Utc::now();
        let params = &scenario.params;
        info!(
            "Starting scenario '{}': {} schemas, {} queries, {} rows",
            scenario.name,
            scenario.schemas.len(),
            scenario.queries.len(),
            params.row_count
        );

        let estimated_bytes = estimate_dataset_bytes(&scenario.dataset, params.row_count);
        let required = estimated_bytes.saturating_mul(scenario.schemas.len() as u64);
        if let Err(e) = self.check_disk(required) {
            return early_exit(e);
        }
        if self.cancel.is_cancelled() {
            return early_exit(BenchError::Cancelled);
        }

        let instance = match self.launcher.start().await {
            Ok(instance) => instance,
            Err(e) => return early_exit(BenchError::ServiceStart(e)),
        };
        info!("Service instance {} at {}", instance.id, instance.endpoint);
        let guard = ServiceGuard::new(Arc::clone(&self.launcher), instance);

        let ctx = RunContext {
            service: guard.service(),
            exclusive: Mutex::new(()),
            cancel: self.cancel.clone(),
        };
        let mut report = ScenarioReport {
            scenario: scenario.name.clone(),
            status: TerminalStatus::Success,
            started_at,
            finished_at: started_at,
            snapshot: ScenarioSnapshot {
                scenario: scenario.clone(),
                launcher: self.launcher.describe(),
                endpoint: Some(guard.instance().endpoint.clone()),
                service_version: None,
                estimated_bytes_per_schema: estimated_bytes,
            },
            storage: Vec::new(),
            pairs: Vec::new(),
            validations: Vec::new(),
            schema_failures: Vec::new(),
            errors: Vec::new(),
        };

        let result = self.execute(&ctx, scenario, &mut report).await;
        if let Err(e) = &result {
            match e {
                BenchError::Cancelled => warn!("Scenario '{}' interrupted", scenario.name),
                other => error!("Scenario '{}' aborted: {other}", scenario.name),
            }
            report.errors.push(e.to_string());
        }

        if self.launcher.outlives_run() {
            drop_tables(ctx.service.as_ref(), scenario, &mut report).await;
        }
        drop(ctx);
        if let Err(e) = guard.release() {
            error!("Teardown failed: {e}");
            report.errors.push(format!("teardown failed: {e}"));
        }

        report.finished_at = Utc::now();
        report.status = terminal_status(&result, &report);

        let mut outcome = ScenarioOutcome {
            status: report.status,
            report: None,
            artifacts: None,
            error: result.err().map(|e| e.to_string()),
        };
        match self.sink.export(&report) {
            Ok(path) => {
                info!("Results written to {}", path.display());
                outcome.artifacts = Some(path);
            }
            Err(e) => {
                error!("Export failed: {e}");
                if outcome.status.is_success() || outcome.status == TerminalStatus::ValidationMismatch
                {
                    outcome.status = TerminalStatus::EnvironmentError;
                }
                outcome.error.get_or_insert_with(|| format!("export failed: {e}"));
                report.status = outcome.status;
            }
        }
        info!(
            "Scenario '{}' finished: {}",
            scenario.name, outcome.status
        );
        outcome.report = Some(report);
        outcome
    }

    fn check_disk(&self, required: u64) -> Result<(), BenchError> {
        let location = self.disk.location();
        let available = self
            .disk
            .available_bytes()
            .map_err(|source| BenchError::DiskProbe {
                location: location.clone(),
                source,
            })?;
        info!("Disk at {location}: {available} bytes available, {required} required");
        if available < required {
            return Err(BenchError::InsufficientDisk {
                location,
                required,
                available,
            });
        }
        Ok(())
    }

    async fn execute(
        &self,
        ctx: &RunContext,
        scenario: &ScenarioSpec,
        report: &mut ScenarioReport,
    ) -> Result<(), BenchError> {
        let service = ctx.service.as_ref();
        let params = &scenario.params;

        let version = service.server_version().await?;
        info!("Connected to service version {version}");
        report.snapshot.service_version = Some(version);

        // Schema creation
        let mut targets = Vec::with_capacity(scenario.schemas.len());
        for schema in &scenario.schemas {
            let table = schema.table_name();
            if let Err(e) = service.create_table(table, &scenario.dataset, schema).await {
                error!("Creating table for schema {} failed: {e}", schema.name);
                report.schema_failures.push(SchemaFailure {
                    schema: schema.name.clone(),
                    table: table.to_string(),
                    phase: FailurePhase::Create,
                    error: e.to_string(),
                });
                continue;
            }
            let statements = schema
                .post_create
                .iter()
                .flat_map(|script| script.render(table));
            let mut post_create_error = None;
            for statement in statements {
                if let Err(e) = service.execute(&statement).await {
                    post_create_error = Some(e);
                    break;
                }
            }
            if let Some(e) = post_create_error {
                error!("Post-create script for schema {} failed: {e}", schema.name);
                report.schema_failures.push(SchemaFailure {
                    schema: schema.name.clone(),
                    table: table.to_string(),
                    phase: FailurePhase::PostCreate,
                    error: e.to_string(),
                });
                continue;
            }
            targets.push(LoadTarget {
                schema: schema.name.clone(),
                table: table.to_string(),
            });
        }
        ctx.check_cancelled()?;
        if targets.is_empty() {
            warn!("No schema survived creation; skipping load and benchmarks");
            return Ok(());
        }

        // Load
        let load = load_tables(service, &scenario.dataset, &targets, params, &ctx.cancel).await;
        report.schema_failures.extend(load.failures.iter().cloned());
        if load.cancelled {
            return Err(BenchError::Cancelled);
        }

        let (storage, failures) =
            finalize_storage(service, &scenario.dataset, &load.loaded, params.row_count).await;
        report.schema_failures.extend(failures);
        let live: Vec<LoadTarget> = storage
            .iter()
            .map(|s| LoadTarget {
                schema: s.schema.clone(),
                table: s.table.clone(),
            })
            .collect();
        report.storage = storage;
        ctx.check_cancelled()?;

        // Benchmark matrix
        let mut retained: Vec<Vec<(String, ResultSet)>> = Vec::with_capacity(scenario.queries.len());
        for query in &scenario.queries {
            let mut results = Vec::with_capacity(live.len());
            for target in &live {
                ctx.check_cancelled()?;
                let (pair, rows) = run_pair(ctx, query, target, params).await;
                report.pairs.push(pair);
                if let Some(rows) = rows {
                    results.push((target.schema.clone(), rows));
                }
            }
            retained.push(results);
        }

        // Validation
        for (query, results) in scenario.queries.iter().zip(retained) {
            let skipped = scenario
                .schemas
                .iter()
                .map(|s| s.name.clone())
                .filter(|name| !results.iter().any(|(schema, _)| schema == name))
                .collect();
            report
                .validations
                .push(validate_query(query, &results, skipped, params.max_diff_rows));
        }

        Ok(())
    }
}

/// Remove every benchmark table from an instance that stays up after the run.
async fn drop_tables(
    service: &dyn BenchService,
    scenario: &ScenarioSpec,
    report: &mut ScenarioReport,
) {
    for schema in &scenario.schemas {
        let table = schema.table_name();
        if let Err(e) = service.drop_table(table).await {
            warn!("Table {table} left on the server: {e}");
            report.errors.push(format!("dropping table {table} failed: {e}"));
        }
    }
    info!("Dropped {} benchmark tables", scenario.schemas.len());
}

/// Run one pair inside the exclusive region. Returns its report and, on
/// success, the retained result rows.
async fn run_pair(
    ctx: &RunContext,
    query: &bench_core::QueryDef,
    target: &LoadTarget,
    params: &bench_core::BenchmarkParams,
) -> (PairReport, Option<ResultSet>) {
    let _exclusive = ctx.exclusive.lock().await;
    let service = ctx.service.as_ref();

    let executor = PairExecutor::new(
        service,
        query,
        &target.schema,
        &target.table,
        params.warmup_runs,
        params.measured_runs,
    );

    match executor.run().await {
        Ok(mut completed) => {
            let mut error = None;
            if let Err(e) =
                collect_profiles(service, &completed.barrier, &mut completed.records).await
            {
                error!(
                    "Profile collection for {}/{} failed: {e}",
                    query.name, target.schema
                );
                for record in &mut completed.records {
                    record.status = RunStatus::Incomplete;
                }
                error = Some(e.to_string());
            }
            let incomplete_runs = completed
                .records
                .iter()
                .filter(|r| r.status == RunStatus::Incomplete)
                .count();
            let pair = PairReport {
                query: query.name.clone(),
                schema: target.schema.clone(),
                table: target.table.clone(),
                final_state: crate::executor::PairState::Done,
                aggregates: aggregate_runs(&completed.records),
                runs: completed.records,
                incomplete_runs,
                error,
            };
            (pair, Some(completed.retained))
        }
        Err(failure) => {
            error!(
                "Pair {}/{} failed while {}: {}",
                query.name, target.schema, failure.state, failure.error
            );
            let pair = PairReport {
                query: query.name.clone(),
                schema: target.schema.clone(),
                table: target.table.clone(),
                final_state: failure.state,
                incomplete_runs: failure.records.len(),
                aggregates: Default::default(),
                runs: failure.records,
                error: Some(failure.error.to_string()),
            };
            (pair, None)
        }
    }
}

/// Interrupts win, then environment failures, then validation mismatches.
fn terminal_status(result: &Result<(), BenchError>, report: &ScenarioReport) -> TerminalStatus {
    if let Err(e) = result {
        return e.status();
    }
    let environment_failure = !report.schema_failures.is_empty()
        || !report.errors.is_empty()
        || report.pairs.iter().any(PairReport::failed);
    if environment_failure {
        return TerminalStatus::EnvironmentError;
    }
    if report.validations.iter().any(|v| !v.matched) {
        return TerminalStatus::ValidationMismatch;
    }
    TerminalStatus::Success
}

fn early_exit(error: BenchError) -> ScenarioOutcome {
    error!("Scenario stopped before start: {error}");
    ScenarioOutcome {
        status: error.status(),
        report: None,
        artifacts: None,
        error: Some(error.to_string()),
    }
}
