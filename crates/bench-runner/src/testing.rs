//! In-memory doubles for the runner's seams.

use crate::lifecycle::{DiskProbe, ServiceInstance, ServiceLauncher};
use crate::report::{ReportSink, ScenarioReport};
use async_trait::async_trait;
use bench_core::{
    Batch, BenchService, BenchmarkParams, ColumnSpec, ColumnType, DatasetSpec, Domain,
    ProfileCounters, QueryDef, ResultSet, ScenarioSpec, SchemaDef, ServiceError, StorageStats,
    StringDomain, ValueRule,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Everything the fake observed, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum FakeEvent {
    CreateTable(String),
    DropTable(String),
    Execute(String),
    Insert { table: String, batch: u64 },
    Optimize(String),
    DropCaches,
    Query { table: String, run_id: Option<String> },
    Flush,
    /// `unflushed` counts requested ids still sitting in the unflushed log.
    FetchProfiles { requested: usize, unflushed: usize },
}

#[derive(Default)]
struct FakeState {
    tables: HashMap<String, Vec<Vec<String>>>,
    events: Vec<FakeEvent>,
    inserts: usize,
    inserts_by_table: HashMap<String, usize>,
    logged_runs: usize,
    pending_log: HashMap<String, ProfileCounters>,
    flushed_log: HashMap<String, ProfileCounters>,
}

/// A service that keeps tables as rendered rows and mimics the query log's
/// flush semantics: entries are only visible after `flush_logs`.
///
/// Queries understand `... FROM <table>` and an optional `WHERE half`, which
/// returns the first half of the table.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
    fail_insert_after: Option<(String, usize)>,
    fail_queries_on: Option<String>,
    fail_create_on: Option<String>,
    corrupt: Option<String>,
    lose_log_entries: usize,
    cancel_after_inserts: Option<(usize, CancellationToken)>,
    cancel_after_queries: Option<(usize, CancellationToken)>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `n` inserts into `table`, then reject every later one.
    pub fn failing_insert_after(mut self, table: &str, n: usize) -> Self {
        self.fail_insert_after = Some((table.to_string(), n));
        self
    }

    pub fn failing_queries_on(mut self, table: &str) -> Self {
        self.fail_queries_on = Some(table.to_string());
        self
    }

    pub fn failing_create_on(mut self, table: &str) -> Self {
        self.fail_create_on = Some(table.to_string());
        self
    }

    /// Queries against `table` drop the second half of their result.
    pub fn corrupting(mut self, table: &str) -> Self {
        self.corrupt = Some(table.to_string());
        self
    }

    /// The first `n` measured runs never reach the query log.
    pub fn losing_log_entries(mut self, n: usize) -> Self {
        self.lose_log_entries = n;
        self
    }

    /// Cancel `token` once `n` inserts have completed across all tables.
    pub fn cancel_after_inserts(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after_inserts = Some((n, token));
        self
    }

    /// Cancel `token` once `n` measured queries have run.
    pub fn cancel_after_queries(mut self, n: usize, token: CancellationToken) -> Self {
        self.cancel_after_queries = Some((n, token));
        self
    }

    pub fn create_empty_tables(&self, names: &[&str]) {
        let mut state = self.state.lock().unwrap();
        for name in names {
            state.tables.insert(name.to_string(), Vec::new());
        }
    }

    pub fn table_rows(&self, table: &str) -> Vec<Vec<String>> {
        let state = self.state.lock().unwrap();
        state.tables.get(table).cloned().unwrap_or_default()
    }

    pub fn insert_calls(&self) -> usize {
        self.state.lock().unwrap().inserts
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn optimized(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FakeEvent::Optimize(table) => Some(table),
                _ => None,
            })
            .collect()
    }
}

fn table_of(sql: &str) -> String {
    sql.split("FROM ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default()
        .to_string()
}

fn missing_table(table: &str) -> ServiceError {
    ServiceError::statement(table, format!("Table {table} doesn't exist"))
}

#[async_trait]
impl BenchService for FakeService {
    async fn server_version(&self) -> Result<String, ServiceError> {
        Ok("24.8.1.fake".to_string())
    }

    async fn create_table(
        &self,
        table: &str,
        _dataset: &DatasetSpec,
        _schema: &SchemaDef,
    ) -> Result<(), ServiceError> {
        if self.fail_create_on.as_deref() == Some(table) {
            return Err(ServiceError::statement(
                format!("CREATE TABLE {table}"),
                "Unknown setting",
            ));
        }
        let mut state = self.state.lock().unwrap();
        state.tables.insert(table.to_string(), Vec::new());
        state.events.push(FakeEvent::CreateTable(table.to_string()));
        Ok(())
    }

    async fn drop_table(&self, table: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.tables.remove(table);
        state.events.push(FakeEvent::DropTable(table.to_string()));
        Ok(())
    }

    async fn execute(&self, statement: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.events.push(FakeEvent::Execute(statement.to_string()));
        if statement.contains("FAIL") {
            return Err(ServiceError::statement(statement, "Syntax error"));
        }
        Ok(())
    }

    async fn insert_batch(
        &self,
        table: &str,
        _dataset: &DatasetSpec,
        batch: &Batch,
    ) -> Result<u64, ServiceError> {
        let mut state = self.state.lock().unwrap();
        state.inserts += 1;
        let count = {
            let count = state.inserts_by_table.entry(table.to_string()).or_default();
            *count += 1;
            *count
        };
        state.events.push(FakeEvent::Insert {
            table: table.to_string(),
            batch: batch.index,
        });

        let result = match &self.fail_insert_after {
            Some((failing, n)) if failing == table && count > *n => Err(ServiceError::statement(
                format!("INSERT INTO {table}"),
                "Memory limit exceeded",
            )),
            _ => match state.tables.get_mut(table) {
                Some(rows) => {
                    rows.extend(
                        batch
                            .rows
                            .iter()
                            .map(|row| row.iter().map(|v| v.to_string()).collect()),
                    );
                    Ok(batch.rows.len() as u64)
                }
                None => Err(missing_table(table)),
            },
        };

        if let Some((n, token)) = &self.cancel_after_inserts {
            if state.inserts >= *n {
                token.cancel();
            }
        }
        result
    }

    async fn optimize_table(&self, table: &str) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        if !state.tables.contains_key(table) {
            return Err(missing_table(table));
        }
        state.events.push(FakeEvent::Optimize(table.to_string()));
        Ok(())
    }

    async fn table_storage(&self, table: &str) -> Result<StorageStats, ServiceError> {
        let state = self.state.lock().unwrap();
        let rows = state
            .tables
            .get(table)
            .ok_or_else(|| missing_table(table))?
            .len() as u64;
        Ok(StorageStats {
            rows,
            compressed_bytes: rows * 10,
            uncompressed_bytes: rows * 40,
        })
    }

    async fn drop_caches(&self) -> Result<(), ServiceError> {
        self.state.lock().unwrap().events.push(FakeEvent::DropCaches);
        Ok(())
    }

    async fn run_query(
        &self,
        sql: &str,
        run_id: Option<&str>,
    ) -> Result<ResultSet, ServiceError> {
        let table = table_of(sql);
        let mut state = self.state.lock().unwrap();
        state.events.push(FakeEvent::Query {
            table: table.clone(),
            run_id: run_id.map(str::to_string),
        });
        if self.fail_queries_on.as_deref() == Some(table.as_str()) {
            return Err(ServiceError::statement(sql, "Cannot read from table"));
        }

        let stored = state.tables.get(&table).ok_or_else(|| missing_table(&table))?;
        let scanned = stored.len();
        let mut rows = stored.clone();
        if sql.contains("WHERE half") {
            rows.truncate(scanned / 2);
        }
        if self.corrupt.as_deref() == Some(table.as_str()) {
            let keep = rows.len() / 2;
            rows.truncate(keep);
        }

        if let Some(id) = run_id {
            state.logged_runs += 1;
            if state.logged_runs > self.lose_log_entries {
                let counters = ProfileCounters {
                    read_rows: scanned as u64,
                    result_rows: rows.len() as u64,
                    query_duration_ms: 1,
                    real_time_us: 1_000,
                    selected_parts: 1,
                    ..Default::default()
                };
                state.pending_log.insert(id.to_string(), counters);
            }
            if let Some((n, token)) = &self.cancel_after_queries {
                if state.logged_runs >= *n {
                    token.cancel();
                }
            }
        }
        Ok(ResultSet { rows })
    }

    async fn flush_logs(&self) -> Result<(), ServiceError> {
        let mut state = self.state.lock().unwrap();
        let pending: Vec<(String, ProfileCounters)> = state.pending_log.drain().collect();
        state.flushed_log.extend(pending);
        state.events.push(FakeEvent::Flush);
        Ok(())
    }

    async fn fetch_profiles(
        &self,
        run_ids: &[String],
    ) -> Result<HashMap<String, ProfileCounters>, ServiceError> {
        let mut state = self.state.lock().unwrap();
        let unflushed = run_ids
            .iter()
            .filter(|id| state.pending_log.contains_key(*id))
            .count();
        state.events.push(FakeEvent::FetchProfiles {
            requested: run_ids.len(),
            unflushed,
        });
        Ok(run_ids
            .iter()
            .filter_map(|id| state.flushed_log.get(id).map(|c| (id.clone(), *c)))
            .collect())
    }
}

/// Hands out the same in-memory service on every start.
pub struct FakeLauncher {
    service: Arc<FakeService>,
    starts: AtomicUsize,
    teardowns: AtomicUsize,
    fail_start: bool,
    fail_teardown: bool,
    outlives_run: bool,
}

impl FakeLauncher {
    pub fn new(service: FakeService) -> Self {
        Self {
            service: Arc::new(service),
            starts: AtomicUsize::new(0),
            teardowns: AtomicUsize::new(0),
            fail_start: false,
            fail_teardown: false,
            outlives_run: false,
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn failing_teardown(mut self) -> Self {
        self.fail_teardown = true;
        self
    }

    /// Behave like a server the tool does not own.
    pub fn outliving_run(mut self) -> Self {
        self.outlives_run = true;
        self
    }

    pub fn service(&self) -> Arc<FakeService> {
        Arc::clone(&self.service)
    }

    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn teardowns(&self) -> usize {
        self.teardowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ServiceLauncher for FakeLauncher {
    async fn start(&self) -> Result<ServiceInstance, ServiceError> {
        let n = self.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail_start {
            return Err(ServiceError::Unreachable(
                "health check timed out".to_string(),
            ));
        }
        Ok(ServiceInstance {
            id: format!("fake-{n}"),
            endpoint: "memory://fake".to_string(),
            service: self.service.clone(),
        })
    }

    fn teardown(&self, _instance_id: &str) -> Result<(), ServiceError> {
        self.teardowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_teardown {
            return Err(ServiceError::Unreachable("container vanished".to_string()));
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }

    fn outlives_run(&self) -> bool {
        self.outlives_run
    }
}

pub struct FixedDiskProbe {
    available: Option<u64>,
}

impl FixedDiskProbe {
    pub fn new(available: u64) -> Self {
        Self {
            available: Some(available),
        }
    }

    pub fn plenty() -> Self {
        Self::new(u64::MAX)
    }

    pub fn failing() -> Self {
        Self { available: None }
    }
}

impl DiskProbe for FixedDiskProbe {
    fn available_bytes(&self) -> std::io::Result<u64> {
        self.available
            .ok_or_else(|| std::io::Error::other("statvfs failed"))
    }

    fn location(&self) -> String {
        "/fake".to_string()
    }
}

/// Keeps exported reports in memory.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<ScenarioReport>>,
    fail: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn exported(&self) -> Vec<ScenarioReport> {
        self.reports.lock().unwrap().clone()
    }
}

impl ReportSink for RecordingSink {
    fn export(&self, report: &ScenarioReport) -> std::io::Result<PathBuf> {
        if self.fail {
            return Err(std::io::Error::other("read-only file system"));
        }
        self.reports.lock().unwrap().push(report.clone());
        Ok(PathBuf::from(format!("/fake/{}", report.scenario)))
    }
}

pub fn test_dataset() -> DatasetSpec {
    DatasetSpec {
        name: "events".to_string(),
        columns: vec![
            ColumnSpec {
                name: "id".to_string(),
                column_type: ColumnType::UInt64,
                rule: ValueRule::UInt {
                    domain: Domain::Range {
                        min: 1,
                        max: 1_000_000,
                    },
                },
            },
            ColumnSpec {
                name: "name".to_string(),
                column_type: ColumnType::String,
                rule: ValueRule::String {
                    domain: StringDomain::Length { min: 3, max: 8 },
                },
            },
            ColumnSpec {
                name: "score".to_string(),
                column_type: ColumnType::Nullable(Box::new(ColumnType::Float64)),
                rule: ValueRule::Nullable {
                    null_probability: 0.2,
                    inner: Box::new(ValueRule::Float {
                        domain: Domain::Range {
                            min: 0.0,
                            max: 100.0,
                        },
                    }),
                },
            },
        ],
    }
}

pub fn test_params(row_count: u64, batch_size: usize) -> BenchmarkParams {
    BenchmarkParams {
        row_count,
        batch_size,
        warmup_runs: 1,
        measured_runs: 3,
        seed: 42,
        insert_workers: 2,
        max_diff_rows: 5,
    }
}

pub fn test_schema(name: &str) -> SchemaDef {
    SchemaDef {
        name: name.to_string(),
        engine: "MergeTree".to_string(),
        order_by: vec!["id".to_string()],
        partition_by: None,
        primary_key: None,
        settings: Vec::new(),
        post_create: Vec::new(),
    }
}

/// Scenario over [`test_dataset`] with one default schema per name and
/// `(name, template)` queries.
pub fn test_scenario(
    schemas: &[&str],
    queries: &[(&str, &str)],
    row_count: u64,
    batch_size: usize,
) -> ScenarioSpec {
    ScenarioSpec {
        name: "test".to_string(),
        dataset: test_dataset(),
        schemas: schemas.iter().map(|s| test_schema(s)).collect(),
        queries: queries
            .iter()
            .map(|(name, template)| QueryDef {
                name: name.to_string(),
                template: template.to_string(),
                ordered: false,
            })
            .collect(),
        params: test_params(row_count, batch_size),
    }
}
