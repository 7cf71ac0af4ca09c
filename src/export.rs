//! Report export into a fresh, uniquely named directory per run.

use bench_core::{BenchmarkParams, ScenarioSpec};
use bench_environment::HostInfo;
use bench_runner::{
    PairReport, ReportSink, ScenarioReport, SchemaFailure, StorageReport, TerminalStatus,
    ValidationOutcome,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::debug;

const MAX_SUFFIX: u32 = 1000;

/// Writes each report into `<output_dir>/<scenario>_<timestamp>`.
pub struct DirectoryExporter {
    output_dir: PathBuf,
    host: HostInfo,
}

#[derive(Serialize)]
struct ResultsDocument<'a> {
    scenario: &'a str,
    status: TerminalStatus,
    exit_code: i32,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    pairs: &'a [PairReport],
    validations: &'a [ValidationOutcome],
    schema_failures: &'a [SchemaFailure],
    errors: &'a [String],
}

#[derive(Serialize)]
struct EnvironmentDocument<'a> {
    tool_version: &'static str,
    scenario: &'a ScenarioSpec,
    params: &'a BenchmarkParams,
    launcher: &'a str,
    endpoint: Option<&'a str>,
    service_version: Option<&'a str>,
    estimated_bytes_per_schema: u64,
    host: &'a HostInfo,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct AggregateRow<'a> {
    query: &'a str,
    schema: &'a str,
    table: &'a str,
    metric: &'static str,
    count: usize,
    min: f64,
    max: f64,
    avg: f64,
    p50: f64,
    p95: f64,
    p99: f64,
    incomplete_runs: usize,
}

impl DirectoryExporter {
    pub fn new(output_dir: impl Into<PathBuf>, host: HostInfo) -> Self {
        Self {
            output_dir: output_dir.into(),
            host,
        }
    }

    fn write_results(dir: &Path, report: &ScenarioReport) -> io::Result<()> {
        write_json(
            &dir.join("results.json"),
            &ResultsDocument {
                scenario: &report.scenario,
                status: report.status,
                exit_code: report.status.exit_code(),
                started_at: report.started_at,
                finished_at: report.finished_at,
                pairs: &report.pairs,
                validations: &report.validations,
                schema_failures: &report.schema_failures,
                errors: &report.errors,
            },
        )?;

        let mut writer = csv::Writer::from_path(dir.join("results.csv"))?;
        for pair in &report.pairs {
            for (metric, agg) in &pair.aggregates {
                writer.serialize(AggregateRow {
                    query: &pair.query,
                    schema: &pair.schema,
                    table: &pair.table,
                    metric: metric.name(),
                    count: agg.count,
                    min: agg.min,
                    max: agg.max,
                    avg: agg.avg,
                    p50: agg.p50,
                    p95: agg.p95,
                    p99: agg.p99,
                    incomplete_runs: pair.incomplete_runs,
                })?;
            }
        }
        writer.flush()
    }

    fn write_storage(dir: &Path, storage: &[StorageReport]) -> io::Result<()> {
        write_json(&dir.join("storage.json"), &storage)?;
        let mut writer = csv::Writer::from_path(dir.join("storage.csv"))?;
        for row in storage {
            writer.serialize(row)?;
        }
        writer.flush()
    }

    fn write_environment(&self, dir: &Path, report: &ScenarioReport) -> io::Result<()> {
        let snapshot = &report.snapshot;
        write_json(
            &dir.join("environment.json"),
            &EnvironmentDocument {
                tool_version: env!("CARGO_PKG_VERSION"),
                scenario: &snapshot.scenario,
                params: &snapshot.scenario.params,
                launcher: &snapshot.launcher,
                endpoint: snapshot.endpoint.as_deref(),
                service_version: snapshot.service_version.as_deref(),
                estimated_bytes_per_schema: snapshot.estimated_bytes_per_schema,
                host: &self.host,
                started_at: report.started_at,
                finished_at: report.finished_at,
            },
        )
    }
}

impl ReportSink for DirectoryExporter {
    fn export(&self, report: &ScenarioReport) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let dir = create_run_dir(&self.output_dir, &report.scenario, report.started_at)?;
        debug!("Exporting report to {}", dir.display());

        Self::write_results(&dir, report)?;
        Self::write_storage(&dir, &report.storage)?;
        self.write_environment(&dir, report)?;
        Ok(dir)
    }
}

/// Create `<scenario>_<YYYYMMDDTHHMMSSZ>`, appending `_1`, `_2`, ... when a
/// directory of that name already exists. Never reuses a directory.
fn create_run_dir(parent: &Path, scenario: &str, started_at: DateTime<Utc>) -> io::Result<PathBuf> {
    let base = format!("{scenario}_{}", started_at.format("%Y%m%dT%H%M%SZ"));
    for suffix in 0..=MAX_SUFFIX {
        let name = if suffix == 0 {
            base.clone()
        } else {
            format!("{base}_{suffix}")
        };
        let path = parent.join(name);
        match fs::create_dir(&path) {
            Ok(()) => return Ok(path),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(e),
        }
    }
    Err(io::Error::new(
        io::ErrorKind::AlreadyExists,
        format!("no free result directory name for {base}"),
    ))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_core::{
        ColumnSpec, ColumnType, DatasetSpec, Domain, QueryDef, SchemaDef, ValueRule,
    };
    use bench_runner::{AggregatedMetric, Metric, PairState, ScenarioSnapshot};
    use chrono::TimeZone;
    use std::collections::BTreeMap;

    fn host() -> HostInfo {
        HostInfo {
            hostname: "bench-host".into(),
            cpu_cores: 8,
            total_memory_mb: 16_384,
            available_memory_mb: 8_192,
            os: None,
        }
    }

    fn schema(name: &str) -> SchemaDef {
        SchemaDef {
            name: name.into(),
            engine: "MergeTree".into(),
            order_by: vec!["id".into()],
            partition_by: None,
            primary_key: None,
            settings: Vec::new(),
            post_create: Vec::new(),
        }
    }

    fn report() -> ScenarioReport {
        let started_at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 30, 5).unwrap();
        let scenario = ScenarioSpec {
            name: "events".into(),
            dataset: DatasetSpec {
                name: "events".into(),
                columns: vec![ColumnSpec {
                    name: "id".into(),
                    column_type: ColumnType::UInt64,
                    rule: ValueRule::UInt {
                        domain: Domain::Range { min: 1, max: 10 },
                    },
                }],
            },
            schemas: vec![schema("a"), schema("b")],
            queries: vec![QueryDef {
                name: "count".into(),
                template: "SELECT count() FROM {table}".into(),
                ordered: false,
            }],
            params: BenchmarkParams {
                row_count: 100,
                batch_size: 10,
                warmup_runs: 1,
                measured_runs: 3,
                seed: 42,
                insert_workers: 2,
                max_diff_rows: 5,
            },
        };
        let mut aggregates = BTreeMap::new();
        aggregates.insert(
            Metric::WallTimeMs,
            AggregatedMetric::from_values(&[1.0, 2.0, 3.0]).unwrap(),
        );
        ScenarioReport {
            scenario: "events".into(),
            status: TerminalStatus::Success,
            started_at,
            finished_at: started_at,
            snapshot: ScenarioSnapshot {
                scenario,
                launcher: "in-memory".into(),
                endpoint: Some("http://127.0.0.1:18123".into()),
                service_version: Some("24.8.1.1".into()),
                estimated_bytes_per_schema: 800,
            },
            storage: vec![StorageReport {
                schema: "a".into(),
                table: "a".into(),
                expected_rows: 100,
                rows: 100,
                estimated_bytes: 800,
                compressed_bytes: 200,
                uncompressed_bytes: 800,
                estimate_ratio: 1.0,
                compression_ratio: 4.0,
            }],
            pairs: vec![PairReport {
                query: "count".into(),
                schema: "a".into(),
                table: "a".into(),
                final_state: PairState::Done,
                runs: Vec::new(),
                incomplete_runs: 0,
                aggregates,
                error: None,
            }],
            validations: Vec::new(),
            schema_failures: Vec::new(),
            errors: Vec::new(),
        }
    }

    #[test]
    fn test_export_writes_all_artifacts() {
        let out = tempfile::tempdir().unwrap();
        let exporter = DirectoryExporter::new(out.path(), host());

        let dir = exporter.export(&report()).unwrap();

        assert_eq!(
            dir.file_name().unwrap().to_str().unwrap(),
            "events_20260301T123005Z"
        );
        for file in [
            "results.json",
            "results.csv",
            "storage.json",
            "storage.csv",
            "environment.json",
        ] {
            assert!(dir.join(file).exists(), "{file} missing");
        }

        let results: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("results.json")).unwrap()).unwrap();
        assert_eq!(results["status"], "success");
        assert_eq!(results["pairs"][0]["aggregates"]["wall_time_ms"]["p50"], 2.0);

        let csv = fs::read_to_string(dir.join("results.csv")).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("query,schema,table,metric"));
        assert!(lines.next().unwrap().starts_with("count,a,a,wall_time_ms,3,"));

        let env: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.join("environment.json")).unwrap())
                .unwrap();
        assert_eq!(env["host"]["hostname"], "bench-host");
        assert_eq!(env["params"]["row_count"], 100);
        assert_eq!(env["service_version"], "24.8.1.1");
    }

    #[test]
    fn test_colliding_runs_get_fresh_directories() {
        let out = tempfile::tempdir().unwrap();
        let exporter = DirectoryExporter::new(out.path(), host());
        let report = report();

        let first = exporter.export(&report).unwrap();
        let second = exporter.export(&report).unwrap();
        let third = exporter.export(&report).unwrap();

        assert_ne!(first, second);
        assert!(second.to_str().unwrap().ends_with("_1"));
        assert!(third.to_str().unwrap().ends_with("_2"));
    }

    #[test]
    fn test_storage_csv_has_one_line_per_schema() {
        let out = tempfile::tempdir().unwrap();
        let dir = DirectoryExporter::new(out.path(), host())
            .export(&report())
            .unwrap();
        let csv = fs::read_to_string(dir.join("storage.csv")).unwrap();
        assert_eq!(csv.lines().count(), 2);
        assert!(csv.starts_with("schema,table,expected_rows,rows,estimated_bytes"));
    }
}
