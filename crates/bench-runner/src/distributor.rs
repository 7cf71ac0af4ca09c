//! Batch distribution: every generated batch goes to every live table.

use crate::report::{FailurePhase, SchemaFailure};
use bench_core::{BenchService, BenchmarkParams, DatasetSpec, ServiceError};
use bench_generator::{estimate_dataset_bytes, BatchGenerator};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// A table that receives the scenario's data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTarget {
    pub schema: String,
    pub table: String,
}

/// Rows accepted by one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableLoad {
    pub schema: String,
    pub table: String,
    pub rows_written: u64,
}

/// Result of the load phase.
#[derive(Debug, Clone, Default)]
pub struct LoadSummary {
    /// Tables that accepted every batch.
    pub loaded: Vec<TableLoad>,
    /// Tables excluded after a failed insert.
    pub failures: Vec<SchemaFailure>,
    pub batches: u64,
    pub duration: Duration,
    pub cancelled: bool,
}

impl LoadSummary {
    pub fn rows_per_second(&self) -> f64 {
        let rows: u64 = self.loaded.iter().map(|t| t.rows_written).sum();
        if self.duration.as_secs_f64() > 0.0 {
            rows as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}

/// Estimated versus measured storage of one schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageReport {
    pub schema: String,
    pub table: String,
    pub expected_rows: u64,
    pub rows: u64,
    pub estimated_bytes: u64,
    pub compressed_bytes: u64,
    pub uncompressed_bytes: u64,
    /// `uncompressed / estimated`; 1.0 means the estimate was exact.
    pub estimate_ratio: f64,
    /// `uncompressed / compressed`.
    pub compression_ratio: f64,
}

struct TableProgress {
    target: LoadTarget,
    rows_written: u64,
    error: Option<ServiceError>,
}

/// Generate the dataset batch by batch and insert each batch into every
/// table before generating the next one.
///
/// Inserts for one batch run concurrently across tables, bounded by
/// `params.insert_workers`. A table whose insert fails receives no further
/// batches.
pub async fn load_tables(
    service: &dyn BenchService,
    dataset: &DatasetSpec,
    targets: &[LoadTarget],
    params: &BenchmarkParams,
    cancel: &CancellationToken,
) -> LoadSummary {
    let start = Instant::now();
    let mut progress: Vec<TableProgress> = targets
        .iter()
        .map(|target| TableProgress {
            target: target.clone(),
            rows_written: 0,
            error: None,
        })
        .collect();

    let mut generator = BatchGenerator::new(
        dataset.clone(),
        params.seed,
        params.row_count,
        params.batch_size,
    );
    let total_batches = params.batch_count();
    let workers = params.insert_workers.max(1);
    let mut batches = 0u64;
    let mut cancelled = false;

    info!(
        "Loading {} rows into {} tables ({} batches of {})",
        params.row_count,
        targets.len(),
        total_batches,
        params.batch_size
    );

    while let Some(batch) = generator.next_batch() {
        if cancel.is_cancelled() {
            info!("Load cancelled before batch {}", batch.index);
            cancelled = true;
            break;
        }

        let results: Vec<(usize, Result<u64, ServiceError>)> = stream::iter(
            progress
                .iter()
                .enumerate()
                .filter(|(_, table)| table.error.is_none()),
        )
        .map(|(i, table)| async move {
            let result = service
                .insert_batch(&table.target.table, dataset, batch)
                .await;
            (i, result)
        })
        .buffer_unordered(workers)
        .collect()
        .await;

        for (i, result) in results {
            let table = &mut progress[i];
            match result {
                Ok(rows) => table.rows_written += rows,
                Err(e) => {
                    error!(
                        "Insert of batch {} into {} failed, excluding schema {}: {e}",
                        batch.index, table.target.table, table.target.schema
                    );
                    table.error = Some(e);
                }
            }
        }

        batches += 1;
        debug!("Batch {}/{} distributed", batches, total_batches);

        if progress.iter().all(|t| t.error.is_some()) {
            error!("Every table failed during load; stopping generation");
            break;
        }
    }

    let mut summary = LoadSummary {
        batches,
        duration: start.elapsed(),
        cancelled,
        ..Default::default()
    };
    for table in progress {
        match table.error {
            None => summary.loaded.push(TableLoad {
                schema: table.target.schema,
                table: table.target.table,
                rows_written: table.rows_written,
            }),
            Some(e) => summary.failures.push(SchemaFailure {
                schema: table.target.schema,
                table: table.target.table,
                phase: FailurePhase::Load,
                error: e.to_string(),
            }),
        }
    }
    info!(
        "Load finished: {} batches in {:?} ({:.0} rows/sec)",
        summary.batches,
        summary.duration,
        summary.rows_per_second()
    );
    summary
}

/// Force-merge each loaded table and measure its storage against the
/// estimate. A table whose row count differs from the configured count is
/// reported as a failure.
pub async fn finalize_storage(
    service: &dyn BenchService,
    dataset: &DatasetSpec,
    loaded: &[TableLoad],
    row_count: u64,
) -> (Vec<StorageReport>, Vec<SchemaFailure>) {
    let estimated_bytes = estimate_dataset_bytes(dataset, row_count);
    let mut reports = Vec::new();
    let mut failures = Vec::new();

    for table in loaded {
        let fail = |error: String| SchemaFailure {
            schema: table.schema.clone(),
            table: table.table.clone(),
            phase: FailurePhase::Finalize,
            error,
        };

        if let Err(e) = service.optimize_table(&table.table).await {
            error!("OPTIMIZE of {} failed: {e}", table.table);
            failures.push(fail(e.to_string()));
            continue;
        }
        let stats = match service.table_storage(&table.table).await {
            Ok(stats) => stats,
            Err(e) => {
                error!("Storage query for {} failed: {e}", table.table);
                failures.push(fail(e.to_string()));
                continue;
            }
        };
        if stats.rows != row_count {
            error!(
                "Table {} holds {} rows, expected {}",
                table.table, stats.rows, row_count
            );
            failures.push(fail(format!(
                "row count mismatch: {} rows, expected {row_count}",
                stats.rows
            )));
            continue;
        }

        let report = StorageReport {
            schema: table.schema.clone(),
            table: table.table.clone(),
            expected_rows: row_count,
            rows: stats.rows,
            estimated_bytes,
            compressed_bytes: stats.compressed_bytes,
            uncompressed_bytes: stats.uncompressed_bytes,
            estimate_ratio: ratio(stats.uncompressed_bytes, estimated_bytes),
            compression_ratio: ratio(stats.uncompressed_bytes, stats.compressed_bytes),
        };
        info!(
            "Schema {}: {} compressed / {} uncompressed bytes (estimate {}, ratio {:.2})",
            report.schema,
            report.compressed_bytes,
            report.uncompressed_bytes,
            report.estimated_bytes,
            report.estimate_ratio
        );
        reports.push(report);
    }
    (reports, failures)
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{test_dataset, test_params, FakeService};

    fn targets(names: &[&str]) -> Vec<LoadTarget> {
        names
            .iter()
            .map(|n| LoadTarget {
                schema: n.to_string(),
                table: n.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_every_table_gets_every_row() {
        let service = FakeService::new();
        service.create_empty_tables(&["a", "b"]);
        let params = test_params(100, 10);

        let summary = load_tables(
            &service,
            &test_dataset(),
            &targets(&["a", "b"]),
            &params,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.batches, 10);
        assert!(summary.failures.is_empty());
        assert_eq!(summary.loaded.len(), 2);
        assert!(summary.loaded.iter().all(|t| t.rows_written == 100));
        assert_eq!(service.table_rows("a").len(), 100);
        assert_eq!(service.table_rows("a"), service.table_rows("b"));
        assert_eq!(service.insert_calls(), 20);
    }

    #[tokio::test]
    async fn test_failing_table_is_excluded() {
        let service = FakeService::new().failing_insert_after("b", 3);
        service.create_empty_tables(&["a", "b"]);
        let params = test_params(100, 10);

        let summary = load_tables(
            &service,
            &test_dataset(),
            &targets(&["a", "b"]),
            &params,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(summary.loaded.len(), 1);
        assert_eq!(summary.loaded[0].schema, "a");
        assert_eq!(summary.loaded[0].rows_written, 100);
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].phase, FailurePhase::Load);
        // b accepted three batches, failed the fourth, and saw nothing after.
        assert_eq!(service.table_rows("b").len(), 30);
    }

    #[tokio::test]
    async fn test_cancel_stops_between_batches() {
        let cancel = CancellationToken::new();
        let service = FakeService::new().cancel_after_inserts(4, cancel.clone());
        service.create_empty_tables(&["a", "b"]);

        let summary = load_tables(
            &service,
            &test_dataset(),
            &targets(&["a", "b"]),
            &test_params(100, 10),
            &cancel,
        )
        .await;

        assert!(summary.cancelled);
        assert_eq!(summary.batches, 2);
        assert_eq!(service.table_rows("a").len(), 20);
    }

    #[tokio::test]
    async fn test_finalize_reports_storage() {
        let service = FakeService::new();
        service.create_empty_tables(&["a"]);
        let dataset = test_dataset();
        let params = test_params(50, 20);
        let summary = load_tables(
            &service,
            &dataset,
            &targets(&["a"]),
            &params,
            &CancellationToken::new(),
        )
        .await;

        let (reports, failures) =
            finalize_storage(&service, &dataset, &summary.loaded, params.row_count).await;
        assert!(failures.is_empty());
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].rows, 50);
        assert_eq!(
            reports[0].estimated_bytes,
            estimate_dataset_bytes(&dataset, 50)
        );
        assert!(service.optimized().contains(&"a".to_string()));
    }

    #[tokio::test]
    async fn test_finalize_flags_row_count_mismatch() {
        let service = FakeService::new();
        service.create_empty_tables(&["a"]);
        let loaded = vec![TableLoad {
            schema: "a".into(),
            table: "a".into(),
            rows_written: 0,
        }];
        let (reports, failures) = finalize_storage(&service, &test_dataset(), &loaded, 10).await;
        assert!(reports.is_empty());
        assert_eq!(failures[0].phase, FailurePhase::Finalize);
        assert!(failures[0].error.contains("row count mismatch"));
    }
}
