//! Per-pair run execution.
//!
//! A (query, schema) pair moves through
//! `Idle -> WarmingUp -> Measuring -> AwaitingLog -> Done`. Caches are dropped
//! before warm-up so every pair starts cold. The pair ends with a flush
//! barrier, and only a [`FlushBarrier`] lets profiles be collected, so the
//! execution log can never be read before it was flushed.

use crate::metrics::{RunRecord, RunStatus};
use bench_core::{BenchService, QueryDef, ResultSet, ServiceError};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairState {
    Idle,
    WarmingUp,
    Measuring,
    AwaitingLog,
    Done,
}

impl std::fmt::Display for PairState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PairState::Idle => "idle",
            PairState::WarmingUp => "warming_up",
            PairState::Measuring => "measuring",
            PairState::AwaitingLog => "awaiting_log",
            PairState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Proof that the execution log was flushed after the listed runs finished.
#[derive(Debug)]
pub struct FlushBarrier {
    run_ids: Vec<String>,
}

impl FlushBarrier {
    pub fn run_ids(&self) -> &[String] {
        &self.run_ids
    }
}

/// A pair that reached `Done`.
#[derive(Debug)]
pub struct CompletedPair {
    /// One record per measured run, profiles still pending.
    pub records: Vec<RunRecord>,
    /// Rows of the first measured run.
    pub retained: ResultSet,
    pub barrier: FlushBarrier,
}

/// A pair aborted by a service error.
#[derive(Debug)]
pub struct PairFailure {
    /// State the pair was in when the error occurred.
    pub state: PairState,
    pub error: ServiceError,
    /// Runs measured before the failure, marked incomplete.
    pub records: Vec<RunRecord>,
}

/// Runs one (query, schema) pair against the service.
pub struct PairExecutor<'a> {
    service: &'a dyn BenchService,
    query: &'a QueryDef,
    schema: &'a str,
    table: &'a str,
    warmup_runs: u32,
    measured_runs: u32,
    state: PairState,
}

impl<'a> PairExecutor<'a> {
    pub fn new(
        service: &'a dyn BenchService,
        query: &'a QueryDef,
        schema: &'a str,
        table: &'a str,
        warmup_runs: u32,
        measured_runs: u32,
    ) -> Self {
        Self {
            service,
            query,
            schema,
            table,
            warmup_runs,
            measured_runs,
            state: PairState::Idle,
        }
    }

    pub fn state(&self) -> PairState {
        self.state
    }

    fn transition(&mut self, next: PairState) {
        debug!(
            "{}/{}: {} -> {}",
            self.query.name, self.schema, self.state, next
        );
        self.state = next;
    }

    fn fail(&self, error: ServiceError, mut records: Vec<RunRecord>) -> PairFailure {
        for record in &mut records {
            record.status = RunStatus::Incomplete;
        }
        PairFailure {
            state: self.state,
            error,
            records,
        }
    }

    /// Drive the pair to `Done`. The caller must hold the service's
    /// exclusive measurement region for the whole call.
    pub async fn run(mut self) -> Result<CompletedPair, PairFailure> {
        let sql = self.query.render(self.table);

        if let Err(e) = self.service.drop_caches().await {
            return Err(self.fail(e, Vec::new()));
        }

        self.transition(PairState::WarmingUp);
        for _ in 0..self.warmup_runs {
            if let Err(e) = self.service.run_query(&sql, None).await {
                return Err(self.fail(e, Vec::new()));
            }
        }

        self.transition(PairState::Measuring);
        let mut records = Vec::with_capacity(self.measured_runs as usize);
        let mut retained = None;
        for sequence in 0..self.measured_runs {
            let run_id = Uuid::new_v4().to_string();
            let started_at = Utc::now();
            let clock = Instant::now();
            let result = self.service.run_query(&sql, Some(&run_id)).await;
            let wall_time_ms = clock.elapsed().as_secs_f64() * 1000.0;
            let finished_at = Utc::now();

            let rows = match result {
                Ok(rows) => rows,
                Err(e) => return Err(self.fail(e, records)),
            };
            if retained.is_none() {
                retained = Some(rows);
            }
            records.push(RunRecord {
                run_id,
                query: self.query.name.clone(),
                schema: self.schema.to_string(),
                table: self.table.to_string(),
                sequence,
                started_at,
                finished_at,
                wall_time_ms,
                status: RunStatus::Pending,
                profile: None,
            });
        }

        self.transition(PairState::AwaitingLog);
        if let Err(e) = self.service.flush_logs().await {
            return Err(self.fail(e, records));
        }
        let barrier = FlushBarrier {
            run_ids: records.iter().map(|r| r.run_id.clone()).collect(),
        };

        self.transition(PairState::Done);
        info!(
            "{}/{}: {} measured runs complete",
            self.query.name,
            self.schema,
            records.len()
        );
        Ok(CompletedPair {
            records,
            retained: retained.unwrap_or_default(),
            barrier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEvent, FakeService};

    fn query() -> QueryDef {
        QueryDef {
            name: "all".into(),
            template: "SELECT * FROM {table}".into(),
            ordered: false,
        }
    }

    #[tokio::test]
    async fn test_pair_event_order() {
        let service = FakeService::new();
        service.create_empty_tables(&["a"]);
        let query = query();

        let completed = PairExecutor::new(&service, &query, "a", "a", 2, 3)
            .run()
            .await
            .unwrap();

        assert_eq!(completed.records.len(), 3);
        assert_eq!(completed.barrier.run_ids().len(), 3);

        let events = service.events();
        assert_eq!(events[0], FakeEvent::DropCaches);
        let queries: Vec<Option<String>> = events
            .iter()
            .filter_map(|e| match e {
                FakeEvent::Query { run_id, .. } => Some(run_id.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(queries.len(), 5);
        assert!(queries[..2].iter().all(Option::is_none));
        assert!(queries[2..].iter().all(Option::is_some));
        assert_eq!(events.last(), Some(&FakeEvent::Flush));
    }

    #[tokio::test]
    async fn test_warmups_never_produce_records() {
        let service = FakeService::new();
        service.create_empty_tables(&["a"]);
        let query = query();

        let completed = PairExecutor::new(&service, &query, "a", "a", 4, 2)
            .run()
            .await
            .unwrap();

        let measured_ids: Vec<String> = service
            .events()
            .iter()
            .filter_map(|e| match e {
                FakeEvent::Query {
                    run_id: Some(id), ..
                } => Some(id.clone()),
                _ => None,
            })
            .collect();
        let recorded: Vec<String> = completed.records.iter().map(|r| r.run_id.clone()).collect();
        assert_eq!(recorded, measured_ids);
        assert!(completed
            .records
            .iter()
            .enumerate()
            .all(|(i, r)| r.sequence == i as u32 && r.status == RunStatus::Pending));
    }

    #[tokio::test]
    async fn test_run_ids_are_unique() {
        let service = FakeService::new();
        service.create_empty_tables(&["a"]);
        let query = query();
        let completed = PairExecutor::new(&service, &query, "a", "a", 0, 10)
            .run()
            .await
            .unwrap();
        let mut ids: Vec<&str> = completed.records.iter().map(|r| r.run_id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 10);
    }

    #[tokio::test]
    async fn test_query_failure_aborts_pair() {
        let service = FakeService::new().failing_queries_on("a");
        service.create_empty_tables(&["a"]);
        let query = query();

        let failure = PairExecutor::new(&service, &query, "a", "a", 1, 3)
            .run()
            .await
            .unwrap_err();

        assert_eq!(failure.state, PairState::WarmingUp);
        assert!(failure.records.is_empty());
        assert!(!service.events().contains(&FakeEvent::Flush));
    }

    #[tokio::test]
    async fn test_executor_starts_idle() {
        let service = FakeService::new();
        let query = query();
        let executor = PairExecutor::new(&service, &query, "a", "a", 1, 1);
        assert_eq!(executor.state(), PairState::Idle);
    }
}
