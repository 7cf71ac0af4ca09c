//! The seam between orchestration and the analytical service.
//!
//! Everything the engine needs from a running service goes through
//! [`BenchService`]. The ClickHouse client implements it over HTTP; tests
//! implement it in memory.

use crate::spec::{DatasetSpec, SchemaDef};
use crate::values::{Batch, ResultSet};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Error type for service interactions.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ServiceError {
    /// The service could not be reached at all
    #[error("Service unreachable: {0}")]
    Unreachable(String),

    /// The service rejected a statement
    #[error("Statement failed: {message} (statement: {statement})")]
    Statement { statement: String, message: String },

    /// The service answered with something that could not be interpreted
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl ServiceError {
    pub fn statement(statement: impl Into<String>, message: impl Into<String>) -> Self {
        let statement = statement.into();
        // Keep errors readable when the statement is a long INSERT.
        let statement = if statement.len() > 200 {
            let mut end = 200;
            while !statement.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}...", &statement[..end])
        } else {
            statement
        };
        ServiceError::Statement {
            statement,
            message: message.into(),
        }
    }
}

/// Resource counters recorded by the service for one finished query.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileCounters {
    pub read_rows: u64,
    pub read_bytes: u64,
    pub written_rows: u64,
    pub written_bytes: u64,
    pub result_rows: u64,
    pub result_bytes: u64,
    pub memory_usage: u64,
    pub query_duration_ms: u64,
    pub real_time_us: u64,
    pub user_time_us: u64,
    pub system_time_us: u64,
    pub os_read_bytes: u64,
    pub os_write_bytes: u64,
    pub selected_parts: u64,
    pub selected_marks: u64,
}

/// Storage footprint of one table after compaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageStats {
    pub rows: u64,
    pub compressed_bytes: u64,
    pub uncompressed_bytes: u64,
}

/// Operations the orchestrator performs against a running service.
#[async_trait]
pub trait BenchService: Send + Sync {
    /// Version string reported by the server.
    async fn server_version(&self) -> Result<String, ServiceError>;

    /// Create `table` with the dataset's columns and the schema's layout.
    async fn create_table(
        &self,
        table: &str,
        dataset: &DatasetSpec,
        schema: &SchemaDef,
    ) -> Result<(), ServiceError>;

    /// Drop `table` if it exists.
    async fn drop_table(&self, table: &str) -> Result<(), ServiceError>;

    /// Execute a statement that returns no rows.
    async fn execute(&self, statement: &str) -> Result<(), ServiceError>;

    /// Insert one batch; returns the number of rows written.
    async fn insert_batch(
        &self,
        table: &str,
        dataset: &DatasetSpec,
        batch: &Batch,
    ) -> Result<u64, ServiceError>;

    /// Merge all parts of `table` so storage is measured in its final form.
    async fn optimize_table(&self, table: &str) -> Result<(), ServiceError>;

    /// Row count and on-disk size of the active parts of `table`.
    async fn table_storage(&self, table: &str) -> Result<StorageStats, ServiceError>;

    /// Drop every server-side cache that could make a later run warmer than
    /// an earlier one.
    async fn drop_caches(&self) -> Result<(), ServiceError>;

    /// Run a query. When `run_id` is given the service tags the execution
    /// with it so its profile can be fetched later.
    async fn run_query(&self, sql: &str, run_id: Option<&str>)
        -> Result<ResultSet, ServiceError>;

    /// Force buffered query log entries to become visible.
    async fn flush_logs(&self) -> Result<(), ServiceError>;

    /// Profile counters for the given run ids. Ids without a finished log
    /// entry are absent from the result.
    async fn fetch_profiles(
        &self,
        run_ids: &[String],
    ) -> Result<HashMap<String, ProfileCounters>, ServiceError>;
}
