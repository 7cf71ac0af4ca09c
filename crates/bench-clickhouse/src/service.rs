//! [`BenchService`] over the ClickHouse HTTP interface.

use crate::client::ClickHouseClient;
use crate::ddl;
use crate::format::encode_json_each_row;
use async_trait::async_trait;
use bench_core::{
    Batch, BenchService, DatasetSpec, ProfileCounters, ResultSet, SchemaDef, ServiceError,
    StorageStats,
};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ProfileRow {
    query_id: String,
    #[serde(flatten)]
    counters: ProfileCounters,
}

#[derive(Debug, Deserialize)]
struct VersionRow {
    version: String,
}

/// ClickHouse-backed service.
#[derive(Debug, Clone)]
pub struct ClickHouseService {
    client: ClickHouseClient,
}

impl ClickHouseService {
    pub fn new(client: ClickHouseClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }
}

#[async_trait]
impl BenchService for ClickHouseService {
    async fn server_version(&self) -> Result<String, ServiceError> {
        let sql = "SELECT version() AS version";
        let rows: Vec<VersionRow> = self
            .client
            .query_json(sql)
            .await
            .map_err(|e| e.into_service_error(sql))?;
        rows.into_iter()
            .next()
            .map(|r| r.version)
            .ok_or_else(|| ServiceError::Protocol("version() returned no rows".to_string()))
    }

    async fn create_table(
        &self,
        table: &str,
        dataset: &DatasetSpec,
        schema: &SchemaDef,
    ) -> Result<(), ServiceError> {
        self.execute(&ddl::drop_table(table)).await?;
        self.execute(&ddl::create_table(table, dataset, schema)).await
    }

    async fn drop_table(&self, table: &str) -> Result<(), ServiceError> {
        self.execute(&ddl::drop_table(table)).await
    }

    async fn execute(&self, statement: &str) -> Result<(), ServiceError> {
        self.client
            .execute(statement)
            .await
            .map_err(|e| e.into_service_error(statement))
    }

    async fn insert_batch(
        &self,
        table: &str,
        dataset: &DatasetSpec,
        batch: &Batch,
    ) -> Result<u64, ServiceError> {
        if batch.is_empty() {
            return Ok(0);
        }
        let body = encode_json_each_row(dataset, batch)
            .map_err(|e| ServiceError::Protocol(format!("failed to encode batch: {e}")))?;
        self.client
            .insert_json_lines(table, &dataset.column_names(), body)
            .await
            .map_err(|e| e.into_service_error(&format!("INSERT INTO `{table}` (batch {})", batch.index)))?;
        Ok(batch.len() as u64)
    }

    async fn optimize_table(&self, table: &str) -> Result<(), ServiceError> {
        self.execute(&ddl::optimize_final(table)).await
    }

    async fn table_storage(&self, table: &str) -> Result<StorageStats, ServiceError> {
        let sql = ddl::storage_query(table);
        let rows: Vec<StorageStats> = self
            .client
            .query_json(&sql)
            .await
            .map_err(|e| e.into_service_error(&sql))?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    async fn drop_caches(&self) -> Result<(), ServiceError> {
        for statement in ddl::DROP_CACHE_STATEMENTS {
            self.execute(statement).await?;
        }
        Ok(())
    }

    async fn run_query(&self, sql: &str, run_id: Option<&str>) -> Result<ResultSet, ServiceError> {
        self.client
            .query_rows(sql, run_id)
            .await
            .map_err(|e| e.into_service_error(sql))
    }

    async fn flush_logs(&self) -> Result<(), ServiceError> {
        self.execute("SYSTEM FLUSH LOGS").await
    }

    async fn fetch_profiles(
        &self,
        run_ids: &[String],
    ) -> Result<HashMap<String, ProfileCounters>, ServiceError> {
        if run_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let sql = ddl::profile_query(run_ids);
        let rows: Vec<ProfileRow> = self
            .client
            .query_json(&sql)
            .await
            .map_err(|e| e.into_service_error(&sql))?;
        Ok(rows
            .into_iter()
            .map(|row| (row.query_id, row.counters))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_row_decodes_from_json_each_row() {
        let line = r#"{"query_id":"r1","read_rows":10,"read_bytes":80,"written_rows":0,"written_bytes":0,"result_rows":1,"result_bytes":8,"memory_usage":4096,"query_duration_ms":3,"real_time_us":2900,"user_time_us":1500,"system_time_us":200,"os_read_bytes":0,"os_write_bytes":0,"selected_parts":1,"selected_marks":2}"#;
        let row: ProfileRow = serde_json::from_str(line).unwrap();
        assert_eq!(row.query_id, "r1");
        assert_eq!(row.counters.read_rows, 10);
        assert_eq!(row.counters.selected_marks, 2);
        assert_eq!(row.counters.real_time_us, 2900);
    }

    #[test]
    fn test_storage_row_decodes() {
        let stats: StorageStats = serde_json::from_str(
            r#"{"rows":100,"compressed_bytes":1200,"uncompressed_bytes":4000}"#,
        )
        .unwrap();
        assert_eq!(stats.rows, 100);
        assert_eq!(stats.uncompressed_bytes, 4000);
    }
}
