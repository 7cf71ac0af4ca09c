//! Resolved scenario definitions.
//!
//! These are the immutable, validated forms produced by [`crate::config`].
//! Every reference has been resolved, every column rule has been checked, and
//! post-create scripts have been read from disk. The orchestration engine
//! only ever sees these types.

use crate::types::ColumnType;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;

/// Placeholder substituted with the physical table name in query
/// templates and post-create scripts.
pub const TABLE_PLACEHOLDER: &str = "{table}";

/// A value domain: either an inclusive range or an explicit set of values.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain<T> {
    Range { min: T, max: T },
    Values(Vec<T>),
}

/// Domain of a string column.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StringDomain {
    /// Alphanumeric strings whose length is sampled from the inclusive bounds.
    Length { min: usize, max: usize },
    Values(Vec<String>),
}

/// Generation rule for one column, one variant per supported type family.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ValueRule {
    Int {
        domain: Domain<i64>,
    },
    UInt {
        domain: Domain<u64>,
    },
    Float {
        domain: Domain<f64>,
    },
    String {
        domain: StringDomain,
    },
    Date {
        domain: Domain<NaiveDate>,
    },
    DateTime {
        domain: Domain<NaiveDateTime>,
    },
    Uuid,
    Enum {
        labels: Vec<String>,
    },
    Nullable {
        null_probability: f64,
        inner: Box<ValueRule>,
    },
    Array {
        min_length: usize,
        max_length: usize,
        element: Box<ValueRule>,
    },
    LowCardinality {
        inner: Box<ValueRule>,
    },
}

/// One dataset column: its declared type and its generation rule.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    pub rule: ValueRule,
}

/// Logical schema of the generated data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSpec {
    pub name: String,
    pub columns: Vec<ColumnSpec>,
}

impl DatasetSpec {
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// A post-create script, already read from disk and split into statements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostCreateScript {
    pub path: PathBuf,
    pub statements: Vec<String>,
}

impl PostCreateScript {
    /// Statements with the table placeholder substituted.
    pub fn render(&self, table: &str) -> Vec<String> {
        self.statements
            .iter()
            .map(|s| s.replace(TABLE_PLACEHOLDER, table))
            .collect()
    }
}

/// One physical table design under test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDef {
    pub name: String,
    pub engine: String,
    pub order_by: Vec<String>,
    pub partition_by: Option<String>,
    pub primary_key: Option<Vec<String>>,
    /// Table-level settings, values already rendered as SQL literals.
    pub settings: Vec<(String, String)>,
    pub post_create: Vec<PostCreateScript>,
}

impl SchemaDef {
    /// Physical table name used for this design.
    pub fn table_name(&self) -> &str {
        &self.name
    }
}

/// One query template.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryDef {
    pub name: String,
    pub template: String,
    /// Whether the query defines its own row order. Ordered results are
    /// compared as returned; unordered ones are sorted first.
    pub ordered: bool,
}

impl QueryDef {
    pub fn render(&self, table: &str) -> String {
        self.template.replace(TABLE_PLACEHOLDER, table)
    }
}

/// Benchmark parameters of one scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchmarkParams {
    pub row_count: u64,
    pub batch_size: usize,
    pub warmup_runs: u32,
    pub measured_runs: u32,
    pub seed: u64,
    /// Upper bound on concurrent table inserts during loading.
    pub insert_workers: usize,
    /// Differing rows recorded per mismatching schema pair.
    pub max_diff_rows: usize,
}

impl BenchmarkParams {
    /// Number of batches needed to reach `row_count`.
    pub fn batch_count(&self) -> u64 {
        if self.batch_size == 0 {
            return 0;
        }
        self.row_count.div_ceil(self.batch_size as u64)
    }
}

/// A fully resolved scenario.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScenarioSpec {
    pub name: String,
    pub dataset: DatasetSpec,
    pub schemas: Vec<SchemaDef>,
    pub queries: Vec<QueryDef>,
    pub params: BenchmarkParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(row_count: u64, batch_size: usize) -> BenchmarkParams {
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

    #[test]
    fn test_batch_count() {
        assert_eq!(params(100, 10).batch_count(), 10);
        assert_eq!(params(101, 10).batch_count(), 11);
        assert_eq!(params(5, 10).batch_count(), 1);
    }

    #[test]
    fn test_query_render() {
        let query = QueryDef {
            name: "count".into(),
            template: "SELECT count() FROM {table} WHERE x IN (SELECT x FROM {table})".into(),
            ordered: false,
        };
        assert_eq!(
            query.render("by_time"),
            "SELECT count() FROM by_time WHERE x IN (SELECT x FROM by_time)"
        );
    }

    #[test]
    fn test_post_create_render() {
        let script = PostCreateScript {
            path: PathBuf::from("proj.sql"),
            statements: vec!["ALTER TABLE {table} ADD PROJECTION p (SELECT *)".into()],
        };
        assert_eq!(
            script.render("t1"),
            vec!["ALTER TABLE t1 ADD PROJECTION p (SELECT *)".to_string()]
        );
    }
}
