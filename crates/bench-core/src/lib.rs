//! Core types for the schema-bench framework.
//!
//! This crate provides the foundational types shared by every other crate:
//!
//! - [`ColumnType`] - ClickHouse column types parsed from their SQL text
//! - [`Value`], [`Batch`], [`ResultSet`] - generated data and query results
//! - [`ScenarioSpec`] - a fully resolved benchmark scenario
//! - [`BenchConfig`] - YAML configuration loading and validation
//! - [`BenchService`] - the capability surface of a running service
//!
//! # Architecture
//!
//! ```text
//! bench-core (this crate)
//!    │
//!    ├─── bench-generator    (deterministic batches from a DatasetSpec)
//!    ├─── bench-clickhouse   (BenchService over the ClickHouse HTTP interface)
//!    ├─── bench-environment  (docker lifecycle, disk probe, host info)
//!    └─── bench-runner       (load, measure, validate, report)
//! ```
//!
//! # Example
//!
//! ```rust
//! use bench_core::types::ColumnType;
//!
//! let ty: ColumnType = "Array(Nullable(String))".parse().unwrap();
//! assert_eq!(ty.to_string(), "Array(Nullable(String))");
//! ```

pub mod config;
pub mod service;
pub mod spec;
pub mod types;
pub mod values;

pub use config::{BenchConfig, ConfigError};
pub use service::{BenchService, ProfileCounters, ServiceError, StorageStats};
pub use spec::{
    BenchmarkParams, ColumnSpec, DatasetSpec, Domain, PostCreateScript, QueryDef, ScenarioSpec,
    SchemaDef, StringDomain, ValueRule, TABLE_PLACEHOLDER,
};
pub use types::{ColumnType, TypeParseError};
pub use values::{Batch, ResultSet, Row, Value};
