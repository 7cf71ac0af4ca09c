//! schema-bench
//!
//! Benchmarks alternative physical table designs for one logical dataset on
//! ClickHouse. A scenario loads byte-identical generated data into every
//! design, runs each query against each table with cold caches, attaches
//! server-side profile counters, cross-checks results between designs and
//! exports the measurements.
//!
//! # Crates
//!
//! - `bench_core` - configuration, resolved specs, the service trait
//! - `bench_generator` - deterministic batch generation and size estimates
//! - `bench_clickhouse` - the service over ClickHouse's HTTP interface
//! - `bench_runner` - the orchestration engine
//! - `bench_environment` - docker lifecycle, disk probe, host snapshot
//!
//! # CLI Usage
//!
//! ```bash
//! # Resolve a configuration and print size estimates
//! schema-bench check --config bench.yaml
//!
//! # Run one scenario in a fresh container
//! schema-bench run --config bench.yaml --scenario events_by_time
//!
//! # Run against a server you already operate
//! schema-bench run --config bench.yaml --scenario events_by_time \
//!   --endpoint http://clickhouse:8123
//!
//! # Remove containers left by interrupted runs
//! schema-bench cleanup
//! ```

pub mod commands;
pub mod export;

pub use commands::{check, cleanup, run_scenario, CheckArgs, RunArgs};
pub use export::DirectoryExporter;
