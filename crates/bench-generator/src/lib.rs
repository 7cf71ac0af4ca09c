//! Deterministic batch generator for schema-bench.
//!
//! Produces bounded batches of rows from a [`DatasetSpec`]. Every batch is
//! generated from its own RNG, seeded from the scenario seed and the batch
//! index, so batch `n` always has the same content no matter how many tables
//! consume it or in which order batches are requested.
//!
//! # Architecture
//!
//! ```text
//! DatasetSpec + seed
//!        │
//!        ▼
//! ┌──────────────────┐
//! │  BatchGenerator  │
//! │                  │
//! │  - seed          │
//! │  - next index    │
//! │  - buffer: Batch │  (reused every iteration)
//! └────────┬─────────┘
//!          │
//!          ▼
//!    &Batch { index, rows }
//! ```
//!
//! # Example
//!
//! ```rust
//! use bench_core::{ColumnSpec, ColumnType, DatasetSpec, Domain, ValueRule};
//! use bench_generator::BatchGenerator;
//!
//! let dataset = DatasetSpec {
//!     name: "events".into(),
//!     columns: vec![ColumnSpec {
//!         name: "user_id".into(),
//!         column_type: ColumnType::UInt32,
//!         rule: ValueRule::UInt { domain: Domain::Range { min: 1, max: 100 } },
//!     }],
//! };
//!
//! let mut generator = BatchGenerator::new(dataset, 42, 25, 10);
//! let mut total = 0;
//! while let Some(batch) = generator.next_batch() {
//!     total += batch.len();
//! }
//! assert_eq!(total, 25);
//! ```
//!
//! [`DatasetSpec`]: bench_core::DatasetSpec

pub mod estimate;
pub mod generator;
pub mod generators;

pub use estimate::{estimate_dataset_bytes, estimate_row_width};
pub use generator::{fill_batch, next_batch, seed_for_batch, BatchGenerator};
pub use generators::generate_value;
