//! ClickHouse implementation of the schema-bench service capability.
//!
//! All traffic goes through the HTTP interface:
//!
//! - statements are POSTed as the request body
//! - inserts stream rows as `JSONEachRow`
//! - measured queries return `TabSeparated` text, kept cell-for-cell
//! - profiles are read back from `system.query_log` by `query_id`

pub mod client;
pub mod ddl;
pub mod error;
pub mod format;
pub mod service;

pub use client::{ClickHouseClient, ClickHouseConfig};
pub use error::ClickHouseError;
pub use service::ClickHouseService;
