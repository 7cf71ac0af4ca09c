//! Runtime environment for schema-bench.
//!
//! Provides the concrete collaborators the orchestration engine is written
//! against:
//!
//! - [`DockerLauncher`]: one labelled `clickhouse-server` container per run
//! - [`ExternalLauncher`]: a server the user already runs
//! - [`StatvfsProbe`]: free space on the filesystem that will hold the data
//! - [`find_orphans`] / [`remove_orphans`]: containers left by crashed runs
//! - [`capture_host_info`]: hostname, cores and memory for the report

pub mod disk;
pub mod docker;
pub mod error;
pub mod external;
pub mod host;
pub mod orphans;

pub use disk::StatvfsProbe;
pub use docker::{DockerConfig, DockerLauncher, DEFAULT_IMAGE, MANAGED_LABEL};
pub use error::EnvironmentError;
pub use external::ExternalLauncher;
pub use host::{capture_host_info, HostInfo};
pub use orphans::{find_orphans, remove_orphans, OrphanContainer};
