//! Error types for scenario orchestration.

use crate::report::TerminalStatus;
use bench_core::{ConfigError, ServiceError};
use thiserror::Error;

/// Errors that end a scenario or one of its phases.
#[derive(Error, Debug)]
pub enum BenchError {
    /// Configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Not enough free space for every schema's copy of the dataset.
    #[error(
        "Insufficient disk space at {location}: {required} bytes required, {available} available"
    )]
    InsufficientDisk {
        location: String,
        required: u64,
        available: u64,
    },

    /// The free-space probe itself failed.
    #[error("Disk probe failed for {location}: {source}")]
    DiskProbe {
        location: String,
        #[source]
        source: std::io::Error,
    },

    /// The service instance could not be started.
    #[error("Service start failed: {0}")]
    ServiceStart(ServiceError),

    /// A statement against the running service failed.
    #[error("Service error: {0}")]
    Service(#[from] ServiceError),

    /// An interrupt was observed at a phase boundary.
    #[error("Scenario cancelled")]
    Cancelled,
}

impl BenchError {
    /// Terminal status this error produces when it ends a scenario.
    pub fn status(&self) -> TerminalStatus {
        match self {
            BenchError::Config(_) => TerminalStatus::ConfigurationError,
            BenchError::InsufficientDisk { .. } => TerminalStatus::ResourceError,
            BenchError::DiskProbe { .. }
            | BenchError::ServiceStart(_)
            | BenchError::Service(_) => TerminalStatus::EnvironmentError,
            BenchError::Cancelled => TerminalStatus::Cancelled,
        }
    }
}
