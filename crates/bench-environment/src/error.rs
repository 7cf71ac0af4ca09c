//! Error types for the environment crate.

use bench_core::ServiceError;

/// Errors raised while driving docker or probing the host.
#[derive(Debug, thiserror::Error)]
pub enum EnvironmentError {
    /// The docker CLI could not be spawned
    #[error("Failed to invoke docker: {0}")]
    Spawn(#[from] std::io::Error),

    /// docker ran but reported failure
    #[error("docker {command} failed: {stderr}")]
    Command { command: String, stderr: String },

    /// The service never answered its health check
    #[error("Service at {endpoint} not healthy after {waited_secs}s")]
    Unhealthy { endpoint: String, waited_secs: u64 },
}

impl From<EnvironmentError> for ServiceError {
    fn from(err: EnvironmentError) -> Self {
        ServiceError::Unreachable(err.to_string())
    }
}
