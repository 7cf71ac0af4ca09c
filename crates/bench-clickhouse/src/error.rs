//! Error types for the ClickHouse client.

use bench_core::ServiceError;
use thiserror::Error;

/// Errors that can occur when talking to ClickHouse.
#[derive(Error, Debug)]
pub enum ClickHouseError {
    /// Transport-level failure (connect, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("ClickHouse returned {status}: {body}")]
    Server { status: u16, body: String },

    /// A response body could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl ClickHouseError {
    /// Convert into the service-level error, attaching the statement that
    /// failed.
    pub fn into_service_error(self, statement: &str) -> ServiceError {
        match self {
            ClickHouseError::Http(e) if e.is_connect() || e.is_timeout() => {
                ServiceError::Unreachable(e.to_string())
            }
            ClickHouseError::Http(e) => ServiceError::Protocol(e.to_string()),
            ClickHouseError::Server { body, .. } => {
                ServiceError::statement(statement, body.trim().to_string())
            }
            ClickHouseError::Decode(message) => ServiceError::Protocol(message),
        }
    }
}
