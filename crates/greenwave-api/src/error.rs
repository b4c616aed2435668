//! Error types for greenwave-api

use greenwave_core::SchedulerError;
use thiserror::Error;

/// Provider error type
#[derive(Debug, Error)]
pub enum Error {
    /// Network error
    #[error("network error: {0}")]
    Network(String),

    /// The service answered with an error status
    #[error("api error: {0}")]
    Api(String),

    /// The response body could not be understood
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Reading a local data file failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for SchedulerError {
    fn from(err: Error) -> Self {
        SchedulerError::Api(err.to_string())
    }
}
