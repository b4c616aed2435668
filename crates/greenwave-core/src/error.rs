//! Error types for greenwave-core
//!
//! Validation failures are collected into a single [`SchedulerError::InvalidJob`]
//! so a broken job definition reports every problem at once.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Scheduler error types
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A job definition failed validation
    #[error("invalid job '{identity}': {}", violations.join("; "))]
    InvalidJob {
        /// Job identity
        identity: String,
        /// Every violation found while validating the definition
        violations: Vec<String>,
    },

    /// A programmatic job was scheduled under an identity already in use
    #[error("job already scheduled: {0}")]
    DuplicateJob(String),

    /// No job with the given identity is registered
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// A duration, time-of-day, window or cron expression could not be parsed
    #[error("invalid expression '{expression}': {message}")]
    InvalidExpression {
        /// The offending input
        expression: String,
        /// What was wrong with it
        message: String,
    },

    /// A carbon intensity API call failed
    #[error("carbon intensity api error: {0}")]
    Api(String),

    /// No usable carbon intensity data for the requested window
    #[error("no carbon intensity data for zone '{zone}' between {start} and {end}")]
    NoData {
        /// Requested zone
        zone: String,
        /// Window start
        start: DateTime<Utc>,
        /// Window end
        end: DateTime<Utc>,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Job execution error
    #[error("execution error: {0}")]
    Execution(String),

    /// The scheduler is shutting down and no longer accepts work
    #[error("scheduler is shutting down")]
    ShuttingDown,
}

impl SchedulerError {
    /// Shorthand for an expression parse failure
    pub fn expression(expression: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            message: message.into(),
        }
    }

    /// Whether this error came from definition-time validation
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidJob { .. } | Self::InvalidExpression { .. } | Self::InvalidConfig(_)
        )
    }
}
