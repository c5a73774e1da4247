//! Crate-level error types.
//!
//! [`BookwatchError`] unifies every error source (configuration, HTTP,
//! JSON, chart ordering, ticket validation) behind a single enum so callers
//! can match on the variant they care about while still using the `?`
//! operator for easy propagation.

use crate::ticket::TicketError;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BookwatchError>;

/// Top-level error type returned by all public APIs.
#[derive(Debug, thiserror::Error)]
pub enum BookwatchError {
    /// Configuration could not be read or contained an invalid value.
    #[error("configuration error: {0}")]
    Config(String),

    /// The request never produced a response: connect failure, timeout,
    /// or the body could not be read.
    #[error("network failure: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// JSON serialization or deserialization failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// A reference data file could not be read.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A sample was offered to a chart series out of time order.
    #[error("ordering violation: sample at {attempted} does not follow {last}")]
    OrderingViolation { last: i64, attempted: i64 },

    /// The trade ticket is incomplete or invalid.
    #[error("validation failure: {0}")]
    Validation(#[from] TicketError),

    /// The session actor has stopped and can no longer take commands.
    #[error("session closed")]
    SessionClosed,
}
