//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context.

use thiserror::Error;

use crate::session::budget::BudgetDimension;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for querydeck.
#[derive(Error, Debug)]
pub enum Error {
    /// A session budget dimension would be exceeded. Always recoverable by the
    /// caller (wait, reduce scope, or raise the limit); never corrupts counters.
    #[error("budget exceeded: {dimension} would reach {attempted:.1} of {limit:.1}")]
    BudgetExceeded {
        dimension: BudgetDimension,
        attempted: f64,
        limit: f64,
    },

    /// Failure reported by the remote platform (network, auth, rate-limit,
    /// platform-side error). Never retried inside the core.
    #[error("upstream failure: {0}")]
    Upstream(String),

    /// Result payload is absent or not row-shaped.
    #[error("malformed result: {0}")]
    MalformedResult(String),

    /// Resource not found (unknown tool, unknown job, missing file).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid caller input (bad parameters, unusable arguments).
    #[error("validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV read/write errors.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// HTTP transport errors from the platform client.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

// Convenience constructors
impl Error {
    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    pub fn malformed_result(msg: impl Into<String>) -> Self {
        Self::MalformedResult(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
