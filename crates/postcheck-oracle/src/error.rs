//! Error types for the oracle module.

use thiserror::Error;

/// Why a single lookup produced no value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LookupError {
    /// Transport failure, unexpected status or unparsable body.
    #[error("transient lookup failure: {0}")]
    Transient(String),

    /// The service answered and had nothing for this query.
    #[error("no data")]
    NoData,
}

/// Errors building a client from its profile.
#[derive(Debug, Error)]
pub enum OracleError {
    /// A header name or value is not valid HTTP.
    #[error("invalid header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    /// The body template cannot carry a query.
    #[error("invalid body template: {0}")]
    InvalidTemplate(String),

    /// The HTTP client could not be constructed.
    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Result type for client construction.
pub type Result<T> = std::result::Result<T, OracleError>;
