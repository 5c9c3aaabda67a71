//! Error types for postcheck sessions.

use postcheck_core::CoreError;
use postcheck_oracle::OracleError;
use postcheck_store::StoreError;
use thiserror::Error;

/// Errors that end a session.
///
/// Lookup failures are not here: they are recorded as outcomes and never
/// abort a session.
#[derive(Debug, Error)]
pub enum PostcheckError {
    /// Cache, table or directory error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// HTTP client could not be built from its profile.
    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    /// Invalid core value.
    #[error("invalid value: {0}")]
    Core(#[from] CoreError),

    /// Configuration file missing, unparsable or invalid.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for postcheck operations.
pub type Result<T> = std::result::Result<T, PostcheckError>;
