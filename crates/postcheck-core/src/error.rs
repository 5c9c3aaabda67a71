//! Error types for postcheck core.

use thiserror::Error;

/// Errors raised while constructing or parsing core values.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid postcode: {0:?}")]
    InvalidPostcode(String),

    #[error("invalid address identifier: {0:?}")]
    InvalidAddressId(String),

    #[error("unknown postcode status: {0:?}")]
    UnknownStatus(String),

    #[error("batch size must be at least 1")]
    ZeroBatchSize,
}
