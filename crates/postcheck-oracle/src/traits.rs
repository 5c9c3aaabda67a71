//! Oracle traits: the abstract interface to the external authority.

use async_trait::async_trait;
use postcheck_core::{Outcome, Postcode};

use crate::error::LookupError;

/// Resolves an address to the postcode the external authority registers
/// for it.
///
/// Implementations must be thread-safe (Send + Sync). Calls are issued one
/// at a time; implementations need not rate-limit.
#[async_trait]
pub trait LookupOracle: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Postcode, LookupError>;
}

/// Resolves a postcode to one representative address, typically the post
/// office that serves it.
///
/// Callers treat every error as "no address": the reverse check records it
/// and never retries it.
#[async_trait]
pub trait SecondaryDirectory: Send + Sync {
    async fn representative_address(&self, postcode: &Postcode) -> Result<String, LookupError>;
}

/// Fold a lookup result into the outcome that gets recorded.
pub fn observe<T>(result: Result<T, LookupError>) -> Outcome<T> {
    match result {
        Ok(value) => Outcome::Found(value),
        Err(LookupError::Transient(_)) => Outcome::TransientError,
        Err(LookupError::NoData) => Outcome::NoData,
    }
}
