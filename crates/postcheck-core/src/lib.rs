//! # Postcheck Core
//!
//! Pure primitives for postcheck: postcodes, address records, verification
//! outcomes, batch sampling and the final classification.
//!
//! This crate contains no I/O, no storage, no networking. Everything here is
//! computation over in-memory values, so the engine and the tests can share
//! one definition of what "confirmed" and "exhausted" mean.
//!
//! ## Key Types
//!
//! - [`Postcode`] - The code being verified against the external authority
//! - [`AddressRecord`] - One address of the internal directory
//! - [`Outcome`] / [`Observation`] - A lookup result or one of the sentinels
//! - [`VerificationRecord`] - One attempted address, as persisted in the cache
//! - [`HopelessRecord`] - One reverse-verified postcode
//! - [`BatchSampler`] - Bounded random draw of unverified addresses
//! - [`SummaryClassifier`] - Tri-state classification of every postcode

pub mod address;
pub mod classify;
pub mod error;
pub mod record;
pub mod sampler;
pub mod types;

pub use address::AddressComponents;
pub use classify::{PostcodeStatus, PostcodeSummary, StatusTally, SummaryClassifier};
pub use error::CoreError;
pub use record::{
    HopelessRecord, HopelessStatus, Observation, Outcome, VerificationRecord, NO_DATA_SENTINEL,
    TRANSIENT_SENTINEL,
};
pub use sampler::{Batch, BatchSampler, DEFAULT_BATCH_SIZE};
pub use types::{AddressId, AddressRecord, Postcode};
