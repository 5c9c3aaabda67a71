//! # Postcheck Oracle
//!
//! Clients for the external authority postcheck verifies against.
//!
//! ## Overview
//!
//! Two seams are defined here:
//!
//! - [`LookupOracle`] - address string -> registered postcode
//! - [`SecondaryDirectory`] - postcode -> a representative address (the post office)
//!
//! Both return a closed set of failures, [`LookupError`], that callers match
//! exhaustively: a transient failure is retried in a later session, a
//! definitive "no data" answer is recorded and never asked again.
//!
//! The HTTP implementations take everything protocol-specific (endpoint,
//! headers, cookies, request body, where the answer sits in the response)
//! from an injected [`ServiceProfile`]. [`memory`] holds scripted
//! implementations for tests.

pub mod error;
pub mod http;
pub mod memory;
pub mod profile;
pub mod traits;

pub use error::{LookupError, OracleError};
pub use http::{HttpOracle, HttpPostOffices};
pub use memory::{MemoryOracle, MemoryPostOffices};
pub use profile::ServiceProfile;
pub use traits::{observe, LookupOracle, SecondaryDirectory};
