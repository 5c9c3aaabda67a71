//! # Postcheck Testkit
//!
//! Testing utilities for postcheck.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a scratch directory, an in-memory address directory and a
//!   configuration wired to both
//! - **Generators**: Proptest strategies for postcodes, address sets and
//!   oracle outcomes
//!
//! ## Test Fixtures
//!
//! ```rust,no_run
//! use postcheck::{commands, Shutdown};
//! use postcheck_oracle::MemoryOracle;
//! use postcheck_testkit::fixtures::{pc, TestFixture};
//!
//! async fn example() {
//!     let fixture = TestFixture::new().with_postcode("101000", 3);
//!     let oracle = MemoryOracle::new().with_fallback(Ok(pc("101000")));
//!
//!     commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
//!         .await
//!         .unwrap();
//!     assert!(fixture.primary_cache().is_confirmed(&pc("101000")));
//! }
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{address, pc, TestFixture};
