//! # Postcheck Store
//!
//! Persistence for postcheck: the verification caches, the `;`-delimited
//! report tables, and the internal address directory.
//!
//! ## Overview
//!
//! Verification outcomes live in a [`CacheStore`], a keyed, insertion-ordered
//! collection that is loaded once at session start and rewritten in full at
//! session end. The same store type backs both caches:
//!
//! - [`PrimaryCache`] - one [`VerificationRecord`] per attempted address, keyed by address id
//! - [`HopelessCache`] - one [`HopelessRecord`] per reverse-verified postcode, keyed by postcode
//!
//! The internal directory sits behind the [`AddressSource`] trait, with
//! [`SqliteDirectory`] for real runs and [`MemoryDirectory`] for tests.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use postcheck_store::{PrimaryCache, CacheStore};
//!
//! fn example() {
//!     // Absent file yields an empty cache
//!     let mut cache: PrimaryCache = CacheStore::load("cache.csv").unwrap();
//!
//!     // ... insert records while verifying ...
//!
//!     cache.prune_errors();
//!     cache.save().unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Idempotent inserts**: inserting a record whose key exists returns `AlreadyExists`
//! - **Transient failures are not state**: `prune_errors` drops them before a save
//! - **Atomic rewrite**: saves go to a temporary sibling file renamed over the target
//! - **Fail fast**: a malformed cache file is an error, never silently repaired
//! - **Single writer**: concurrent sessions against one cache file are not supported
//!
//! [`VerificationRecord`]: postcheck_core::VerificationRecord
//! [`HopelessRecord`]: postcheck_core::HopelessRecord

pub mod cache;
pub mod directory;
pub mod error;
pub mod table;
pub mod traits;

pub use cache::{CacheStore, HopelessCache, InsertResult, PrimaryCache};
pub use directory::{MemoryDirectory, SqliteDirectory};
pub use error::{Result, StoreError};
pub use table::{read_postcode_list, write_table};
pub use traits::{AddressSource, CacheRecord};
