//! Traits at the storage seams.
//!
//! [`CacheRecord`] describes how a record type is keyed and laid out in its
//! table, so one [`CacheStore`](crate::CacheStore) serves both caches.
//! [`AddressSource`] is the read-only view of the internal directory.

use std::fmt::Debug;
use std::hash::Hash;

use async_trait::async_trait;
use postcheck_core::{AddressRecord, Postcode};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::Result;

/// A record that can live in a [`CacheStore`](crate::CacheStore).
pub trait CacheRecord: Clone + Send + Sync + 'static {
    /// Dedupe key. No two records of one store share it.
    type Key: Clone + Eq + Hash + Debug + Send + Sync;

    /// Flat row shape written to the delimited table.
    type Row: Serialize + DeserializeOwned;

    /// Column names, in row order.
    const HEADERS: &'static [&'static str];

    fn key(&self) -> &Self::Key;

    /// True for records produced by a transient failure.
    fn is_transient(&self) -> bool;

    /// The postcode this record attests to exist, if any.
    fn attested_postcode(&self) -> Option<&Postcode>;

    fn to_row(&self) -> Self::Row;

    /// Rebuild a record from a table row. The error is a human-readable reason.
    fn from_row(row: Self::Row) -> std::result::Result<Self, String>;
}

/// Read-only access to the internal address directory.
///
/// Implementations must return every address of a postcode; the
/// classifier compares cache counts against these totals.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Number of addresses per postcode, ordered by postcode. Each count must
    /// equal the length of [`AddressSource::addresses_for`] for that postcode.
    async fn count_by_postcode(&self) -> Result<Vec<(Postcode, u64)>>;

    /// The complete address set of one postcode.
    async fn addresses_for(&self, postcode: &Postcode) -> Result<Vec<AddressRecord>>;
}
