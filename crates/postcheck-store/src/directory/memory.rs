//! In-memory implementation of the AddressSource trait.
//!
//! Same semantics as the SQLite directory (postcode order, complete address
//! sets) with no persistence. Primarily for testing.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;

use postcheck_core::{AddressRecord, Postcode};

use crate::error::{Result, StoreError};
use crate::traits::AddressSource;

/// In-memory address directory. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryDirectory {
    addresses: RwLock<BTreeMap<Postcode, Vec<AddressRecord>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from address records.
    pub fn with_addresses(records: impl IntoIterator<Item = AddressRecord>) -> Self {
        let dir = Self::new();
        for record in records {
            dir.insert(record);
        }
        dir
    }

    pub fn insert(&self, record: AddressRecord) {
        let mut addresses = self
            .addresses
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        addresses
            .entry(record.target_postcode.clone())
            .or_default()
            .push(record);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, BTreeMap<Postcode, Vec<AddressRecord>>>> {
        self.addresses
            .read()
            .map_err(|e| StoreError::Directory(format!("lock poisoned: {e}")))
    }
}

#[async_trait]
impl AddressSource for MemoryDirectory {
    async fn count_by_postcode(&self) -> Result<Vec<(Postcode, u64)>> {
        let addresses = self.read()?;
        Ok(addresses
            .iter()
            .map(|(postcode, records)| (postcode.clone(), records.len() as u64))
            .collect())
    }

    async fn addresses_for(&self, postcode: &Postcode) -> Result<Vec<AddressRecord>> {
        let addresses = self.read()?;
        Ok(addresses.get(postcode).cloned().unwrap_or_default())
    }
}
