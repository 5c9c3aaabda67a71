//! Keyed, insertion-ordered cache of verification outcomes.
//!
//! A cache is loaded once, grows during a session, and is rewritten in full
//! on save. It is the only mutable state shared across sessions.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use postcheck_core::{
    AddressId, HopelessRecord, Observation, Outcome, Postcode, VerificationRecord,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::table;
use crate::traits::CacheRecord;

/// Result of inserting a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Record was new and has been appended.
    Inserted,
    /// A record with the same key exists; the new one was dropped.
    AlreadyExists,
}

/// Cache of address attempts, keyed by address id.
pub type PrimaryCache = CacheStore<VerificationRecord>;

/// Cache of reverse verifications, keyed by target postcode.
pub type HopelessCache = CacheStore<HopelessRecord>;

/// In-memory view of one cache table.
#[derive(Debug, Clone)]
pub struct CacheStore<R: CacheRecord> {
    /// Backing file. `None` for caches that are never persisted.
    path: Option<PathBuf>,
    /// Records in insertion order.
    records: Vec<R>,
    /// Key -> position in `records`.
    index: HashMap<R::Key, usize>,
    /// Postcodes some record attests to exist.
    attested: HashSet<Postcode>,
}

impl<R: CacheRecord> CacheStore<R> {
    /// Create an empty cache with no backing file.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            records: Vec::new(),
            index: HashMap::new(),
            attested: HashSet::new(),
        }
    }

    /// Load a cache from `path`.
    ///
    /// A missing file yields an empty cache bound to `path`. A malformed file,
    /// including one with duplicate keys, is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut store = Self::in_memory();

        match table::read_records::<R>(&path)? {
            None => {
                info!(path = %path.display(), "cache not found, starting from scratch");
            }
            Some(rows) => {
                for (line, record) in rows {
                    if store.insert(record) == InsertResult::AlreadyExists {
                        return Err(StoreError::Malformed {
                            path,
                            line,
                            reason: "duplicate key".into(),
                        });
                    }
                }
                info!(path = %path.display(), records = store.len(), "cache loaded");
            }
        }

        store.path = Some(path);
        Ok(store)
    }

    /// Create a cache holding `records`, bound to no file.
    pub fn from_records(records: impl IntoIterator<Item = R>) -> Self {
        let mut store = Self::in_memory();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[R] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.records.iter()
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.index.get(key).map(|&i| &self.records[i])
    }

    /// Membership test by dedupe key.
    pub fn contains(&self, key: &R::Key) -> bool {
        self.index.contains_key(key)
    }

    /// True if any record attests that `postcode` exists.
    pub fn is_confirmed(&self, postcode: &Postcode) -> bool {
        self.attested.contains(postcode)
    }

    /// Append `record` unless its key is already present.
    pub fn insert(&mut self, record: R) -> InsertResult {
        if self.index.contains_key(record.key()) {
            return InsertResult::AlreadyExists;
        }
        if let Some(postcode) = record.attested_postcode() {
            self.attested.insert(postcode.clone());
        }
        self.index.insert(record.key().clone(), self.records.len());
        self.records.push(record);
        InsertResult::Inserted
    }

    /// Keep only the items whose key is not in the cache.
    pub fn remove_matching<T>(&self, items: Vec<T>, key_of: impl Fn(&T) -> &R::Key) -> Vec<T> {
        items
            .into_iter()
            .filter(|item| !self.contains(key_of(item)))
            .collect()
    }

    /// Drop every transient-failure record so it is retried next session.
    ///
    /// Returns the number of records removed.
    pub fn prune_errors(&mut self) -> usize {
        let before = self.records.len();
        self.records.retain(|record| !record.is_transient());
        let pruned = before - self.records.len();
        if pruned > 0 {
            self.reindex();
            debug!(pruned, "pruned transient records");
        }
        pruned
    }

    /// Rewrite the backing file with the current records.
    ///
    /// Caches created with [`CacheStore::in_memory`] have nothing to write.
    pub fn save(&self) -> Result<()> {
        match &self.path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Rewrite `path` with the current records.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        table::write_table(path, R::HEADERS, self.records.iter().map(R::to_row))?;
        info!(path = %path.display(), records = self.records.len(), "cache saved");
        Ok(())
    }

    fn reindex(&mut self) {
        self.index.clear();
        self.attested.clear();
        for (i, record) in self.records.iter().enumerate() {
            self.index.insert(record.key().clone(), i);
            if let Some(postcode) = record.attested_postcode() {
                self.attested.insert(postcode.clone());
            }
        }
    }
}

impl<R: CacheRecord> Default for CacheStore<R> {
    fn default() -> Self {
        Self::in_memory()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Table layouts
// ─────────────────────────────────────────────────────────────────────────────

/// Row of the primary cache table.
#[derive(Debug, Serialize, Deserialize)]
pub struct PrimaryRow {
    pub target: String,
    pub guid: String,
    pub address: String,
    pub pc: String,
}

impl CacheRecord for VerificationRecord {
    type Key = AddressId;
    type Row = PrimaryRow;

    const HEADERS: &'static [&'static str] = &["target", "guid", "address", "pc"];

    fn key(&self) -> &AddressId {
        &self.id
    }

    fn is_transient(&self) -> bool {
        self.observed.is_transient()
    }

    fn attested_postcode(&self) -> Option<&Postcode> {
        self.observed.found()
    }

    fn to_row(&self) -> PrimaryRow {
        PrimaryRow {
            target: self.target_postcode.to_string(),
            guid: self.id.to_string(),
            address: self.address.clone(),
            pc: self.observed.to_string(),
        }
    }

    fn from_row(row: PrimaryRow) -> std::result::Result<Self, String> {
        Ok(Self {
            id: AddressId::new(&row.guid).map_err(|e| e.to_string())?,
            target_postcode: Postcode::new(&row.target).map_err(|e| e.to_string())?,
            address: row.address,
            observed: Observation::parse(&row.pc).map_err(|e| e.to_string())?,
        })
    }
}

/// Row of the hopeless cache table.
#[derive(Debug, Serialize, Deserialize)]
pub struct HopelessRow {
    pub target: String,
    pub address: String,
    pub response: String,
    pub status: String,
}

impl CacheRecord for HopelessRecord {
    type Key = Postcode;
    type Row = HopelessRow;

    const HEADERS: &'static [&'static str] = &["target", "address", "response", "status"];

    fn key(&self) -> &Postcode {
        &self.target
    }

    fn is_transient(&self) -> bool {
        HopelessRecord::is_transient(self)
    }

    fn attested_postcode(&self) -> Option<&Postcode> {
        match self.status {
            postcheck_core::HopelessStatus::Confirmed => Some(&self.target),
            postcheck_core::HopelessStatus::Declined => None,
        }
    }

    fn to_row(&self) -> HopelessRow {
        HopelessRow {
            target: self.target.to_string(),
            address: self.address.to_string(),
            response: self.response.to_string(),
            status: self.status.to_string(),
        }
    }

    fn from_row(row: HopelessRow) -> std::result::Result<Self, String> {
        let address = match Outcome::<String>::parse(&row.address) {
            Ok(address) => address,
            Err(never) => match never {},
        };
        Ok(Self {
            target: Postcode::new(&row.target).map_err(|e| e.to_string())?,
            address,
            response: Observation::parse(&row.response).map_err(|e| e.to_string())?,
            status: row.status.parse().map_err(|e: postcheck_core::CoreError| e.to_string())?,
        })
    }
}
