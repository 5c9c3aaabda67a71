//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::PathBuf;

use postcheck::PostcheckConfig;
use postcheck_core::{AddressId, AddressRecord, Postcode};
use postcheck_store::{HopelessCache, MemoryDirectory, PrimaryCache};
use tempfile::TempDir;

/// Parse a postcode literal.
///
/// # Panics
///
/// If `s` is not a valid postcode.
pub fn pc(s: &str) -> Postcode {
    Postcode::new(s).unwrap_or_else(|e| panic!("bad postcode literal {s:?}: {e}"))
}

/// Address record with id `id`, a synthetic address string, and `postcode`.
pub fn address(id: &str, postcode: &str) -> AddressRecord {
    let id = AddressId::new(id).unwrap_or_else(|e| panic!("bad id literal {id:?}: {e}"));
    let address = format!("г Москва, ул Тестовая, д {}", id.as_str());
    AddressRecord::new(id, address, pc(postcode))
}

/// A scratch directory holding every file a session reads or writes, an
/// in-memory address directory, and a configuration pointing at both.
pub struct TestFixture {
    dir: TempDir,
    pub config: PostcheckConfig,
    pub directory: MemoryDirectory,
}

impl TestFixture {
    /// Empty directory, default session settings, paths inside a fresh temp dir.
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}"));
        let mut config = PostcheckConfig::default();
        config.paths.cache = dir.path().join("cache.csv");
        config.paths.hopeless_cache = dir.path().join("hopeless_cache.csv");
        config.paths.summary = dir.path().join("summary.csv");
        config.paths.reference_list = dir.path().join("reference_list.csv");
        config.paths.directory = dir.path().join("fias.db");
        config.paths.registry = dir.path().join("registry.csv");
        config.session.seed = Some(42);

        Self {
            dir,
            config,
            directory: MemoryDirectory::new(),
        }
    }

    /// Add `count` addresses for `postcode`, with ids `<postcode>-<n>`.
    pub fn with_postcode(self, postcode: &str, count: usize) -> Self {
        for record in self.addresses(postcode, count) {
            self.directory.insert(record);
        }
        self
    }

    /// The records [`TestFixture::with_postcode`] adds for `postcode`.
    pub fn addresses(&self, postcode: &str, count: usize) -> Vec<AddressRecord> {
        (0..count)
            .map(|n| address(&format!("{postcode}-{n}"), postcode))
            .collect()
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.session.batch_size = batch_size;
        self
    }

    /// Path of `name` inside the scratch directory.
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write the secondary registry, one postcode per line, with a header.
    pub fn write_registry(&self, postcodes: &[&str]) {
        let mut text = String::from("pc6\n");
        for postcode in postcodes {
            text.push_str(postcode);
            text.push('\n');
        }
        std::fs::write(&self.config.paths.registry, text)
            .unwrap_or_else(|e| panic!("writing registry: {e}"));
    }

    /// Current contents of the primary cache file.
    pub fn primary_cache(&self) -> PrimaryCache {
        PrimaryCache::load(&self.config.paths.cache)
            .unwrap_or_else(|e| panic!("loading primary cache: {e}"))
    }

    /// Current contents of the hopeless cache file.
    pub fn hopeless_cache(&self) -> HopelessCache {
        HopelessCache::load(&self.config.paths.hopeless_cache)
            .unwrap_or_else(|e| panic!("loading hopeless cache: {e}"))
    }

    /// Raw text of a file in the scratch directory, empty if absent.
    pub fn read(&self, path: &std::path::Path) -> String {
        std::fs::read_to_string(path).unwrap_or_default()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
