//! Bounded random sampling of unverified addresses.
//!
//! Addresses already attempted are dropped first, then the sampler shuffles
//! what is left and caps it. Shuffling keeps every session from hammering the
//! same low-numbered addresses of a postcode.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CoreError;
use crate::types::{AddressId, AddressRecord};

/// Default cap on oracle calls per postcode per session.
pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Draws at most `batch_size` addresses in uniformly random order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSampler {
    batch_size: usize,
}

/// A sampled batch for one postcode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Addresses to attempt, in attempt order.
    pub records: Vec<AddressRecord>,
    /// How many unchecked addresses existed before the cap was applied.
    pub unchecked: usize,
}

impl Batch {
    /// True when every address of the postcode has been attempted in this
    /// or an earlier session.
    pub fn is_fully_attempted(&self) -> bool {
        self.unchecked == 0
    }

    /// Addresses left for future sessions after this batch.
    pub fn deferred(&self) -> usize {
        self.unchecked - self.records.len()
    }
}

impl BatchSampler {
    pub fn new(batch_size: usize) -> Result<Self, CoreError> {
        if batch_size == 0 {
            return Err(CoreError::ZeroBatchSize);
        }
        Ok(Self { batch_size })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Drop every address `is_checked` accepts, then [`sample`](Self::sample)
    /// the rest. No returned address is one `is_checked` accepts.
    pub fn sample_unchecked<R: Rng + ?Sized>(
        &self,
        full: Vec<AddressRecord>,
        is_checked: impl Fn(&AddressId) -> bool,
        rng: &mut R,
    ) -> Batch {
        let unchecked = full.into_iter().filter(|a| !is_checked(&a.id)).collect();
        self.sample(unchecked, rng)
    }

    /// Shuffle `unchecked` and keep the first `batch_size` entries.
    pub fn sample<R: Rng + ?Sized>(&self, mut unchecked: Vec<AddressRecord>, rng: &mut R) -> Batch {
        let total = unchecked.len();
        unchecked.shuffle(rng);
        unchecked.truncate(self.batch_size);
        Batch {
            records: unchecked,
            unchecked: total,
        }
    }
}

impl Default for BatchSampler {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}
