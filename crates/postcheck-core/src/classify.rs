//! Tri-state classification of postcodes.
//!
//! Rules, applied in order so later ones override earlier ones:
//!
//! 1. Every postcode starts as [`PostcodeStatus::Unconfirmed`].
//! 2. If the cache holds as many attempts for it as the directory holds
//!    addresses, and none of them matched, it is [`PostcodeStatus::Exhausted`].
//! 3. If any evidence confirms the postcode, it is
//!    [`PostcodeStatus::Confirmed`], whatever rule 2 said.
//!
//! Exhaustion compares counts only. If the directory population changes
//! between runs, a postcode may be reported exhausted although different
//! addresses were attempted.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::record::{HopelessRecord, HopelessStatus, VerificationRecord};
use crate::types::Postcode;

/// Final status of a postcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostcodeStatus {
    Confirmed,
    Exhausted,
    Unconfirmed,
}

impl PostcodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PostcodeStatus::Confirmed => "confirmed",
            PostcodeStatus::Exhausted => "exhausted",
            PostcodeStatus::Unconfirmed => "unconfirmed",
        }
    }
}

impl fmt::Display for PostcodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostcodeStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "confirmed" => Ok(PostcodeStatus::Confirmed),
            "exhausted" => Ok(PostcodeStatus::Exhausted),
            "unconfirmed" => Ok(PostcodeStatus::Unconfirmed),
            other => Err(CoreError::UnknownStatus(other.to_string())),
        }
    }
}

/// Report row for one postcode. Derived, never read back as state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostcodeSummary {
    pub postcode: Postcode,
    pub total_addresses: u64,
    pub verified_count: u64,
    pub status: PostcodeStatus,
}

/// Counts per status over a set of summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusTally {
    pub confirmed: usize,
    pub exhausted: usize,
    pub unconfirmed: usize,
}

impl StatusTally {
    pub fn total(&self) -> usize {
        self.confirmed + self.exhausted + self.unconfirmed
    }
}

impl<'a> FromIterator<&'a PostcodeSummary> for StatusTally {
    fn from_iter<I: IntoIterator<Item = &'a PostcodeSummary>>(iter: I) -> Self {
        let mut tally = StatusTally::default();
        for summary in iter {
            match summary.status {
                PostcodeStatus::Confirmed => tally.confirmed += 1,
                PostcodeStatus::Exhausted => tally.exhausted += 1,
                PostcodeStatus::Unconfirmed => tally.unconfirmed += 1,
            }
        }
        tally
    }
}

/// Accumulates cache evidence, then classifies postcodes against their
/// directory counts.
#[derive(Debug, Default)]
pub struct SummaryClassifier {
    /// Attempts per target postcode.
    attempted: HashMap<Postcode, u64>,
    /// Target postcodes with at least one matching attempt.
    matched: HashSet<Postcode>,
    /// Postcodes the oracle has attested, from any source.
    confirmed: HashSet<Postcode>,
}

impl SummaryClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a classifier from primary cache records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a VerificationRecord>) -> Self {
        let mut classifier = Self::new();
        for record in records {
            classifier.observe(record);
        }
        classifier
    }

    /// Account for one primary cache record.
    ///
    /// Any postcode the oracle returned counts as confirmed, not only the
    /// target of the attempt: the oracle has attested that it exists.
    pub fn observe(&mut self, record: &VerificationRecord) {
        *self
            .attempted
            .entry(record.target_postcode.clone())
            .or_insert(0) += 1;
        if record.is_match() {
            self.matched.insert(record.target_postcode.clone());
        }
        if let Some(observed) = record.observed.found() {
            self.confirmed.insert(observed.clone());
        }
    }

    /// Account for one reverse-verification record.
    pub fn observe_hopeless(&mut self, record: &HopelessRecord) {
        if record.status == HopelessStatus::Confirmed {
            self.confirmed.insert(record.target.clone());
        }
    }

    /// Number of cached attempts targeting `postcode`.
    pub fn attempted_count(&self, postcode: &Postcode) -> u64 {
        self.attempted.get(postcode).copied().unwrap_or(0)
    }

    pub fn is_confirmed(&self, postcode: &Postcode) -> bool {
        self.confirmed.contains(postcode)
    }

    /// Classify one postcode with `total_addresses` directory entries.
    pub fn classify(&self, postcode: &Postcode, total_addresses: u64) -> PostcodeSummary {
        let verified_count = self.attempted_count(postcode);

        let mut status = PostcodeStatus::Unconfirmed;
        if total_addresses > 0
            && verified_count == total_addresses
            && !self.matched.contains(postcode)
        {
            status = PostcodeStatus::Exhausted;
        }
        if self.is_confirmed(postcode) {
            status = PostcodeStatus::Confirmed;
        }

        PostcodeSummary {
            postcode: postcode.clone(),
            total_addresses,
            verified_count,
            status,
        }
    }

    /// Classify every postcode of a directory summary, preserving its order.
    pub fn classify_all<'a>(
        &self,
        counts: impl IntoIterator<Item = &'a (Postcode, u64)>,
    ) -> Vec<PostcodeSummary> {
        counts
            .into_iter()
            .map(|(postcode, total)| self.classify(postcode, *total))
            .collect()
    }
}
