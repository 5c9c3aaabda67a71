//! The verification loop.
//!
//! For every postcode of the directory, in ascending order:
//!
//! ```text
//! pending ──(cache confirms)──────────────> skipped
//!    │
//!    ├──(no unchecked address)────────────> fully attempted
//!    │
//!    └─> in progress ──(observed == target)─> matched
//!            │
//!            ├──(batch used up)──────────> batch exhausted
//!            └──(shutdown)───────────────> cancelled, session stops
//! ```
//!
//! Every attempt is inserted into the cache the moment it completes, so an
//! interrupted session loses at most the call that was in flight.

use std::time::Duration;

use postcheck_core::{AddressRecord, BatchSampler, Postcode, VerificationRecord};
use postcheck_oracle::{observe, LookupOracle};
use postcheck_store::{AddressSource, PrimaryCache};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::shutdown::Shutdown;

// ────────────────────────────────────────────────────────────────────────────
// Attempt stream
// ────────────────────────────────────────────────────────────────────────────

/// Lazy sequence of oracle attempts over one sampled batch.
///
/// Nothing is called until [`AttemptStream::next`] is awaited, and each call
/// performs exactly one lookup. Dropping the stream (or an in-flight `next`)
/// stops the sequence; no further lookups happen.
pub struct AttemptStream<'a, O: LookupOracle + ?Sized> {
    oracle: &'a O,
    pending: std::vec::IntoIter<AddressRecord>,
    delay: Duration,
    started: bool,
}

impl<'a, O: LookupOracle + ?Sized> AttemptStream<'a, O> {
    pub fn new(oracle: &'a O, batch: Vec<AddressRecord>, delay: Duration) -> Self {
        Self {
            oracle,
            pending: batch.into_iter(),
            delay,
            started: false,
        }
    }

    /// Addresses not yet attempted.
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    /// Attempt the next address, or `None` once the batch is used up.
    pub async fn next(&mut self) -> Option<VerificationRecord> {
        let record = self.pending.next()?;
        if self.started && !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.started = true;

        let observed = observe(self.oracle.resolve(&record.address).await);
        debug!(
            postcode = %record.target_postcode,
            id = record.id.short(),
            observed = %observed,
            "attempt"
        );
        if observed.is_transient() {
            warn!(id = %record.id, address = %record.address, "transient lookup failure");
        }
        Some(VerificationRecord::attempt(&record, observed))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Reports
// ────────────────────────────────────────────────────────────────────────────

/// How one postcode ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostcodeOutcome {
    /// The cache already confirms it; no lookups.
    AlreadyConfirmed,
    /// Every address has been attempted in earlier sessions; no lookups.
    FullyAttempted,
    /// An attempt returned the target.
    Matched { calls: usize },
    /// The whole batch was attempted without a match.
    BatchExhausted { calls: usize, deferred: usize },
    /// Shutdown arrived while attempting.
    Cancelled { calls: usize },
}

/// Result of a verification session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Postcodes whose processing started.
    pub postcodes: usize,
    pub skipped_confirmed: usize,
    pub fully_attempted: usize,
    pub matched: usize,
    pub batch_exhausted: usize,
    /// Lookups that completed.
    pub oracle_calls: usize,
    /// Lookups that failed transiently (pruned before save).
    pub transient_errors: usize,
    /// Records dropped by the final prune.
    pub pruned: usize,
    pub cancelled: bool,
}

impl SessionReport {
    fn tally(&mut self, outcome: PostcodeOutcome) {
        self.postcodes += 1;
        match outcome {
            PostcodeOutcome::AlreadyConfirmed => self.skipped_confirmed += 1,
            PostcodeOutcome::FullyAttempted => self.fully_attempted += 1,
            PostcodeOutcome::Matched { .. } => self.matched += 1,
            PostcodeOutcome::BatchExhausted { .. } => self.batch_exhausted += 1,
            PostcodeOutcome::Cancelled { .. } => self.cancelled = true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Drives the sampled lookup loop over every postcode of an address source.
pub struct VerificationEngine<'a, S: AddressSource + ?Sized, O: LookupOracle + ?Sized> {
    source: &'a S,
    oracle: &'a O,
    sampler: BatchSampler,
    request_delay: Duration,
    rng: StdRng,
}

impl<'a, S: AddressSource + ?Sized, O: LookupOracle + ?Sized> VerificationEngine<'a, S, O> {
    pub fn new(source: &'a S, oracle: &'a O) -> Self {
        Self {
            source,
            oracle,
            sampler: BatchSampler::default(),
            request_delay: Duration::ZERO,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_sampler(mut self, sampler: BatchSampler) -> Self {
        self.sampler = sampler;
        self
    }

    /// Pause between consecutive lookups of one batch.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Make batch sampling reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Run one session over every postcode, then prune and save the cache.
    ///
    /// The prune and save happen however the session ends: completed,
    /// cancelled, or failed. A storage error from the session is returned
    /// after the cache has been saved.
    pub async fn run(
        &mut self,
        cache: &mut PrimaryCache,
        mut shutdown: Shutdown,
    ) -> Result<SessionReport> {
        info!(
            cached = cache.len(),
            batch_size = self.sampler.batch_size(),
            "verification session started"
        );

        let mut report = SessionReport::default();
        let visited = self.visit_all(cache, &mut shutdown, &mut report).await;

        report.pruned = cache.prune_errors();
        let saved = cache.save();

        match (visited, saved) {
            (Err(e), Err(save_error)) => {
                error!(error = %save_error, "cache could not be saved after a failed session");
                Err(e)
            }
            (Err(e), Ok(())) => Err(e),
            (Ok(()), Err(save_error)) => Err(save_error.into()),
            (Ok(()), Ok(())) => {
                info!(
                    postcodes = report.postcodes,
                    matched = report.matched,
                    exhausted = report.batch_exhausted,
                    skipped = report.skipped_confirmed + report.fully_attempted,
                    calls = report.oracle_calls,
                    transient = report.transient_errors,
                    cancelled = report.cancelled,
                    "verification session finished"
                );
                Ok(report)
            }
        }
    }

    async fn visit_all(
        &mut self,
        cache: &mut PrimaryCache,
        shutdown: &mut Shutdown,
        report: &mut SessionReport,
    ) -> Result<()> {
        let counts = self.source.count_by_postcode().await?;
        for (postcode, total) in counts {
            if shutdown.is_triggered() {
                report.cancelled = true;
                break;
            }
            let outcome = self
                .verify_postcode(&postcode, total, cache, shutdown, report)
                .await?;
            report.tally(outcome);
            if report.cancelled {
                break;
            }
        }
        Ok(())
    }

    /// Verify one postcode, inserting every attempt into `cache`.
    pub async fn verify_postcode(
        &mut self,
        postcode: &Postcode,
        total: u64,
        cache: &mut PrimaryCache,
        shutdown: &mut Shutdown,
        report: &mut SessionReport,
    ) -> Result<PostcodeOutcome> {
        if cache.is_confirmed(postcode) {
            debug!(postcode = %postcode, "already confirmed");
            return Ok(PostcodeOutcome::AlreadyConfirmed);
        }

        let addresses = self.source.addresses_for(postcode).await?;
        let batch = self
            .sampler
            .sample_unchecked(addresses, |id| cache.contains(id), &mut self.rng);
        if batch.is_fully_attempted() {
            debug!(postcode = %postcode, total, "every address already attempted");
            return Ok(PostcodeOutcome::FullyAttempted);
        }

        let deferred = batch.deferred();
        info!(
            postcode = %postcode,
            total,
            unchecked = batch.unchecked,
            batch = batch.records.len(),
            "verifying"
        );

        let mut attempts = AttemptStream::new(self.oracle, batch.records, self.request_delay);
        let mut calls = 0;
        loop {
            let attempt = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    warn!(
                        postcode = %postcode,
                        calls,
                        abandoned = attempts.remaining(),
                        "verification cancelled"
                    );
                    return Ok(PostcodeOutcome::Cancelled { calls });
                }
                attempt = attempts.next() => attempt,
            };

            let Some(record) = attempt else {
                info!(postcode = %postcode, calls, deferred, "batch exhausted without a match");
                return Ok(PostcodeOutcome::BatchExhausted { calls, deferred });
            };

            calls += 1;
            report.oracle_calls += 1;
            if record.observed.is_transient() {
                report.transient_errors += 1;
            }
            let matched = record.is_match();
            cache.insert(record);

            if matched {
                info!(postcode = %postcode, calls, "confirmed");
                return Ok(PostcodeOutcome::Matched { calls });
            }
        }
    }
}
