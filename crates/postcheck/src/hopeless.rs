//! Reverse verification of postcodes the primary loop never confirmed.
//!
//! Some postcodes have no address the lookup service recognises (post office
//! boxes, large organisations, postcodes known only to a secondary registry).
//! For those the check runs the other way round: ask the secondary directory
//! for the post office address of the postcode, then resolve that address
//! and see whether the same postcode comes back.

use std::collections::HashSet;
use std::time::Duration;

use postcheck_core::{HopelessRecord, HopelessStatus, Outcome, Postcode};
use postcheck_oracle::{observe, LookupOracle, SecondaryDirectory};
use postcheck_store::{HopelessCache, PrimaryCache};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::shutdown::Shutdown;

/// Result of a reconciliation session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HopelessReport {
    /// Candidates supplied.
    pub candidates: usize,
    /// Candidates already in the hopeless cache.
    pub already_cached: usize,
    pub confirmed: usize,
    pub declined: usize,
    /// Round trips whose oracle step failed transiently.
    pub transient_errors: usize,
    /// Records dropped by the final prune.
    pub pruned: usize,
    pub cancelled: bool,
}

/// Postcodes that need reverse verification.
///
/// The registry postcodes and every target of the primary cache, in that
/// order, without duplicates, minus those the primary cache confirms.
pub fn candidates(registry: &[Postcode], primary: &PrimaryCache) -> Vec<Postcode> {
    let mut seen = HashSet::new();
    registry
        .iter()
        .chain(primary.iter().map(|record| &record.target_postcode))
        .filter(|postcode| !primary.is_confirmed(postcode))
        .filter(|postcode| seen.insert((*postcode).clone()))
        .cloned()
        .collect()
}

/// Runs the postcode -> address -> postcode round trip.
pub struct HopelessReconciler<'a, D: SecondaryDirectory + ?Sized, O: LookupOracle + ?Sized> {
    directory: &'a D,
    oracle: &'a O,
    request_delay: Duration,
}

impl<'a, D: SecondaryDirectory + ?Sized, O: LookupOracle + ?Sized> HopelessReconciler<'a, D, O> {
    pub fn new(directory: &'a D, oracle: &'a O) -> Self {
        Self {
            directory,
            oracle,
            request_delay: Duration::ZERO,
        }
    }

    /// Pause between consecutive round trips.
    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Reconcile every candidate missing from `cache`, then prune and save.
    pub async fn run(
        &self,
        candidates: Vec<Postcode>,
        cache: &mut HopelessCache,
        mut shutdown: Shutdown,
    ) -> Result<HopelessReport> {
        let mut report = HopelessReport {
            candidates: candidates.len(),
            ..HopelessReport::default()
        };
        let pending = cache.remove_matching(candidates, |postcode| postcode);
        report.already_cached = report.candidates - pending.len();
        info!(
            candidates = report.candidates,
            pending = pending.len(),
            "reverse verification started"
        );

        for (i, target) in pending.into_iter().enumerate() {
            let delay = if i > 0 { self.request_delay } else { Duration::ZERO };
            let record = tokio::select! {
                biased;
                _ = shutdown.triggered() => {
                    warn!(postcode = %target, "reverse verification cancelled");
                    report.cancelled = true;
                    break;
                }
                record = async {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    self.reconcile(&target).await
                } => record,
            };

            if record.is_transient() {
                report.transient_errors += 1;
            } else {
                match record.status {
                    HopelessStatus::Confirmed => report.confirmed += 1,
                    HopelessStatus::Declined => report.declined += 1,
                }
            }
            cache.insert(record);
        }

        report.pruned = cache.prune_errors();
        if let Err(e) = cache.save() {
            error!(error = %e, "hopeless cache could not be saved");
            return Err(e.into());
        }

        info!(
            confirmed = report.confirmed,
            declined = report.declined,
            transient = report.transient_errors,
            cancelled = report.cancelled,
            "reverse verification finished"
        );
        Ok(report)
    }

    /// One round trip for `target`.
    ///
    /// Any failure of the directory step is terminal: both legs are recorded
    /// as no data and the oracle is not called. Only a transient oracle
    /// failure in the second step leaves the record retryable.
    pub async fn reconcile(&self, target: &Postcode) -> HopelessRecord {
        let (address, response) = match self.directory.representative_address(target).await {
            Ok(address) => {
                let response = observe(self.oracle.resolve(&address).await);
                (Outcome::Found(address), response)
            }
            Err(e) => {
                debug!(postcode = %target, error = %e, "no representative address");
                (Outcome::NoData, Outcome::NoData)
            }
        };

        let record = HopelessRecord::round_trip(target.clone(), address, response);
        if record.is_transient() {
            warn!(postcode = %record.target, "transient failure during round trip");
        } else {
            debug!(
                postcode = %record.target,
                address = %record.address,
                response = %record.response,
                status = %record.status,
                "round trip"
            );
        }
        record
    }
}
