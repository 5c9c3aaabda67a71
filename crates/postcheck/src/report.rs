//! Derived tables: the per-postcode summary and the reference list.
//!
//! Both are computed from the caches on demand and written in full; neither
//! is ever read back as state.

use std::collections::BTreeSet;
use std::path::Path;

use postcheck_core::{HopelessStatus, Postcode, PostcodeSummary, StatusTally, SummaryClassifier};
use postcheck_store::{write_table, HopelessCache, PrimaryCache};
use serde::Serialize;
use tracing::info;

use crate::error::Result;

/// Column headers of the summary table.
pub const SUMMARY_HEADERS: &[&str] = &["postalcode", "cnt", "status"];

/// Column header of the reference list.
pub const REFERENCE_HEADERS: &[&str] = &["pc6"];

#[derive(Serialize)]
struct SummaryRow<'a> {
    postalcode: &'a str,
    cnt: u64,
    status: &'static str,
}

#[derive(Serialize)]
struct ReferenceRow<'a> {
    pc6: &'a str,
}

/// Classify every postcode of `counts` against the cached evidence.
pub fn summarize(
    counts: &[(Postcode, u64)],
    primary: &PrimaryCache,
    hopeless: Option<&HopelessCache>,
) -> Vec<PostcodeSummary> {
    let mut classifier = SummaryClassifier::from_records(primary.iter());
    if let Some(hopeless) = hopeless {
        for record in hopeless.iter() {
            classifier.observe_hopeless(record);
        }
    }
    classifier.classify_all(counts)
}

/// Write the summary table and log the totals per status.
pub fn write_summary(path: &Path, summaries: &[PostcodeSummary]) -> Result<StatusTally> {
    let rows = summaries.iter().map(|s| SummaryRow {
        postalcode: s.postcode.as_str(),
        cnt: s.total_addresses,
        status: s.status.as_str(),
    });
    write_table(path, SUMMARY_HEADERS, rows)?;

    let tally: StatusTally = summaries.iter().collect();
    info!(
        path = %path.display(),
        postcodes = tally.total(),
        confirmed = tally.confirmed,
        exhausted = tally.exhausted,
        unconfirmed = tally.unconfirmed,
        "summary written"
    );
    Ok(tally)
}

/// Every postcode the external authority has attested: each real postcode
/// observed in the primary cache plus each confirmed hopeless target.
/// Sorted and deduplicated.
pub fn compile_reference_list(
    primary: &PrimaryCache,
    hopeless: Option<&HopelessCache>,
) -> Vec<Postcode> {
    let observed = primary.iter().filter_map(|r| r.observed.found());
    let reversed = hopeless
        .into_iter()
        .flat_map(|cache| cache.iter())
        .filter(|r| r.status == HopelessStatus::Confirmed)
        .map(|r| &r.target);

    observed
        .chain(reversed)
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn write_reference_list(path: &Path, postcodes: &[Postcode]) -> Result<()> {
    let rows = postcodes.iter().map(|p| ReferenceRow { pc6: p.as_str() });
    write_table(path, REFERENCE_HEADERS, rows)?;
    info!(path = %path.display(), postcodes = postcodes.len(), "reference list written");
    Ok(())
}
