//! Entry points behind the command-line subcommands.
//!
//! Each command comes in two flavours: a `*_with` function taking its
//! collaborators explicitly (used by tests), and a plain one that builds the
//! SQLite directory and HTTP clients from the configuration.

use postcheck_core::StatusTally;
use postcheck_oracle::{HttpOracle, HttpPostOffices, LookupOracle, SecondaryDirectory};
use postcheck_store::{
    read_postcode_list, AddressSource, HopelessCache, PrimaryCache, SqliteDirectory,
};
use tracing::{info, warn};

use crate::config::PostcheckConfig;
use crate::engine::{SessionReport, VerificationEngine};
use crate::error::Result;
use crate::hopeless::{self, HopelessReconciler, HopelessReport};
use crate::report;
use crate::shutdown::Shutdown;

/// Run one verification session against the primary cache.
pub async fn verify_with<S, O>(
    config: &PostcheckConfig,
    source: &S,
    oracle: &O,
    shutdown: Shutdown,
) -> Result<SessionReport>
where
    S: AddressSource + ?Sized,
    O: LookupOracle + ?Sized,
{
    let mut cache = PrimaryCache::load(&config.paths.cache)?;
    let mut engine = VerificationEngine::new(source, oracle)
        .with_sampler(config.session.sampler()?)
        .with_request_delay(config.session.request_delay());
    if let Some(seed) = config.session.seed {
        engine = engine.with_seed(seed);
    }
    engine.run(&mut cache, shutdown).await
}

pub async fn verify(config: &PostcheckConfig, shutdown: Shutdown) -> Result<SessionReport> {
    let directory = SqliteDirectory::open(&config.paths.directory)?;
    let oracle = HttpOracle::new(config.lookup.clone())?;
    verify_with(config, &directory, &oracle, shutdown).await
}

/// Reverse-verify every postcode the primary cache does not confirm.
///
/// A missing registry file leaves the primary cache targets as the only
/// candidates.
pub async fn hopeless_with<D, O>(
    config: &PostcheckConfig,
    directory: &D,
    oracle: &O,
    shutdown: Shutdown,
) -> Result<HopelessReport>
where
    D: SecondaryDirectory + ?Sized,
    O: LookupOracle + ?Sized,
{
    let registry = if config.paths.registry.exists() {
        read_postcode_list(&config.paths.registry)?
    } else {
        warn!(
            path = %config.paths.registry.display(),
            "registry not found, using primary cache targets only"
        );
        Vec::new()
    };

    let primary = PrimaryCache::load(&config.paths.cache)?;
    let candidates = hopeless::candidates(&registry, &primary);
    info!(
        registry = registry.len(),
        candidates = candidates.len(),
        "reverse verification candidates"
    );

    let mut cache = HopelessCache::load(&config.paths.hopeless_cache)?;
    HopelessReconciler::new(directory, oracle)
        .with_request_delay(config.session.request_delay())
        .run(candidates, &mut cache, shutdown)
        .await
}

pub async fn hopeless(config: &PostcheckConfig, shutdown: Shutdown) -> Result<HopelessReport> {
    let offices = HttpPostOffices::new(config.post_office.clone())?;
    let oracle = HttpOracle::new(config.lookup.clone())?;
    hopeless_with(config, &offices, &oracle, shutdown).await
}

/// Classify every postcode of the directory and write the summary table.
pub async fn summary_with<S>(config: &PostcheckConfig, source: &S) -> Result<StatusTally>
where
    S: AddressSource + ?Sized,
{
    let counts = source.count_by_postcode().await?;
    let primary = PrimaryCache::load(&config.paths.cache)?;
    let hopeless = HopelessCache::load(&config.paths.hopeless_cache)?;

    let summaries = report::summarize(&counts, &primary, Some(&hopeless));
    report::write_summary(&config.paths.summary, &summaries)
}

pub async fn summary(config: &PostcheckConfig) -> Result<StatusTally> {
    let directory = SqliteDirectory::open(&config.paths.directory)?;
    summary_with(config, &directory).await
}

/// Write the sorted list of every attested postcode. Returns its length.
pub fn compile(config: &PostcheckConfig) -> Result<usize> {
    let primary = PrimaryCache::load(&config.paths.cache)?;
    let hopeless = HopelessCache::load(&config.paths.hopeless_cache)?;

    let list = report::compile_reference_list(&primary, Some(&hopeless));
    report::write_reference_list(&config.paths.reference_list, &list)?;
    Ok(list.len())
}
