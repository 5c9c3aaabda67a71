//! Property tests over randomly generated directories and oracle answers.

use std::collections::HashSet;

use postcheck::{Shutdown, VerificationEngine};
use postcheck_core::{BatchSampler, Postcode, PostcodeStatus, SummaryClassifier};
use postcheck_oracle::{LookupError, MemoryOracle};
use postcheck_store::{MemoryDirectory, PrimaryCache};
use postcheck_testkit::generators::{address_set, observation};
use proptest::prelude::*;

fn target() -> Postcode {
    Postcode::new("101000").unwrap()
}

fn to_answer(observation: postcheck_core::Observation) -> Result<Postcode, LookupError> {
    match observation {
        postcheck_core::Outcome::Found(postcode) => Ok(postcode),
        postcheck_core::Outcome::TransientError => Err(LookupError::Transient("flaky".into())),
        postcheck_core::Outcome::NoData => Err(LookupError::NoData),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_sessions_never_exceed_directory(
        addresses in address_set(target(), 30),
        answers in prop::collection::vec(observation(), 0..60),
        batch_size in 1usize..8,
        sessions in 1usize..5,
        seed in any::<u64>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let total = addresses.len() as u64;
        let ids: HashSet<_> = addresses.iter().map(|a| a.id.clone()).collect();
        let directory = MemoryDirectory::with_addresses(addresses);
        let mut cache = PrimaryCache::in_memory();
        let mut answers = answers.into_iter().map(to_answer);

        for session in 0..sessions {
            let before: HashSet<_> = cache.iter().map(|r| r.id.clone()).collect();
            let oracle = MemoryOracle::new().with_sequence(answers.by_ref().take(batch_size));

            let report = runtime
                .block_on(
                    VerificationEngine::new(&directory, &oracle)
                        .with_sampler(BatchSampler::new(batch_size).unwrap())
                        .with_seed(seed.wrapping_add(session as u64))
                        .run(&mut cache, Shutdown::never()),
                )
                .unwrap();

            // At most one batch per postcode
            prop_assert!(report.oracle_calls <= batch_size);
            let called: HashSet<_> = oracle.calls().into_iter().collect();
            prop_assert!(cache
                .iter()
                .filter(|r| !before.contains(&r.id))
                .all(|r| called.contains(&r.address)));

            // Transient outcomes never survive a session
            prop_assert!(cache.iter().all(|r| !r.observed.is_transient()));
        }

        // Keys unique and drawn from the directory
        let cached: HashSet<_> = cache.iter().map(|r| r.id.clone()).collect();
        prop_assert_eq!(cached.len(), cache.len());
        prop_assert!(cached.is_subset(&ids));

        let classifier = SummaryClassifier::from_records(cache.iter());
        let summary = classifier.classify(&target(), total);
        prop_assert!(summary.verified_count <= total);
        if cache.is_confirmed(&target()) {
            prop_assert_eq!(summary.status, PostcodeStatus::Confirmed);
        }
    }
}
