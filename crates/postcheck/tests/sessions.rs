//! End-to-end sessions against in-memory collaborators and real cache files.

use std::collections::HashSet;

use async_trait::async_trait;
use postcheck::{commands, shutdown, PostcheckConfig, Shutdown, ShutdownTrigger};
use postcheck_core::{HopelessStatus, Outcome, Postcode, PostcodeStatus};
use postcheck_oracle::{LookupError, LookupOracle, MemoryOracle, MemoryPostOffices};
use postcheck_testkit::{pc, TestFixture};

/// Oracle that requests shutdown once it has answered `after` calls.
struct InterruptingOracle {
    inner: MemoryOracle,
    after: usize,
    trigger: ShutdownTrigger,
}

#[async_trait]
impl LookupOracle for InterruptingOracle {
    async fn resolve(&self, address: &str) -> Result<Postcode, LookupError> {
        let answer = self.inner.resolve(address).await;
        if self.inner.call_count() >= self.after {
            self.trigger.trigger();
        }
        answer
    }
}

/// Oracle that answers `after` calls, then requests shutdown and never
/// answers again.
struct StallingOracle {
    inner: MemoryOracle,
    after: usize,
    trigger: ShutdownTrigger,
}

#[async_trait]
impl LookupOracle for StallingOracle {
    async fn resolve(&self, address: &str) -> Result<Postcode, LookupError> {
        if self.inner.call_count() >= self.after {
            self.trigger.trigger();
            std::future::pending::<()>().await;
        }
        self.inner.resolve(address).await
    }
}

fn summary_rows(config: &PostcheckConfig) -> Vec<String> {
    std::fs::read_to_string(&config.paths.summary)
        .unwrap()
        .lines()
        .skip(1)
        .map(String::from)
        .collect()
}

#[tokio::test]
async fn test_match_on_second_attempt_confirms() {
    let fixture = TestFixture::new().with_postcode("101000", 3);
    let oracle = MemoryOracle::new().with_sequence([Err(LookupError::NoData), Ok(pc("101000"))]);

    let report = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(report.matched, 1);
    assert_eq!(oracle.call_count(), 2);

    let cache = fixture.primary_cache();
    assert_eq!(cache.len(), 2);
    assert!(cache.is_confirmed(&pc("101000")));

    commands::summary_with(&fixture.config, &fixture.directory)
        .await
        .unwrap();
    assert_eq!(summary_rows(&fixture.config), ["101000;3;confirmed"]);
}

#[tokio::test]
async fn test_every_address_wrong_is_exhausted() {
    let fixture = TestFixture::new().with_postcode("999999", 2);
    let oracle = MemoryOracle::new().with_fallback(Ok(pc("000000")));

    let report = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(report.batch_exhausted, 1);
    assert_eq!(oracle.call_count(), 2);

    let tally = commands::summary_with(&fixture.config, &fixture.directory)
        .await
        .unwrap();
    assert_eq!(tally.exhausted, 1);
    assert_eq!(summary_rows(&fixture.config), ["999999;2;exhausted"]);
}

#[tokio::test]
async fn test_interrupted_session_resumes_with_remaining_addresses() {
    let fixture = TestFixture::new().with_postcode("555555", 10);
    let (trigger, shutdown) = shutdown::channel();
    let interrupting = InterruptingOracle {
        inner: MemoryOracle::new(),
        after: 4,
        trigger,
    };

    let first = commands::verify_with(&fixture.config, &fixture.directory, &interrupting, shutdown)
        .await
        .unwrap();

    assert!(first.cancelled);
    assert_eq!(first.oracle_calls, 4);
    assert_eq!(fixture.primary_cache().len(), 4);

    let resumed = MemoryOracle::new();
    let second = commands::verify_with(&fixture.config, &fixture.directory, &resumed, Shutdown::never())
        .await
        .unwrap();

    assert!(!second.cancelled);
    assert_eq!(second.batch_exhausted, 1);

    let first_calls: HashSet<_> = interrupting.inner.calls().into_iter().collect();
    let second_calls: HashSet<_> = resumed.calls().into_iter().collect();
    assert_eq!(first_calls.len(), 4);
    assert_eq!(second_calls.len(), 6);
    assert!(first_calls.is_disjoint(&second_calls));

    let all: HashSet<_> = fixture
        .addresses("555555", 10)
        .into_iter()
        .map(|a| a.address)
        .collect();
    assert_eq!(&first_calls | &second_calls, all);

    commands::summary_with(&fixture.config, &fixture.directory)
        .await
        .unwrap();
    assert_eq!(summary_rows(&fixture.config), ["555555;10;exhausted"]);
}

#[tokio::test]
async fn test_second_run_is_idempotent() {
    let fixture = TestFixture::new()
        .with_postcode("101000", 3)
        .with_postcode("999999", 2);
    let script = || {
        MemoryOracle::new()
            .with_fallback(Err(LookupError::NoData))
            .with_answer(fixture.addresses("101000", 3)[1].address.clone(), Ok(pc("101000")))
            .with_answer(fixture.addresses("999999", 2)[0].address.clone(), Ok(pc("000000")))
    };

    let first_oracle = script();
    commands::verify_with(&fixture.config, &fixture.directory, &first_oracle, Shutdown::never())
        .await
        .unwrap();
    let after_first = fixture.read(&fixture.config.paths.cache);
    assert!(first_oracle.call_count() >= 3);

    let second_oracle = script();
    let report = commands::verify_with(&fixture.config, &fixture.directory, &second_oracle, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(second_oracle.call_count(), 0);
    assert_eq!(report.skipped_confirmed, 1);
    assert_eq!(report.fully_attempted, 1);
    assert_eq!(fixture.read(&fixture.config.paths.cache), after_first);
}

#[tokio::test]
async fn test_saved_cache_has_no_transient_rows() {
    let fixture = TestFixture::new().with_postcode("200000", 4);
    let oracle = MemoryOracle::new()
        .with_fallback(Err(LookupError::NoData))
        .with_sequence([
            Err(LookupError::Transient("connection reset".into())),
            Err(LookupError::Transient("timeout".into())),
        ]);

    let report = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.transient_errors, 2);
    assert_eq!(report.pruned, 2);

    let text = fixture.read(&fixture.config.paths.cache);
    assert!(text.starts_with("target;guid;address;pc\n"));
    assert_eq!(text.lines().count(), 3);
    assert!(text.lines().all(|line| !line.ends_with(";error")));
    assert!(text.lines().skip(1).all(|line| line.ends_with(";n/a")));

    // The two failed addresses are retried and nothing else
    let retry = MemoryOracle::new();
    commands::verify_with(&fixture.config, &fixture.directory, &retry, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(retry.call_count(), 2);
    assert_eq!(fixture.primary_cache().len(), 4);
}

#[tokio::test]
async fn test_batch_size_spreads_work_over_sessions() {
    let fixture = TestFixture::new().with_postcode("300000", 5).with_batch_size(2);

    for expected in [2, 4, 5] {
        let oracle = MemoryOracle::new();
        commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
            .await
            .unwrap();
        assert_eq!(fixture.primary_cache().len(), expected);
    }

    let oracle = MemoryOracle::new();
    let report = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.fully_attempted, 1);
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_confirmation_by_another_target_wins_over_exhaustion() {
    let fixture = TestFixture::new()
        .with_postcode("400001", 1)
        .with_postcode("400002", 1);
    // 400001 is visited first and its only address misses, so every address
    // has been attempted; the address of 400002 then returns 400001.
    let oracle = MemoryOracle::new()
        .with_answer(fixture.addresses("400001", 1)[0].address.clone(), Ok(pc("999000")))
        .with_answer(fixture.addresses("400002", 1)[0].address.clone(), Ok(pc("400001")));

    let report = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.batch_exhausted, 2);
    assert_eq!(oracle.call_count(), 2);

    commands::summary_with(&fixture.config, &fixture.directory)
        .await
        .unwrap();
    assert_eq!(
        summary_rows(&fixture.config),
        ["400001;1;confirmed", "400002;1;exhausted"]
    );
}

#[tokio::test]
async fn test_hopeless_round_trip_and_reference_list() {
    let fixture = TestFixture::new()
        .with_postcode("101000", 2)
        .with_postcode("999999", 1);
    let oracle = MemoryOracle::new()
        .with_fallback(Ok(pc("000000")))
        .with_answer(fixture.addresses("101000", 2)[0].address.clone(), Ok(pc("101000")))
        .with_answer(fixture.addresses("101000", 2)[1].address.clone(), Ok(pc("101000")))
        .with_answer("office A", Ok(pc("630000")))
        .with_answer("office B", Ok(pc("999998")));
    commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never())
        .await
        .unwrap();

    fixture.write_registry(&["630000", "630001", "101000"]);
    let offices = MemoryPostOffices::new()
        .with_office(&pc("630000"), "office A")
        .with_office(&pc("999999"), "office B");

    let report = commands::hopeless_with(&fixture.config, &offices, &oracle, Shutdown::never())
        .await
        .unwrap();

    assert_eq!(report.candidates, 3);
    assert_eq!(report.confirmed, 1);
    assert_eq!(report.declined, 2);
    assert_eq!(offices.calls(), ["630000", "630001", "999999"]);
    assert_eq!(
        fixture.read(&fixture.config.paths.hopeless_cache),
        "target;address;response;status\n\
         630000;office A;630000;confirmed\n\
         630001;n/a;n/a;declined\n\
         999999;office B;999998;declined\n"
    );

    let hopeless = fixture.hopeless_cache();
    assert_eq!(hopeless.get(&pc("630001")).unwrap().address, Outcome::NoData);
    assert_eq!(hopeless.get(&pc("630000")).unwrap().status, HopelessStatus::Confirmed);

    // Already reconciled postcodes are not queried again
    let again = MemoryPostOffices::new();
    let rerun = commands::hopeless_with(&fixture.config, &again, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(rerun.already_cached, 3);
    assert!(again.calls().is_empty());

    let count = commands::compile(&fixture.config).unwrap();
    assert_eq!(count, 3);
    assert_eq!(
        fixture.read(&fixture.config.paths.reference_list),
        "pc6\n000000\n101000\n630000\n"
    );
}

#[tokio::test]
async fn test_directory_failure_is_terminal_across_runs() {
    let fixture = TestFixture::new();
    fixture.write_registry(&["630002"]);
    let offices = MemoryPostOffices::new()
        .with_failure(&pc("630002"), LookupError::Transient("timeout".into()));
    let oracle = MemoryOracle::new();

    let report = commands::hopeless_with(&fixture.config, &offices, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(report.declined, 1);
    assert_eq!(report.pruned, 0);
    assert_eq!(
        fixture.read(&fixture.config.paths.hopeless_cache),
        "target;address;response;status\n630002;n/a;n/a;declined\n"
    );

    let fresh = MemoryPostOffices::new();
    let rerun = commands::hopeless_with(&fixture.config, &fresh, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(rerun.already_cached, 1);
    assert!(fresh.calls().is_empty());
    assert_eq!(oracle.call_count(), 0);
}

#[tokio::test]
async fn test_interrupted_reverse_verification_keeps_completed_rows() {
    let fixture = TestFixture::new();
    fixture.write_registry(&["630000", "630001", "630002"]);
    let offices = MemoryPostOffices::new()
        .with_office(&pc("630000"), "office A")
        .with_office(&pc("630001"), "office B")
        .with_office(&pc("630002"), "office C");
    let (trigger, shutdown) = shutdown::channel();
    let stalling = StallingOracle {
        inner: MemoryOracle::new()
            .with_answer("office A", Ok(pc("630000")))
            .with_answer("office B", Ok(pc("630099"))),
        after: 2,
        trigger,
    };

    let report = commands::hopeless_with(&fixture.config, &offices, &stalling, shutdown)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.confirmed, 1);
    assert_eq!(report.declined, 1);
    assert_eq!(offices.calls(), ["630000", "630001", "630002"]);

    let hopeless = fixture.hopeless_cache();
    assert_eq!(hopeless.len(), 2);
    assert!(hopeless.contains(&pc("630000")));
    assert!(hopeless.contains(&pc("630001")));
    assert!(!hopeless.contains(&pc("630002")));

    // The dropped round trip is the only one left
    let oracle = MemoryOracle::new().with_answer("office C", Ok(pc("630002")));
    let resumed = commands::hopeless_with(&fixture.config, &offices, &oracle, Shutdown::never())
        .await
        .unwrap();
    assert_eq!(resumed.already_cached, 2);
    assert_eq!(resumed.confirmed, 1);
    assert_eq!(oracle.calls(), ["office C"]);
}

#[tokio::test]
async fn test_summary_without_any_session() {
    let fixture = TestFixture::new()
        .with_postcode("101000", 3)
        .with_postcode("999999", 2);

    let tally = commands::summary_with(&fixture.config, &fixture.directory)
        .await
        .unwrap();

    assert_eq!(tally.unconfirmed, 2);
    assert_eq!(
        summary_rows(&fixture.config),
        ["101000;3;unconfirmed", "999999;2;unconfirmed"]
    );
    assert_eq!(
        PostcodeStatus::Unconfirmed.as_str(),
        summary_rows(&fixture.config)[0].rsplit(';').next().unwrap()
    );
}

#[tokio::test]
async fn test_corrupt_cache_is_fatal() {
    let fixture = TestFixture::new().with_postcode("101000", 1);
    std::fs::write(&fixture.config.paths.cache, "target;guid;address;pc\n101000;;x;n/a\n").unwrap();

    let oracle = MemoryOracle::new();
    let result = commands::verify_with(&fixture.config, &fixture.directory, &oracle, Shutdown::never()).await;

    assert!(result.is_err());
    assert_eq!(oracle.call_count(), 0);
    // The corrupt file is left for inspection
    assert!(fixture.read(&fixture.config.paths.cache).contains("101000;;x;n/a"));
}
