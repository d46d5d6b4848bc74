//! End-to-end change detection scenarios.

use cdcsync_codec::{checksum, Value};
use cdcsync_engine::{ChangeEvent, DetectOutcome, SyncError, SyncModule};
use cdcsync_storage::KeyValueStore;
use cdcsync_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[test]
fn debug_and_php_version_scenario() {
    let harness = ConstantsHarness::new(&["WP_DEBUG", "PHP_VERSION"]);
    harness.set("WP_DEBUG", true);
    harness.set("PHP_VERSION", "8.1");

    // First detection: both are new.
    assert_eq!(
        harness.detect(),
        DetectOutcome::Detected {
            emitted: 2,
            checked: 2
        }
    );
    assert_eq!(
        harness.take_changes(),
        vec![
            ChangeEvent::new("WP_DEBUG", Value::Bool(true)),
            ChangeEvent::new("PHP_VERSION", Value::from("8.1")),
        ]
    );
    let record = harness.module.checksums().unwrap();
    assert!(record.is_unchanged("WP_DEBUG", checksum(&Value::Bool(true))));
    assert!(record.is_unchanged("PHP_VERSION", checksum(&Value::from("8.1"))));

    // Immediately again: debounced.
    assert_eq!(harness.detect(), DetectOutcome::Skipped);
    assert!(harness.take_changes().is_empty());

    // After the window, values unchanged: detection runs, emits nothing.
    assert_eq!(
        harness.detect_after_wait(),
        DetectOutcome::Detected {
            emitted: 0,
            checked: 2
        }
    );
    assert!(harness.take_changes().is_empty());
}

#[test]
fn debounced_call_does_no_reads() {
    let harness = ConstantsHarness::new(&["A", "B", "C"]);
    harness.set("A", 1);

    harness.detect();
    let reads = harness.source.resolves();
    assert_eq!(reads, 3);

    for _ in 0..10 {
        assert_eq!(harness.detect(), DetectOutcome::Skipped);
    }
    assert_eq!(harness.source.resolves(), reads);

    harness.clock.advance(Duration::from_secs(1));
    assert_eq!(harness.detect(), DetectOutcome::Skipped);
    assert_eq!(harness.source.resolves(), reads);
}

#[test]
fn unchanged_values_stay_silent_across_runs() {
    let harness = ConstantsHarness::new(&["A", "B"]);
    harness.set("A", vec![1, 2, 3]);
    harness.set("B", Value::map([("x", Value::Float(0.5))]));
    harness.detect();
    assert_eq!(harness.take_changes().len(), 2);

    for _ in 0..3 {
        harness.detect_after_wait();
        assert!(harness.take_changes().is_empty());
    }
}

#[test]
fn only_changed_constants_are_emitted() {
    let harness = ConstantsHarness::new(&["A", "B", "C"]);
    harness.set("A", 1);
    harness.set("B", 2);
    harness.set("C", 3);
    harness.detect();
    harness.take_changes();

    harness.set("B", 20);
    harness.detect_after_wait();
    assert_eq!(harness.take_changes(), vec![ChangeEvent::new("B", Value::Int(20))]);
}

#[test]
fn null_to_value_emits_exactly_once() {
    let harness = ConstantsHarness::new(&["A"]);
    harness.detect();
    assert!(harness.take_changes().is_empty());

    harness.set("A", "x");
    harness.detect_after_wait();
    assert_eq!(harness.take_changes(), vec![ChangeEvent::new("A", Value::from("x"))]);

    harness.detect_after_wait();
    assert!(harness.take_changes().is_empty());
}

#[test]
fn value_to_null_and_back_is_silent() {
    let harness = ConstantsHarness::new(&["A"]);
    harness.set("A", "x");
    harness.detect();
    assert_eq!(harness.take_changes().len(), 1);

    harness.unset("A");
    harness.detect_after_wait();
    assert!(harness.take_changes().is_empty());

    harness.set("A", "x");
    harness.detect_after_wait();
    assert!(harness.take_changes().is_empty());
}

#[test]
fn value_to_null_to_different_value_emits() {
    let harness = ConstantsHarness::new(&["A"]);
    harness.set("A", "x");
    harness.detect();
    harness.take_changes();

    harness.unset("A");
    harness.detect_after_wait();

    harness.set("A", "y");
    harness.detect_after_wait();
    assert_eq!(harness.take_changes(), vec![ChangeEvent::new("A", Value::from("y"))]);
}

#[test]
fn reset_then_detect_treats_everything_as_new() {
    let harness = ConstantsHarness::new(&["A", "B", "C"]);
    harness.set("A", 1);
    harness.set("B", "b");
    harness.detect();
    harness.take_changes();

    harness.module.reset_data().unwrap();
    assert_eq!(
        harness.detect(),
        DetectOutcome::Detected {
            emitted: 2,
            checked: 3
        }
    );
    assert_eq!(
        harness.take_changes(),
        vec![
            ChangeEvent::new("A", Value::Int(1)),
            ChangeEvent::new("B", Value::from("b")),
        ]
    );
}

#[test]
fn empty_allowlist_is_done_without_store_writes() {
    let harness = ConstantsHarness::new(&[]);
    assert_eq!(harness.detect(), DetectOutcome::Empty);
    assert_eq!(
        harness.store.keys().unwrap(),
        vec![cdcsync_engine::CONSTANTS_AWAIT_KEY.to_string()]
    );
}

#[test]
fn store_outage_propagates() {
    let clock = Arc::new(cdcsync_storage::ManualClock::new(Duration::from_secs(10)));
    let flaky = Arc::new(FlakyStore::new(Arc::new(
        cdcsync_storage::InMemoryStore::with_clock(clock.clone()),
    )));
    let harness = ConstantsHarness::with_store(&["A"], flaky.clone(), clock);
    harness.set("A", 1);

    flaky.go_down();
    let err = harness.module.maybe_detect_changes().unwrap_err();
    assert!(matches!(err, SyncError::Storage(_)));
    assert!(err.is_retryable());
    assert!(harness.take_changes().is_empty());

    flaky.come_back();
    harness.detect();
    assert_eq!(harness.take_changes().len(), 1);
}

#[test]
fn stored_checksums_written_as_strings_still_match() {
    use cdcsync_codec::to_canonical_cbor;

    let harness = ConstantsHarness::new(&["A"]);
    harness.set("A", 7);
    let sum = checksum(&Value::Int(7));
    let foreign = Value::map([("A", Value::String(sum.to_string()))]);
    harness
        .store
        .set(cdcsync_engine::CONSTANTS_CHECKSUM_KEY, &to_canonical_cbor(&foreign))
        .unwrap();

    harness.detect();
    assert!(harness.take_changes().is_empty());
}
