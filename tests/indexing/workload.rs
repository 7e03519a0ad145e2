//! Workload Tests
//!
//! Full trials: populate N records, run loops × N indexing operations,
//! tear down. Checks index sizes and operation accounting.

use crate::common::*;
use indexbench::run_trial;
use std::sync::atomic::Ordering;

#[test]
fn single_thread_single_loop_bounds_index_size() {
    for kind in BackendKind::ALL {
        let summary = run_trial(small_config(kind, 1000)).unwrap();
        assert_eq!(summary.operations, 1000, "{}", kind);
        assert!(summary.final_index_size <= 1000, "{}", kind);
        assert!(summary.release_error.is_none(), "{}", kind);
    }
}

#[test]
fn validated_backends_index_size_equals_inserted() {
    for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
        let summary = run_trial(small_config(kind, 1000)).unwrap();
        assert_eq!(summary.final_index_size as u64, summary.counts.inserted);
        assert_eq!(
            summary.counts.inserted + summary.counts.reindexed,
            summary.operations
        );
        assert_eq!(summary.existing_hits, Some(summary.counts.reindexed));
    }
}

#[test]
fn append_log_size_equals_operations() {
    let summary = run_trial(small_config(BackendKind::AppendLog, 500).with_loops(3)).unwrap();
    assert_eq!(summary.operations, 1500);
    assert_eq!(summary.final_index_size, 1500);
    assert_eq!(summary.counts.appended, 1500);
    assert_eq!(summary.existing_hits, None);
}

#[test]
fn repeated_loops_saturate_small_population() {
    // 10 keys drawn 400 times: every distinct value ends up indexed
    let summary = run_trial(small_config(BackendKind::Concurrent, 10).with_loops(40)).unwrap();
    assert_eq!(summary.operations, 400);
    assert_eq!(summary.final_index_size, 10);
    assert_eq!(summary.counts.reindexed, 390);
}

#[test]
fn one_hash_per_operation() {
    let config = small_config(BackendKind::Concurrent, 200);
    let hasher = CountingHasher::default();
    let mut trial = Trial::with_hasher(config, &hasher).unwrap();
    trial.populate().unwrap();
    trial.measure(321).unwrap();
    let summary = trial.tear_down().unwrap();
    assert_eq!(summary.operations, 321);
    assert_eq!(hasher.calls.load(Ordering::Relaxed), 321);
}

#[test]
fn invocations_accumulate_in_summary() {
    let mut trial = populated_trial(small_config(BackendKind::Persistent, 1000));
    for _ in 0..5 {
        let report = trial.measure(100).unwrap();
        assert_eq!(report.operations, 100);
    }
    let summary = trial.tear_down().unwrap();
    assert_eq!(summary.operations, 500);
    assert!(summary.population.is_some());
}

#[test]
fn multi_threaded_workload_on_every_backend() {
    for kind in BackendKind::ALL {
        let config = small_config(kind, 1000).with_threads(4).with_loops(2);
        let summary = run_trial(config).unwrap();
        assert_eq!(summary.operations, 2000, "{}", kind);
        assert!(summary.release_error.is_none(), "{}", kind);
        if kind != BackendKind::AppendLog {
            assert_eq!(summary.final_index_size as u64, summary.counts.inserted);
            assert!(summary.final_index_size <= 1000);
        }
    }
}

#[test]
fn teardown_empties_and_closes_backend() {
    for kind in BackendKind::ALL {
        let mut trial = populated_trial(small_config(kind, 100));
        trial.measure(100).unwrap();
        let backend = std::sync::Arc::clone(trial.backend());
        trial.tear_down().unwrap();
        assert_eq!(backend.size(), 0, "{}", kind);
        assert!(matches!(backend.lookup(0), Err(Error::Closed(k)) if k == kind));
    }
}
