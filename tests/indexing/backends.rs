//! Backend Conformance Tests
//!
//! Every `StoreBackend` must:
//! - return every populated value byte-for-byte
//! - insert a hash at most once (validating backends)
//! - be safe to close twice, and fail cleanly afterwards

use crate::common::*;
use indexbench::open_backend;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn populated_records_round_trip() {
    for kind in BackendKind::ALL {
        let config = small_config(kind, 1000);
        let trial = populated_trial(config.clone());
        let populator = RecordPopulator::new(&config);
        let checked = RecordPopulator::verify(trial.backend().as_ref(), populator.records()).unwrap();
        assert_eq!(checked, 1000, "{}", kind);
        assert_eq!(trial.backend().primary_len(), 1000, "{}", kind);
    }
}

#[test]
fn verify_detects_foreign_population() {
    let trial = populated_trial(small_config(BackendKind::Concurrent, 20));
    let other = RecordPopulator::new(&small_config(BackendKind::Concurrent, 20).with_seed(1));
    let err = RecordPopulator::verify(trial.backend().as_ref(), other.records()).unwrap_err();
    assert!(matches!(err, Error::SetupFailure { .. }));
}

#[test]
fn lookup_beyond_population_is_absent() {
    for kind in BackendKind::ALL {
        let trial = populated_trial(small_config(kind, 10));
        assert_eq!(trial.backend().lookup(10).unwrap(), None, "{}", kind);
    }
}

#[test]
fn index_if_absent_is_idempotent() {
    for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
        let backend = open_backend(&small_config(kind, 16)).unwrap();
        assert_eq!(backend.index_if_absent(3, "x").unwrap(), IndexOutcome::Inserted);
        for _ in 0..5 {
            assert_eq!(
                backend.index_if_absent(3, "x").unwrap(),
                IndexOutcome::Present("x".to_string())
            );
        }
        assert_eq!(backend.size(), 1, "{}", kind);
        backend.close().unwrap();
    }
}

#[test]
fn first_writer_wins_under_contention() {
    for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
        let backend = open_backend(&small_config(kind, 64)).unwrap();
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let backend = Arc::clone(&backend);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    backend.index_if_absent(42, &format!("writer-{}", t)).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<IndexOutcome> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let inserted = outcomes
            .iter()
            .filter(|o| **o == IndexOutcome::Inserted)
            .count();
        assert_eq!(inserted, 1, "{}", kind);
        let winners: std::collections::HashSet<&str> =
            outcomes.iter().filter_map(|o| o.previous()).collect();
        assert_eq!(winners.len(), 1, "{}", kind);
        assert_eq!(backend.size(), 1);
    }
}

#[test]
fn close_is_idempotent() {
    for kind in BackendKind::ALL {
        let backend = open_backend(&small_config(kind, 8)).unwrap();
        backend.close().unwrap();
        backend.close().unwrap();
        assert!(matches!(backend.index_if_absent(1, "v"), Err(Error::Closed(k)) if k == kind));
    }
}

#[test]
fn reset_clears_index_but_keeps_population() {
    for kind in BackendKind::ALL {
        let mut trial = populated_trial(small_config(kind, 100));
        trial.measure(100).unwrap();
        assert!(trial.backend().size() > 0);
        trial.backend().reset().unwrap();
        assert_eq!(trial.backend().size(), 0, "{}", kind);
        assert_eq!(trial.backend().primary_len(), 100, "{}", kind);
    }
}

#[test]
fn persistent_capacity_is_exact() {
    let backend = open_backend(&small_config(BackendKind::Persistent, 4)).unwrap();
    for h in 0..4 {
        backend.index_if_absent(h, "v").unwrap();
    }
    assert!(matches!(
        backend.index_if_absent(99, "v"),
        Err(Error::CapacityExceeded { capacity: 4 })
    ));
}

#[test]
fn persistent_rejects_oversized_value() {
    let config = small_config(BackendKind::Persistent, 4).with_max_value_len(8);
    let backend = open_backend(&config).unwrap();
    assert!(matches!(
        backend.index_if_absent(1, "value-longer-than-eight"),
        Err(Error::ValueTooLarge { max: 8, .. })
    ));
}
