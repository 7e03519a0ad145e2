//! Collision Validation Tests
//!
//! A forced hash collision must abort the trial on validating backends,
//! naming both values. The append log never returns a previous value, so
//! the same collision goes unnoticed there.

use crate::common::*;

const FORCED_HASH: u64 = 0xC011_1DED;

#[test]
fn forced_collision_aborts_validating_backends() {
    for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
        let config = small_config(kind, 100);
        let mut trial = Trial::with_hasher(config.clone(), ConstantHasher(FORCED_HASH)).unwrap();
        trial.populate().unwrap();

        let (hash, existing, incoming) = match trial.measure(1000) {
            Err(Error::CollisionViolation {
                hash,
                existing,
                incoming,
            }) => (hash, existing, incoming),
            other => panic!("{}: expected collision, got {:?}", kind, other),
        };
        assert_eq!(hash, FORCED_HASH);
        assert_ne!(existing, incoming);

        let values: Vec<String> = RecordPopulator::new(&config)
            .records()
            .map(|r| r.value)
            .collect();
        assert!(values.contains(&existing), "{}", kind);
        assert!(values.contains(&incoming), "{}", kind);
    }
}

#[test]
fn collision_message_names_both_values() {
    let config = small_config(BackendKind::Concurrent, 50);
    let mut trial = Trial::with_hasher(config, ConstantHasher(7)).unwrap();
    trial.populate().unwrap();
    let err = trial.measure(500).unwrap_err();
    let message = err.to_string();
    if let Error::CollisionViolation {
        existing, incoming, ..
    } = &err
    {
        assert!(message.contains(existing.as_str()));
        assert!(message.contains(incoming.as_str()));
        assert!(message.contains("[7]"));
    } else {
        panic!("expected collision, got {:?}", err);
    }
}

#[test]
fn forced_collision_aborts_multi_threaded_trial() {
    let config = small_config(BackendKind::Concurrent, 200).with_threads(4);
    let mut trial = Trial::with_hasher(config, ConstantHasher(1)).unwrap();
    trial.populate().unwrap();
    assert!(matches!(
        trial.measure(10_000),
        Err(Error::CollisionViolation { hash: 1, .. })
    ));
    // Abandoned trial still releases its backend
    let backend = std::sync::Arc::clone(trial.backend());
    drop(trial);
    assert!(backend.lookup(0).is_err());
}

#[test]
fn append_log_never_reports_previous_value() {
    let config = small_config(BackendKind::AppendLog, 100);
    let mut trial = Trial::with_hasher(config, ConstantHasher(FORCED_HASH)).unwrap();
    trial.populate().unwrap();

    let report = trial.measure(1000).unwrap();
    assert_eq!(report.counts.appended, 1000);
    assert_eq!(report.counts.inserted, 0);
    assert_eq!(report.counts.reindexed, 0);
    assert_eq!(report.existing_hits, None);

    let backend = trial.backend();
    assert!(!backend.validates_collisions());
    for value in ["a", "a", "b"] {
        let outcome = backend.index_if_absent(FORCED_HASH, value).unwrap();
        assert_eq!(outcome.previous(), None);
    }
}

#[test]
fn same_value_reindexed_is_not_a_collision() {
    for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
        let mut trial = populated_trial(small_config(kind, 5));
        let report = trial.measure(500).unwrap();
        assert_eq!(report.counts.inserted, 5, "{}", kind);
        assert_eq!(report.counts.reindexed, 495, "{}", kind);
    }
}
