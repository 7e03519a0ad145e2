//! Property Tests
//!
//! Randomized checks of the trial invariants over small populations.

use crate::common::*;
use indexbench::run_trial;
use proptest::prelude::*;

fn kind_strategy() -> impl Strategy<Value = BackendKind> {
    prop_oneof![
        Just(BackendKind::Concurrent),
        Just(BackendKind::Persistent),
        Just(BackendKind::AppendLog),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_operations_equal_loops_times_population(
        kind in kind_strategy(),
        n in 1usize..300,
        loops in 1usize..4,
        threads in 1usize..4,
        seed in any::<u64>(),
    ) {
        let config = BenchConfig::for_testing()
            .with_backend(kind)
            .with_sample_size(n)
            .with_loops(loops)
            .with_threads(threads)
            .with_seed(seed);
        let summary = run_trial(config).unwrap();
        prop_assert_eq!(summary.operations, (n * loops) as u64);
        prop_assert_eq!(summary.counts.total(), summary.operations);
        if kind == BackendKind::AppendLog {
            prop_assert_eq!(summary.final_index_size as u64, summary.operations);
        } else {
            prop_assert!(summary.final_index_size <= n);
            prop_assert_eq!(summary.final_index_size as u64, summary.counts.inserted);
        }
    }

    #[test]
    fn prop_seeded_population_is_reproducible(n in 1usize..200, seed in any::<u64>()) {
        let config = BenchConfig::for_testing().with_sample_size(n).with_seed(seed);
        let a: Vec<_> = RecordPopulator::new(&config).records().collect();
        let b: Vec<_> = RecordPopulator::new(&config).records().collect();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_index_if_absent_returns_first_value(values in prop::collection::vec("[a-z]{1,16}", 1..20)) {
        for kind in [BackendKind::Concurrent, BackendKind::Persistent] {
            let backend = indexbench::open_backend(&small_config(kind, 32)).unwrap();
            let first = backend.index_if_absent(9, &values[0]).unwrap();
            prop_assert_eq!(first, IndexOutcome::Inserted);
            for v in &values[1..] {
                let outcome = backend.index_if_absent(9, v).unwrap();
                prop_assert_eq!(outcome.previous(), Some(values[0].as_str()));
            }
            prop_assert_eq!(backend.size(), 1);
        }
    }
}
