//! Shared test utilities for all integration test suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::atomic::{AtomicU64, Ordering};

pub use indexbench::{
    BackendKind, BenchConfig, Error, IndexOutcome, Indexer, RecordPopulator, Result, StoreBackend,
    Trial, TrialState, ValueHasher,
};
use tempfile::TempDir;

/// Seed used by every seeded suite
pub const TEST_SEED: u64 = 0x5EED_0000_1DE7_B3AC;

/// Small seeded configuration for `kind`
pub fn small_config(kind: BackendKind, sample_size: usize) -> BenchConfig {
    BenchConfig::for_testing()
        .with_backend(kind)
        .with_sample_size(sample_size)
        .with_seed(TEST_SEED)
}

/// Configuration writing backing files under a fresh temp dir.
///
/// The returned `TempDir` must outlive the trial.
pub fn persisted_config(kind: BackendKind, sample_size: usize) -> (BenchConfig, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = small_config(kind, sample_size).with_persist_dir(dir.path());
    (config, dir)
}

/// Open and populate a trial
pub fn populated_trial(config: BenchConfig) -> Trial {
    let mut trial = Trial::setup(config).unwrap();
    trial.populate().unwrap();
    trial
}

/// Hasher mapping every value to the same hash
#[derive(Debug, Clone, Copy)]
pub struct ConstantHasher(pub u64);

impl ValueHasher for ConstantHasher {
    fn hash(&self, _value: &str) -> u64 {
        self.0
    }
}

/// Hasher that counts its calls and delegates to the default indexer
#[derive(Debug, Default)]
pub struct CountingHasher {
    pub calls: AtomicU64,
    inner: Indexer,
}

impl ValueHasher for CountingHasher {
    fn hash(&self, value: &str) -> u64 {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.hash(value)
    }
}
