//! indexbench - secondary-index build throughput across storage backends
//!
//! A trial loads N (key, UUID) records into a backend's primary store, then
//! repeatedly draws a random key, hashes its value and indexes it into the
//! backend's secondary index. Three backends plug in behind one trait:
//! a concurrent in-memory map, an off-heap fixed-capacity map and an
//! append-only log.
//!
//! # Quick Start
//!
//! ```ignore
//! use indexbench::{BenchConfig, BackendKind, Trial};
//!
//! let config = BenchConfig::new()
//!     .with_sample_size(100_000)
//!     .with_backend(BackendKind::Persistent);
//!
//! let mut trial = Trial::setup(config)?;
//! trial.populate()?;
//! let report = trial.run_workload()?;
//! let summary = trial.tear_down()?;
//! ```
//!
//! # Architecture
//!
//! - `indexbench-core`: config, errors, the `StoreBackend` trait, hashing
//! - `indexbench-storage`: the three backends
//! - `indexbench-engine`: populator, validator and trial driver

pub use indexbench_core::*;
pub use indexbench_engine::*;
pub use indexbench_storage::{
    open_backend, open_kind, read_log, AppendLogBackend, ConcurrentMapBackend, OffHeapTable,
    PersistentMapBackend, TableHeader,
};
