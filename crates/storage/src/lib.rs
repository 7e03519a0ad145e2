//! Storage backends for indexbench
//!
//! This crate implements the three interchangeable `StoreBackend`s:
//! - ConcurrentMapBackend: DashMap-based managed-memory maps
//! - PersistentMapBackend: fixed-capacity off-heap tables (memmap2),
//!   optionally file-backed
//! - AppendLogBackend: sequential append-only log, no read-back
//!
//! `open_backend` selects one from a `BenchConfig`. Any failure while
//! opening is reported as `Error::SetupFailure` and aborts the trial.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod append_log;
pub mod concurrent;
pub mod offheap;
pub mod persistent;

pub use append_log::{read_log, AppendLogBackend};
pub use concurrent::ConcurrentMapBackend;
pub use offheap::{OffHeapTable, TableHeader, TableLayout};
pub use persistent::PersistentMapBackend;

use indexbench_core::{BackendKind, BenchConfig, Error, Result, StoreBackend};
use std::sync::Arc;

/// Open the backend selected by `config.backend`, sized for `config.sample_size`.
pub fn open_backend(config: &BenchConfig) -> Result<Arc<dyn StoreBackend>> {
    open_kind(config.backend, config)
}

/// Open a specific backend kind with the sizing and persistence of `config`.
pub fn open_kind(kind: BackendKind, config: &BenchConfig) -> Result<Arc<dyn StoreBackend>> {
    config.validate()?;
    let capacity = config.sample_size;
    let opened: Result<Arc<dyn StoreBackend>> = match kind {
        BackendKind::Concurrent => Ok(Arc::new(ConcurrentMapBackend::with_capacity(capacity))),
        BackendKind::Persistent => match &config.persist_dir {
            Some(dir) => PersistentMapBackend::persisted_to(dir, capacity, config.max_value_len)
                .map(|b| Arc::new(b) as Arc<dyn StoreBackend>),
            None => PersistentMapBackend::transient(capacity, config.max_value_len)
                .map(|b| Arc::new(b) as Arc<dyn StoreBackend>),
        },
        BackendKind::AppendLog => AppendLogBackend::open(config.persist_dir.as_deref(), capacity)
            .map(|b| Arc::new(b) as Arc<dyn StoreBackend>),
    };
    opened.map_err(|e| match e {
        Error::SetupFailure { .. } => e,
        other => Error::setup(kind, other),
    })
}
