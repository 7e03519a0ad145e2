//! Backend capability trait
//!
//! `StoreBackend` is the only contract the driver depends on. Each backend
//! bundles a trial's PrimaryStore (dense key -> value) and SecondaryIndex
//! (hash -> value) behind one object so the driver can share it across
//! worker threads as `Arc<dyn StoreBackend>`.
//!
//! # Concurrency
//!
//! - `lookup` must never block indefinitely
//! - `index_if_absent` must be atomic per hash: two threads racing to index
//!   the same hash must not both observe "absent"
//! - `load` is only called during setup, before any worker starts

use crate::error::Result;
use crate::types::{BackendKind, IndexOutcome};

/// Storage engine seam for the indexing workload.
pub trait StoreBackend: Send + Sync {
    /// Which variant this is
    fn kind(&self) -> BackendKind;

    /// Load one primary record (setup phase only)
    fn load(&self, key: u64, value: &str) -> Result<()>;

    /// Fetch a primary value by dense key
    fn lookup(&self, key: u64) -> Result<Option<String>>;

    /// Insert `value` under `hash` unless an entry already exists
    ///
    /// Returns `Present(previous)` when the slot was occupied. Backends
    /// without read-back return `Appended` and never a previous value.
    fn index_if_absent(&self, hash: u64, value: &str) -> Result<IndexOutcome>;

    /// Number of entries in the secondary index
    fn size(&self) -> usize;

    /// Number of records in the primary store
    fn primary_len(&self) -> usize;

    /// Whether `index_if_absent` can report a previous value at all
    fn validates_collisions(&self) -> bool {
        true
    }

    /// Clear the secondary index, releasing the memory it holds
    fn reset(&self) -> Result<()>;

    /// Release native, off-heap and file resources
    ///
    /// Idempotent. Operations after close fail with `Error::Closed`.
    fn close(&self) -> Result<()>;
}
