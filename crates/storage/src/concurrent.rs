//! Managed-memory concurrent map backend
//!
//! Both stores are `DashMap<u64, String>`, pre-sized to the population.
//!
//! # Design
//!
//! - DashMap: sharded, reads take a shard read lock only
//! - `index_if_absent` goes through the entry API, so the existence check
//!   and the insert happen under one shard write lock (no read-then-write
//!   window between racing indexers)

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use indexbench_core::{BackendKind, Error, IndexOutcome, Result, StoreBackend};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// DashMap-backed primary store and secondary index
#[derive(Debug)]
pub struct ConcurrentMapBackend {
    primary: DashMap<u64, String>,
    secondary: DashMap<u64, String>,
    closed: AtomicBool,
}

impl ConcurrentMapBackend {
    /// Create both maps with room for `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        debug!(target: "indexbench::storage", capacity, "Opening concurrent map backend");
        Self {
            primary: DashMap::with_capacity(capacity),
            secondary: DashMap::with_capacity(capacity),
            closed: AtomicBool::new(false),
        }
    }

    #[inline]
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed(BackendKind::Concurrent));
        }
        Ok(())
    }
}

impl StoreBackend for ConcurrentMapBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Concurrent
    }

    fn load(&self, key: u64, value: &str) -> Result<()> {
        self.ensure_open()?;
        self.primary.insert(key, value.to_owned());
        Ok(())
    }

    fn lookup(&self, key: u64) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self.primary.get(&key).map(|v| v.value().clone()))
    }

    fn index_if_absent(&self, hash: u64, value: &str) -> Result<IndexOutcome> {
        self.ensure_open()?;
        match self.secondary.entry(hash) {
            Entry::Occupied(existing) => Ok(IndexOutcome::Present(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(value.to_owned());
                Ok(IndexOutcome::Inserted)
            }
        }
    }

    fn size(&self) -> usize {
        self.secondary.len()
    }

    fn primary_len(&self) -> usize {
        self.primary.len()
    }

    fn reset(&self) -> Result<()> {
        self.ensure_open()?;
        self.secondary.clear();
        self.secondary.shrink_to_fit();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.secondary.clear();
        self.secondary.shrink_to_fit();
        self.primary.clear();
        self.primary.shrink_to_fit();
        debug!(target: "indexbench::storage", "Closed concurrent map backend");
        Ok(())
    }
}

impl Drop for ConcurrentMapBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "indexbench::storage", error = %e, "Failed to close concurrent map backend");
        }
    }
}
