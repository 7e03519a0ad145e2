//! Off-heap persistent map backend
//!
//! Primary store and secondary index are two fixed-capacity
//! [`OffHeapTable`]s declared for the full population. Transient by
//! default; with a persistence directory each table is backed by its own
//! file, deleted and recreated at setup:
//!
//! - `primary.idx`: dense key -> value
//! - `secondary.idx`: hash -> value

use indexbench_core::{BackendKind, IndexOutcome, Result, StoreBackend};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::offheap::OffHeapTable;

/// Backing file of the primary store
pub const PRIMARY_FILE_NAME: &str = "primary.idx";
/// Backing file of the secondary index
pub const SECONDARY_FILE_NAME: &str = "secondary.idx";

/// Two off-heap tables sized for the population
#[derive(Debug)]
pub struct PersistentMapBackend {
    primary: OffHeapTable,
    secondary: OffHeapTable,
}

impl PersistentMapBackend {
    /// Transient backend in anonymous mappings
    pub fn transient(capacity: usize, max_value_len: usize) -> Result<Self> {
        let primary = OffHeapTable::anonymous("primary", capacity, max_value_len)?;
        let secondary = OffHeapTable::anonymous("secondary", capacity, max_value_len)?;
        Self::opened(primary, secondary)
    }

    /// File-backed backend under `dir`
    pub fn persisted_to(dir: &Path, capacity: usize, max_value_len: usize) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let primary = OffHeapTable::create_file(
            "primary",
            &dir.join(PRIMARY_FILE_NAME),
            capacity,
            max_value_len,
        )?;
        let secondary = OffHeapTable::create_file(
            "secondary",
            &dir.join(SECONDARY_FILE_NAME),
            capacity,
            max_value_len,
        )?;
        Self::opened(primary, secondary)
    }

    fn opened(primary: OffHeapTable, secondary: OffHeapTable) -> Result<Self> {
        let layout = primary.layout();
        info!(
            target: "indexbench::storage",
            capacity = layout.capacity,
            segments = layout.segments,
            mapped_bytes = layout.file_len(),
            persisted = primary.path().is_some(),
            "Opened persistent map backend"
        );
        Ok(Self { primary, secondary })
    }

    /// The primary table
    pub fn primary(&self) -> &OffHeapTable {
        &self.primary
    }

    /// The secondary table
    pub fn secondary(&self) -> &OffHeapTable {
        &self.secondary
    }
}

impl StoreBackend for PersistentMapBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Persistent
    }

    fn load(&self, key: u64, value: &str) -> Result<()> {
        self.primary.put(key, value)
    }

    fn lookup(&self, key: u64) -> Result<Option<String>> {
        self.primary.get(key)
    }

    fn index_if_absent(&self, hash: u64, value: &str) -> Result<IndexOutcome> {
        Ok(match self.secondary.put_if_absent(hash, value)? {
            Some(previous) => IndexOutcome::Present(previous),
            None => IndexOutcome::Inserted,
        })
    }

    fn size(&self) -> usize {
        self.secondary.len()
    }

    fn primary_len(&self) -> usize {
        self.primary.len()
    }

    fn reset(&self) -> Result<()> {
        self.secondary.clear()
    }

    fn close(&self) -> Result<()> {
        // Both tables are released even if the first one fails to flush
        let secondary = self.secondary.close();
        let primary = self.primary.close();
        debug!(target: "indexbench::storage", "Closed persistent map backend");
        secondary.and(primary)
    }
}

impl Drop for PersistentMapBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "indexbench::storage", error = %e, "Failed to close persistent map backend");
        }
    }
}
