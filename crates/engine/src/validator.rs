//! Collision validation
//!
//! Every indexing outcome passes through a `CollisionValidator`. A previous
//! value equal to the incoming one is an idempotent re-index; a different
//! one means two distinct values share a 64-bit hash, which aborts the run.
//!
//! Appended outcomes carry no previous value, so nothing is compared for
//! them. Each worker owns its validator and the driver merges the counts.

use indexbench_core::{Error, IndexOutcome, Result};
use serde::Serialize;
use tracing::error;

/// Tally of indexing outcomes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationCounts {
    /// New entries inserted
    pub inserted: u64,
    /// Re-index of an identical value (slot already held it)
    pub reindexed: u64,
    /// Records appended without read-back
    pub appended: u64,
}

impl ValidationCounts {
    /// Total outcomes observed
    pub fn total(&self) -> u64 {
        self.inserted + self.reindexed + self.appended
    }

    /// Add another tally into this one
    pub fn merge(&mut self, other: &ValidationCounts) {
        self.inserted += other.inserted;
        self.reindexed += other.reindexed;
        self.appended += other.appended;
    }

    /// Index calls that found an existing entry, or `None` when the
    /// backend cannot report existing entries at all
    pub fn existing_hits(&self, validates: bool) -> Option<u64> {
        validates.then_some(self.reindexed)
    }
}

/// Compares previous and incoming values of every index call
#[derive(Debug, Default)]
pub struct CollisionValidator {
    counts: ValidationCounts,
}

impl CollisionValidator {
    /// Create a validator with zero counts
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate one outcome of indexing `incoming` under `hash`
    pub fn check(&mut self, hash: u64, incoming: &str, outcome: IndexOutcome) -> Result<()> {
        match outcome {
            IndexOutcome::Inserted => self.counts.inserted += 1,
            IndexOutcome::Appended { .. } => self.counts.appended += 1,
            IndexOutcome::Present(existing) => {
                if existing.as_bytes() != incoming.as_bytes() {
                    error!(
                        target: "indexbench::validator",
                        hash,
                        existing = %existing,
                        incoming,
                        "Hash collision"
                    );
                    return Err(Error::CollisionViolation {
                        hash,
                        existing,
                        incoming: incoming.to_owned(),
                    });
                }
                self.counts.reindexed += 1;
            }
        }
        Ok(())
    }

    /// Counts so far
    pub fn counts(&self) -> ValidationCounts {
        self.counts
    }
}
