//! Error types for indexbench
//!
//! This module defines all error types used throughout the benchmark.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Every error except [`Error::ResourceRelease`] is fatal to the current
//! trial: measuring against an inconsistent store is meaningless, so nothing
//! in the core retries.

use crate::types::BackendKind;
use std::io;
use thiserror::Error;

/// Result type alias for indexbench operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the benchmark core
#[derive(Debug, Error)]
pub enum Error {
    /// Backend could not be allocated or opened
    #[error("Setup failed for {backend} backend: {reason}")]
    SetupFailure {
        /// Backend that failed to initialize
        backend: BackendKind,
        /// Underlying cause
        reason: String,
    },

    /// Two distinct values share a hash under a validating backend
    #[error("Hash collision: [{incoming}] vs. [{existing}] for hash [{hash}]")]
    CollisionViolation {
        /// The shared 64-bit hash
        hash: u64,
        /// Value already indexed under `hash`
        existing: String,
        /// Value that attempted to index under `hash`
        incoming: String,
    },

    /// Teardown could not release a resource
    #[error("Failed to release {resource}: {reason}")]
    ResourceRelease {
        /// Resource description (file path, table name)
        resource: String,
        /// Underlying cause
        reason: String,
    },

    /// Fixed-capacity store is full
    #[error("Capacity exceeded: store declared for {capacity} entries")]
    CapacityExceeded {
        /// Declared entry capacity
        capacity: usize,
    },

    /// Value does not fit the declared value width
    #[error("Value too large: {len} bytes (max {max})")]
    ValueTooLarge {
        /// Encoded length of the rejected value
        len: usize,
        /// Declared maximum
        max: usize,
    },

    /// Primary key missing from the primary store
    #[error("Key not found: {0}")]
    KeyNotFound(u64),

    /// Operation attempted after `close()`
    #[error("{0} backend is closed")]
    Closed(BackendKind),

    /// Trial lifecycle transition out of order
    #[error("Invalid state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the operation requires
        expected: &'static str,
        /// State the trial was in
        actual: &'static str,
    },

    /// Malformed configuration value
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// I/O error (file operations)
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
}

impl Error {
    /// Wrap any error raised while opening a backend as a setup failure.
    pub fn setup(backend: BackendKind, reason: impl ToString) -> Self {
        Error::SetupFailure {
            backend,
            reason: reason.to_string(),
        }
    }

    /// Whether this error aborts the current trial.
    ///
    /// Release failures are reported but never mask a measured result.
    pub fn is_fatal_to_trial(&self) -> bool {
        !matches!(self, Error::ResourceRelease { .. })
    }
}
