//! Core types and traits for indexbench
//!
//! This crate defines the foundational types shared by every layer:
//! - Record and BackendKind: the population and backend selection
//! - StoreBackend: the capability trait every storage engine implements
//! - IndexOutcome: result of an insert-if-absent
//! - Indexer: deterministic 64-bit value hashing
//! - BenchConfig: explicit trial configuration
//! - Error types

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod hash;
pub mod traits;
pub mod types;

pub use config::BenchConfig;
pub use error::{Error, Result};
pub use hash::{Indexer, ValueHasher, DEFAULT_HASH_SEED};
pub use traits::StoreBackend;
pub use types::{BackendKind, IndexOutcome, Record};
