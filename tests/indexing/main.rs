//! Indexing Integration Tests
//!
//! End-to-end trials across all three backends:
//! - Trial lifecycle and workload accounting
//! - Collision validation (and its absence for the append log)
//! - Backend conformance: round-trip, idempotence, teardown
//! - Persisted mode: backing files under a caller directory

#[path = "../common/mod.rs"]
mod common;

mod backends;
mod collisions;
mod persistence;
mod properties;
mod workload;
