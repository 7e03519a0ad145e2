//! Benchmark engine for indexbench
//!
//! Drives the indexing workload against any `StoreBackend`:
//! - RecordPopulator: builds and loads the primary population
//! - KeySampler: uniform, optionally seeded key selection
//! - CollisionValidator: fatal check on distinct values sharing a hash
//! - Trial: setup → populate → measure → teardown state machine
//! - MemorySnapshot: process memory observed at teardown

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod driver;
pub mod populator;
pub mod sampler;
pub mod stats;
pub mod validator;

pub use driver::{run_trial, MeasurementReport, Trial, TrialState, TrialSummary};
pub use populator::{PopulationReport, RecordPopulator};
pub use sampler::{KeySampler, SAMPLER_ALGORITHM};
pub use stats::MemorySnapshot;
pub use validator::{CollisionValidator, ValidationCounts};
