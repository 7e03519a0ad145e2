//! Benchmark driver
//!
//! A `Trial` runs the indexing workload against one backend:
//!
//! ```text
//! Uninitialized --populate--> Populated --measure--> Measuring --tear_down--> TornDown
//! ```
//!
//! Each measured operation draws a uniform key, looks up its value in the
//! primary store, hashes it and indexes it into the secondary index; the
//! outcome goes through a `CollisionValidator`. Work is split over
//! `config.threads` scoped workers sharing the backend. The first fatal
//! error stops every worker and is returned.
//!
//! Backend resources are released by `tear_down`, or by `Drop` if the
//! trial is abandoned on an error path.

use indexbench_core::{
    BackendKind, BenchConfig, Error, Indexer, Result, StoreBackend, ValueHasher,
};
use indexbench_storage::open_backend;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::populator::{PopulationReport, RecordPopulator};
use crate::sampler::{KeySampler, SAMPLER_ALGORITHM};
use crate::stats::{avg_nanos, per_second, MemorySnapshot};
use crate::validator::{CollisionValidator, ValidationCounts};

/// Workers re-check the abort flag every this many operations
const ABORT_CHECK_INTERVAL: usize = 256;

/// Lifecycle of a trial
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrialState {
    /// Backend open, primary store empty
    Uninitialized,
    /// Primary store loaded, secondary index empty
    Populated,
    /// At least one measured invocation has run
    Measuring,
    /// Resources released
    TornDown,
}

impl TrialState {
    /// Name used in errors and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialState::Uninitialized => "Uninitialized",
            TrialState::Populated => "Populated",
            TrialState::Measuring => "Measuring",
            TrialState::TornDown => "TornDown",
        }
    }
}

impl fmt::Display for TrialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one measured invocation
#[derive(Debug, Clone, Serialize)]
pub struct MeasurementReport {
    /// Backend measured
    pub backend: BackendKind,
    /// Operations executed
    pub operations: u64,
    /// Worker threads used
    pub threads: usize,
    /// Wall-clock time of the invocation
    pub elapsed: Duration,
    /// Operations per second
    pub ops_per_sec: f64,
    /// Mean nanoseconds per operation
    pub avg_nanos_per_op: f64,
    /// Outcome tally
    pub counts: ValidationCounts,
    /// Index calls that found an existing entry; `None` for backends that
    /// cannot report one
    pub existing_hits: Option<u64>,
}

/// Final report of a trial
#[derive(Debug, Clone, Serialize)]
pub struct TrialSummary {
    /// Backend measured
    pub backend: BackendKind,
    /// Population phase, if it ran
    pub population: Option<PopulationReport>,
    /// Operations across all invocations
    pub operations: u64,
    /// Time spent measuring across all invocations
    pub measured: Duration,
    /// Overall operations per second
    pub ops_per_sec: f64,
    /// Secondary index size before release
    pub final_index_size: usize,
    /// Outcome tally across all invocations
    pub counts: ValidationCounts,
    /// See [`MeasurementReport::existing_hits`]
    pub existing_hits: Option<u64>,
    /// Key sampling generator
    pub sampler: &'static str,
    /// Process memory after release
    pub memory: MemorySnapshot,
    /// Release failure logged during teardown, if any
    pub release_error: Option<String>,
}

/// One setup → measure → teardown cycle against a fixed backend
pub struct Trial<H: ValueHasher = Indexer> {
    config: BenchConfig,
    backend: Arc<dyn StoreBackend>,
    hasher: H,
    state: TrialState,
    samplers: Vec<KeySampler>,
    population: Option<PopulationReport>,
    counts: ValidationCounts,
    operations: u64,
    measured: Duration,
}

impl Trial<Indexer> {
    /// Open the configured backend with the default indexer
    pub fn setup(config: BenchConfig) -> Result<Self> {
        Self::with_hasher(config, Indexer::new())
    }
}

impl<H: ValueHasher> Trial<H> {
    /// Open the configured backend with a custom hasher
    pub fn with_hasher(config: BenchConfig, hasher: H) -> Result<Self> {
        let backend = open_backend(&config)?;
        Self::with_backend(config, backend, hasher)
    }

    /// Drive an already opened backend
    ///
    /// The configuration is validated first; a zero population or thread
    /// count is rejected with `Error::InvalidConfig`.
    pub fn with_backend(
        config: BenchConfig,
        backend: Arc<dyn StoreBackend>,
        hasher: H,
    ) -> Result<Self> {
        config.validate()?;
        let samplers = (0..config.threads)
            .map(|i| KeySampler::new(config.sample_size, config.seed, i as u64))
            .collect();
        info!(
            target: "indexbench::driver",
            backend = %backend.kind(),
            sample_size = config.sample_size,
            threads = config.threads,
            seed = ?config.seed,
            sampler = SAMPLER_ALGORITHM,
            "Trial set up"
        );
        Ok(Self {
            config,
            backend,
            hasher,
            state: TrialState::Uninitialized,
            samplers,
            population: None,
            counts: ValidationCounts::default(),
            operations: 0,
            measured: Duration::ZERO,
        })
    }

    /// Current lifecycle state
    pub fn state(&self) -> TrialState {
        self.state
    }

    /// Configuration of this trial
    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// The backend under test
    pub fn backend(&self) -> &Arc<dyn StoreBackend> {
        &self.backend
    }

    fn expect_state(&self, allowed: &[TrialState], expected: &'static str) -> Result<()> {
        if allowed.contains(&self.state) {
            return Ok(());
        }
        Err(Error::InvalidState {
            expected,
            actual: self.state.as_str(),
        })
    }

    /// Load the primary store
    pub fn populate(&mut self) -> Result<PopulationReport> {
        self.expect_state(&[TrialState::Uninitialized], "Uninitialized")?;
        let report = RecordPopulator::new(&self.config).populate(self.backend.as_ref())?;
        self.population = Some(report.clone());
        self.state = TrialState::Populated;
        Ok(report)
    }

    /// Run `operations` indexing operations
    pub fn measure(&mut self, operations: usize) -> Result<MeasurementReport> {
        self.expect_state(
            &[TrialState::Populated, TrialState::Measuring],
            "Populated or Measuring",
        )?;
        self.state = TrialState::Measuring;

        let backend = self.backend.as_ref();
        let hasher = &self.hasher;
        let threads = self.samplers.len();
        let abort = AtomicBool::new(false);

        let start = Instant::now();
        let results: Vec<Result<ValidationCounts>> = if threads == 1 {
            vec![run_worker(backend, hasher, &mut self.samplers[0], operations, &abort)]
        } else {
            let base = operations / threads;
            let extra = operations % threads;
            let abort = &abort;
            thread::scope(|scope| {
                let handles: Vec<_> = self
                    .samplers
                    .iter_mut()
                    .enumerate()
                    .map(|(i, sampler)| {
                        let ops = base + usize::from(i < extra);
                        scope.spawn(move || run_worker(backend, hasher, sampler, ops, abort))
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| match h.join() {
                        Ok(result) => result,
                        Err(panic) => std::panic::resume_unwind(panic),
                    })
                    .collect()
            })
        };
        let elapsed = start.elapsed();

        let mut counts = ValidationCounts::default();
        for result in results {
            counts.merge(&result?);
        }

        let ops = counts.total();
        self.counts.merge(&counts);
        self.operations += ops;
        self.measured += elapsed;

        let report = MeasurementReport {
            backend: backend.kind(),
            operations: ops,
            threads,
            elapsed,
            ops_per_sec: per_second(ops, elapsed),
            avg_nanos_per_op: avg_nanos(ops, elapsed),
            counts,
            existing_hits: counts.existing_hits(backend.validates_collisions()),
        };
        debug!(
            target: "indexbench::driver",
            backend = %report.backend,
            operations = report.operations,
            elapsed_us = elapsed.as_micros() as u64,
            "Measured invocation"
        );
        Ok(report)
    }

    /// Run the full workload: `loops × sample_size` operations
    pub fn run_workload(&mut self) -> Result<MeasurementReport> {
        let report = self.measure(self.config.total_operations())?;
        info!(
            target: "indexbench::driver",
            backend = %report.backend,
            operations = report.operations,
            elapsed_ms = report.elapsed.as_millis() as u64,
            ops_per_sec = report.ops_per_sec as u64,
            avg_ns = report.avg_nanos_per_op,
            "Indexing benchmark"
        );
        Ok(report)
    }

    /// Report the index size, release the backend and snapshot memory
    ///
    /// Release failures are logged and recorded in the summary; they do
    /// not replace the measured result.
    pub fn tear_down(&mut self) -> Result<TrialSummary> {
        if self.state == TrialState::TornDown {
            return Err(Error::InvalidState {
                expected: "not TornDown",
                actual: self.state.as_str(),
            });
        }
        let kind = self.backend.kind();
        let final_index_size = self.backend.size();
        info!(target: "indexbench::driver", backend = %kind, size = final_index_size, "Output size");

        let mut release_error = None;
        let reset = self.backend.reset();
        let close = self.backend.close();
        self.state = TrialState::TornDown;
        for result in [reset, close] {
            if let Err(e) = result {
                warn!(
                    target: "indexbench::driver",
                    backend = %kind,
                    error = %e,
                    "Resource release failure"
                );
                release_error.get_or_insert_with(|| e.to_string());
            }
        }

        let memory = MemorySnapshot::capture();
        info!(
            target: "indexbench::driver",
            rss_bytes = ?memory.rss_bytes,
            peak_rss_bytes = ?memory.peak_rss_bytes,
            "Memory usage"
        );

        Ok(TrialSummary {
            backend: kind,
            population: self.population.clone(),
            operations: self.operations,
            measured: self.measured,
            ops_per_sec: per_second(self.operations, self.measured),
            final_index_size,
            counts: self.counts,
            existing_hits: self.counts.existing_hits(self.backend.validates_collisions()),
            sampler: SAMPLER_ALGORITHM,
            memory,
            release_error,
        })
    }
}

impl<H: ValueHasher> Drop for Trial<H> {
    fn drop(&mut self) {
        if self.state != TrialState::TornDown {
            if let Err(e) = self.backend.close() {
                warn!(
                    target: "indexbench::driver",
                    backend = %self.backend.kind(),
                    error = %e,
                    "Failed to release backend of abandoned trial"
                );
            }
        }
    }
}

fn run_worker<H: ValueHasher>(
    backend: &dyn StoreBackend,
    hasher: &H,
    sampler: &mut KeySampler,
    operations: usize,
    abort: &AtomicBool,
) -> Result<ValidationCounts> {
    let result = index_loop(backend, hasher, sampler, operations, abort);
    if result.is_err() {
        abort.store(true, Ordering::Release);
    }
    result
}

fn index_loop<H: ValueHasher>(
    backend: &dyn StoreBackend,
    hasher: &H,
    sampler: &mut KeySampler,
    operations: usize,
    abort: &AtomicBool,
) -> Result<ValidationCounts> {
    let mut validator = CollisionValidator::new();
    for i in 0..operations {
        if i % ABORT_CHECK_INTERVAL == 0 && abort.load(Ordering::Acquire) {
            break;
        }
        let key = sampler.next_key();
        let value = backend.lookup(key)?.ok_or(Error::KeyNotFound(key))?;
        let hash = hasher.hash(&value);
        let outcome = backend.index_if_absent(hash, &value)?;
        validator.check(hash, &value, outcome)?;
    }
    Ok(validator.counts())
}

/// Run one complete trial: setup, populate, full workload, teardown
pub fn run_trial(config: BenchConfig) -> Result<TrialSummary> {
    let mut trial = Trial::setup(config)?;
    trial.populate()?;
    trial.run_workload()?;
    trial.tear_down()
}
