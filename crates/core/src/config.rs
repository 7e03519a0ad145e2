//! Benchmark configuration
//!
//! All knobs of a trial live in one explicit `BenchConfig` that is passed
//! into the populator, the backend factory and the driver. There is no
//! process-wide mutable configuration.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::types::BackendKind;

/// Environment variable names read by [`BenchConfig::from_env`].
pub mod env {
    /// Population size N
    pub const SAMPLE_SIZE: &str = "INDEXBENCH_SAMPLE_SIZE";
    /// Passes over the population per workload
    pub const LOOPS: &str = "INDEXBENCH_LOOPS";
    /// Operations per measured invocation
    pub const OPS_PER_INVOCATION: &str = "INDEXBENCH_OPS_PER_INVOCATION";
    /// Worker threads sharing the backend
    pub const THREADS: &str = "INDEXBENCH_THREADS";
    /// Backend name
    pub const BACKEND: &str = "INDEXBENCH_BACKEND";
    /// Directory for backing files; unset means transient
    pub const PERSIST_DIR: &str = "INDEXBENCH_PERSIST_DIR";
    /// RNG seed for population and key sampling
    pub const SEED: &str = "INDEXBENCH_SEED";
    /// Declared maximum value width of the off-heap map
    pub const MAX_VALUE_LEN: &str = "INDEXBENCH_MAX_VALUE_LEN";
}

/// Trial configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchConfig {
    /// Number of primary records (default: 1,000,000)
    pub sample_size: usize,
    /// Passes over the population in a full workload (default: 20)
    pub loops: usize,
    /// Operations per measured invocation (default: 100)
    pub ops_per_invocation: usize,
    /// Worker threads sharing one backend (default: 1)
    pub threads: usize,
    /// Backend under test (default: concurrent)
    pub backend: BackendKind,
    /// Backing-file directory; `None` keeps every backend transient
    pub persist_dir: Option<PathBuf>,
    /// Seed for value generation and key sampling; `None` draws from entropy
    pub seed: Option<u64>,
    /// Maximum UTF-8 length of a value in the off-heap map (default: 64)
    pub max_value_len: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            sample_size: 1_000_000,
            loops: 20,
            ops_per_invocation: 100,
            threads: 1,
            backend: BackendKind::Concurrent,
            persist_dir: None,
            seed: None,
            max_value_len: 64,
        }
    }
}

impl BenchConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Small, seeded configuration for tests
    pub fn for_testing() -> Self {
        BenchConfig {
            sample_size: 1_000,
            loops: 1,
            ops_per_invocation: 100,
            seed: Some(0xDEAD_BEEF_CAFE_BABE),
            ..Default::default()
        }
    }

    /// Defaults overlaid with `INDEXBENCH_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Defaults overlaid with values from `lookup`
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(v) = parse_var(&lookup, env::SAMPLE_SIZE)? {
            config.sample_size = v;
        }
        if let Some(v) = parse_var(&lookup, env::LOOPS)? {
            config.loops = v;
        }
        if let Some(v) = parse_var(&lookup, env::OPS_PER_INVOCATION)? {
            config.ops_per_invocation = v;
        }
        if let Some(v) = parse_var(&lookup, env::THREADS)? {
            config.threads = v;
        }
        if let Some(v) = parse_var(&lookup, env::BACKEND)? {
            config.backend = v;
        }
        if let Some(dir) = lookup(env::PERSIST_DIR).filter(|s| !s.is_empty()) {
            config.persist_dir = Some(PathBuf::from(dir));
        }
        if let Some(v) = parse_var(&lookup, env::SEED)? {
            config.seed = Some(v);
        }
        if let Some(v) = parse_var(&lookup, env::MAX_VALUE_LEN)? {
            config.max_value_len = v;
        }
        config.validate()?;
        Ok(config)
    }

    /// Set population size (builder pattern)
    pub fn with_sample_size(mut self, n: usize) -> Self {
        self.sample_size = n;
        self
    }

    /// Set loop count (builder pattern)
    pub fn with_loops(mut self, loops: usize) -> Self {
        self.loops = loops;
        self
    }

    /// Set operations per measured invocation (builder pattern)
    pub fn with_ops_per_invocation(mut self, ops: usize) -> Self {
        self.ops_per_invocation = ops;
        self
    }

    /// Set worker thread count (builder pattern)
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set backend (builder pattern)
    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Enable file persistence under `dir` (builder pattern)
    pub fn with_persist_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.persist_dir = Some(dir.into());
        self
    }

    /// Set RNG seed (builder pattern)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Set declared maximum value width (builder pattern)
    pub fn with_max_value_len(mut self, len: usize) -> Self {
        self.max_value_len = len;
        self
    }

    /// Operations in a full workload: `loops × sample_size`
    pub fn total_operations(&self) -> usize {
        self.loops.saturating_mul(self.sample_size)
    }

    /// Whether backing files are written
    pub fn is_persistent(&self) -> bool {
        self.persist_dir.is_some()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            return Err(Error::InvalidConfig("sample_size must be > 0".into()));
        }
        if self.sample_size > u32::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "sample_size {} exceeds {}",
                self.sample_size,
                u32::MAX
            )));
        }
        if self.threads == 0 {
            return Err(Error::InvalidConfig("threads must be > 0".into()));
        }
        if self.ops_per_invocation == 0 {
            return Err(Error::InvalidConfig(
                "ops_per_invocation must be > 0".into(),
            ));
        }
        if self.max_value_len == 0 || self.max_value_len > u16::MAX as usize {
            return Err(Error::InvalidConfig(format!(
                "max_value_len must be in 1..={}",
                u16::MAX
            )));
        }
        Ok(())
    }
}

fn parse_var<F, T>(lookup: &F, name: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => {
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(None);
            }
            raw.parse::<T>()
                .map(Some)
                .map_err(|_| Error::InvalidConfig(format!("{}={:?} is malformed", name, raw)))
        }
    }
}
