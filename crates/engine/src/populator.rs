//! Primary population
//!
//! Generates the N records of a trial (dense keys `0..N`, UUID v4 string
//! values) and loads them into a backend's primary store before any
//! measurement starts.

use indexbench_core::{BenchConfig, Error, Record, Result, StoreBackend};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::info;
use uuid::{Builder, Uuid};

use crate::stats::per_second;

/// Outcome of loading the primary store
#[derive(Debug, Clone, Serialize)]
pub struct PopulationReport {
    /// Records loaded
    pub records: usize,
    /// Time spent generating and loading
    pub elapsed: Duration,
    /// Records per second
    pub records_per_sec: f64,
}

/// Source of record values
enum ValueSource {
    Entropy,
    Seeded(StdRng),
}

impl ValueSource {
    fn next_value(&mut self) -> String {
        match self {
            ValueSource::Entropy => Uuid::new_v4().to_string(),
            ValueSource::Seeded(rng) => {
                let bytes: [u8; 16] = rng.gen();
                Builder::from_random_bytes(bytes).into_uuid().to_string()
            }
        }
    }
}

/// Iterator over the records of a population
pub struct Records {
    next_key: u64,
    end: u64,
    source: ValueSource,
}

impl Iterator for Records {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        if self.next_key >= self.end {
            return None;
        }
        let record = Record::new(self.next_key, self.source.next_value());
        self.next_key += 1;
        Some(record)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.end - self.next_key) as usize;
        (remaining, Some(remaining))
    }
}

/// Builds and loads the primary population
#[derive(Debug, Clone)]
pub struct RecordPopulator {
    sample_size: usize,
    seed: Option<u64>,
}

impl RecordPopulator {
    /// Populator for `config.sample_size` records
    pub fn new(config: &BenchConfig) -> Self {
        Self {
            sample_size: config.sample_size,
            seed: config.seed,
        }
    }

    /// Number of records produced
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// The records of this population, in key order
    ///
    /// Seeded populators yield the same values on every call.
    pub fn records(&self) -> Records {
        let source = match self.seed {
            Some(seed) => ValueSource::Seeded(StdRng::seed_from_u64(seed)),
            None => ValueSource::Entropy,
        };
        Records {
            next_key: 0,
            end: self.sample_size as u64,
            source,
        }
    }

    /// Generate and load every record into `backend`
    ///
    /// Any load failure is a setup failure of the backend.
    pub fn populate(&self, backend: &dyn StoreBackend) -> Result<PopulationReport> {
        info!(
            target: "indexbench::populate",
            backend = %backend.kind(),
            records = self.sample_size,
            "Initializing...."
        );
        let start = Instant::now();
        for record in self.records() {
            backend
                .load(record.key, &record.value)
                .map_err(|e| match e {
                    Error::SetupFailure { .. } => e,
                    other => Error::setup(backend.kind(), other),
                })?;
        }
        let elapsed = start.elapsed();
        let report = PopulationReport {
            records: self.sample_size,
            elapsed,
            records_per_sec: per_second(self.sample_size as u64, elapsed),
        };
        info!(
            target: "indexbench::populate",
            backend = %backend.kind(),
            records = report.records,
            elapsed_ms = elapsed.as_millis() as u64,
            records_per_sec = report.records_per_sec as u64,
            "UUIDs generated"
        );
        Ok(report)
    }

    /// Check that every record is retrievable with its exact value.
    ///
    /// Returns the number of records checked.
    pub fn verify<I>(backend: &dyn StoreBackend, records: I) -> Result<usize>
    where
        I: IntoIterator<Item = Record>,
    {
        let mut checked = 0;
        for record in records {
            match backend.lookup(record.key)? {
                Some(v) if v == record.value => checked += 1,
                Some(v) => {
                    return Err(Error::setup(
                        backend.kind(),
                        format!(
                            "key {} holds [{}], expected [{}]",
                            record.key, v, record.value
                        ),
                    ))
                }
                None => return Err(Error::KeyNotFound(record.key)),
            }
        }
        Ok(checked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexbench_storage::ConcurrentMapBackend;
    use std::collections::HashSet;

    fn populator(n: usize, seed: Option<u64>) -> RecordPopulator {
        let mut config = BenchConfig::for_testing().with_sample_size(n);
        config.seed = seed;
        RecordPopulator::new(&config)
    }

    #[test]
    fn test_records_dense_and_unique() {
        let records: Vec<Record> = populator(500, Some(1)).records().collect();
        assert_eq!(records.len(), 500);
        for (i, r) in records.iter().enumerate() {
            assert_eq!(r.key, i as u64);
            assert_eq!(r.value.len(), 36);
        }
        let unique: HashSet<&str> = records.iter().map(|r| r.value.as_str()).collect();
        assert_eq!(unique.len(), 500);
    }

    #[test]
    fn test_seeded_values_are_v4_uuids() {
        for record in populator(20, Some(5)).records() {
            let uuid = Uuid::parse_str(&record.value).unwrap();
            assert_eq!(uuid.get_version_num(), 4);
        }
    }

    #[test]
    fn test_seeded_population_reproducible() {
        let a: Vec<Record> = populator(50, Some(9)).records().collect();
        let b: Vec<Record> = populator(50, Some(9)).records().collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_unseeded_population_differs() {
        let a: Vec<Record> = populator(10, None).records().collect();
        let b: Vec<Record> = populator(10, None).records().collect();
        assert_ne!(a, b);
    }

    #[test]
    fn test_populate_then_verify() {
        let p = populator(1000, Some(3));
        let backend = ConcurrentMapBackend::with_capacity(1000);
        let report = p.populate(&backend).unwrap();
        assert_eq!(report.records, 1000);
        assert_eq!(backend.primary_len(), 1000);
        assert_eq!(RecordPopulator::verify(&backend, p.records()).unwrap(), 1000);
    }

    #[test]
    fn test_verify_detects_missing_key() {
        let p = populator(10, Some(3));
        let backend = ConcurrentMapBackend::with_capacity(10);
        assert!(matches!(
            RecordPopulator::verify(&backend, p.records()),
            Err(Error::KeyNotFound(0))
        ));
    }
}
