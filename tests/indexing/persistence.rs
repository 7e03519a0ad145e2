//! Persisted Mode Tests
//!
//! With a persistence directory the off-heap backend maps its tables onto
//! files and the append log writes into the directory instead of a
//! transient one.

use crate::common::*;
use indexbench::{read_log, AppendLogBackend, TableHeader};
use indexbench_storage::append_log::LOG_FILE_NAME;
use indexbench_storage::persistent::{PRIMARY_FILE_NAME, SECONDARY_FILE_NAME};
use std::sync::Arc;

#[test]
fn persistent_backend_creates_table_files() {
    let (config, dir) = persisted_config(BackendKind::Persistent, 1000);
    let summary = indexbench::run_trial(config).unwrap();
    assert!(summary.release_error.is_none());

    for name in [PRIMARY_FILE_NAME, SECONDARY_FILE_NAME] {
        let path = dir.path().join(name);
        assert!(path.exists(), "{} missing", name);
        let header = TableHeader::read(&path).unwrap();
        assert_eq!(header.capacity, 1000);
        assert_eq!(header.max_value_len, 64);
    }
}

#[test]
fn persisted_and_transient_trials_agree() {
    let transient = indexbench::run_trial(small_config(BackendKind::Persistent, 500)).unwrap();
    let (config, _dir) = persisted_config(BackendKind::Persistent, 500);
    let persisted = indexbench::run_trial(config).unwrap();
    assert_eq!(transient.final_index_size, persisted.final_index_size);
    assert_eq!(transient.counts, persisted.counts);
}

#[test]
fn setup_recreates_existing_files() {
    let (config, _dir) = persisted_config(BackendKind::Persistent, 200);
    for _ in 0..2 {
        let mut trial = populated_trial(config.clone());
        let report = trial.measure(200).unwrap();
        assert_eq!(report.counts.inserted as usize, trial.backend().size());
        trial.tear_down().unwrap();
    }
}

#[test]
fn append_log_writes_into_persist_dir() {
    let (config, dir) = persisted_config(BackendKind::AppendLog, 100);
    let log = Arc::new(AppendLogBackend::open(Some(dir.path()), config.sample_size).unwrap());
    let backend: Arc<dyn StoreBackend> = log.clone();
    let mut trial = Trial::with_backend(config.clone(), backend, Indexer::new()).unwrap();
    trial.populate().unwrap();
    trial.measure(250).unwrap();
    log.flush().unwrap();

    let path = dir.path().join(LOG_FILE_NAME);
    assert_eq!(log.path(), path.as_path());
    let values = read_log(&path).unwrap();
    assert_eq!(values.len(), 250);

    let population: Vec<String> = RecordPopulator::new(&config)
        .records()
        .map(|r| r.value)
        .collect();
    assert!(values.iter().all(|v| population.contains(v)));

    trial.tear_down().unwrap();
    assert!(dir.path().exists());
}

#[test]
fn transient_append_log_removes_its_directory() {
    let log = AppendLogBackend::open(None, 10).unwrap();
    let dir = log.path().parent().unwrap().to_path_buf();
    assert!(dir.exists());
    log.close().unwrap();
    assert!(!dir.exists());
}
