//! Append-only log backend
//!
//! Indexing a value writes one framed record to a sequential log and
//! advances the write cursor. The log is never read back during a trial,
//! so this backend cannot report a previous value and does not take part
//! in collision validation: `index_if_absent` always returns
//! `IndexOutcome::Appended` and `validates_collisions()` is false.
//!
//! The primary store is a dense in-memory vector indexed by key.
//!
//! ## Record Format
//!
//! ```text
//! [len u32 LE][crc32 u32 LE][value: len bytes UTF-8]
//! ```

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use indexbench_core::{BackendKind, Error, IndexOutcome, Result, StoreBackend};
use parking_lot::{Mutex, RwLock};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Log file name inside the log directory
pub const LOG_FILE_NAME: &str = "append.log";
/// Bytes of framing before each value
pub const RECORD_HEADER_SIZE: u64 = 8;

struct LogWriter {
    writer: BufWriter<File>,
    cursor: u64,
}

/// Sequential log as secondary "index", dense vector as primary store
pub struct AppendLogBackend {
    primary: RwLock<Vec<Option<String>>>,
    primary_len: AtomicUsize,
    log: Mutex<Option<LogWriter>>,
    records: AtomicUsize,
    path: PathBuf,
    /// Transient log directory, removed at close
    transient: Mutex<Option<TempDir>>,
    closed: AtomicBool,
}

impl AppendLogBackend {
    /// Open a log under `dir`, or under a fresh temporary directory when
    /// `dir` is `None` (removed again at close).
    ///
    /// An existing log file is truncated.
    pub fn open(dir: Option<&Path>, capacity: usize) -> Result<Self> {
        // A transient directory is owned by `temp` from here on, so it is
        // removed even if opening the log below fails
        let (temp, log_dir) = match dir {
            Some(d) => {
                fs::create_dir_all(d)?;
                (None, d.to_path_buf())
            }
            None => {
                let temp = tempfile::Builder::new().prefix("indexbench-").tempdir()?;
                let log_dir = temp.path().to_path_buf();
                (Some(temp), log_dir)
            }
        };
        let path = log_dir.join(LOG_FILE_NAME);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)?;

        info!(
            target: "indexbench::storage",
            path = ?path,
            transient = temp.is_some(),
            capacity,
            "Opened append log backend"
        );

        Ok(Self {
            primary: RwLock::new(vec![None; capacity]),
            primary_len: AtomicUsize::new(0),
            log: Mutex::new(Some(LogWriter {
                writer: BufWriter::new(file),
                cursor: 0,
            })),
            records: AtomicUsize::new(0),
            path,
            transient: Mutex::new(temp),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the log file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far (the write cursor)
    pub fn cursor(&self) -> u64 {
        self.log.lock().as_ref().map(|l| l.cursor).unwrap_or(0)
    }

    /// Flush buffered records to the OS
    pub fn flush(&self) -> Result<()> {
        if let Some(log) = self.log.lock().as_mut() {
            log.writer.flush()?;
        }
        Ok(())
    }

    #[inline]
    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed(BackendKind::AppendLog));
        }
        Ok(())
    }

    fn release_error(&self, resource: &Path, e: impl ToString) -> Error {
        Error::ResourceRelease {
            resource: resource.display().to_string(),
            reason: e.to_string(),
        }
    }
}

impl StoreBackend for AppendLogBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::AppendLog
    }

    fn load(&self, key: u64, value: &str) -> Result<()> {
        self.ensure_open()?;
        let mut primary = self.primary.write();
        let capacity = primary.len();
        let slot = primary
            .get_mut(key as usize)
            .ok_or(Error::CapacityExceeded { capacity })?;
        if slot.replace(value.to_owned()).is_none() {
            self.primary_len.fetch_add(1, Ordering::AcqRel);
        }
        Ok(())
    }

    fn lookup(&self, key: u64) -> Result<Option<String>> {
        self.ensure_open()?;
        Ok(self
            .primary
            .read()
            .get(key as usize)
            .and_then(|v| v.clone()))
    }

    fn index_if_absent(&self, _hash: u64, value: &str) -> Result<IndexOutcome> {
        let mut guard = self.log.lock();
        let log = guard
            .as_mut()
            .ok_or(Error::Closed(BackendKind::AppendLog))?;

        let bytes = value.as_bytes();
        let offset = log.cursor;
        log.writer.write_u32::<LittleEndian>(bytes.len() as u32)?;
        log.writer.write_u32::<LittleEndian>(crc32fast::hash(bytes))?;
        log.writer.write_all(bytes)?;
        log.cursor += RECORD_HEADER_SIZE + bytes.len() as u64;
        self.records.fetch_add(1, Ordering::AcqRel);

        Ok(IndexOutcome::Appended { offset })
    }

    fn size(&self) -> usize {
        self.records.load(Ordering::Acquire)
    }

    fn primary_len(&self) -> usize {
        self.primary_len.load(Ordering::Acquire)
    }

    fn validates_collisions(&self) -> bool {
        false
    }

    fn reset(&self) -> Result<()> {
        let mut guard = self.log.lock();
        let log = guard
            .as_mut()
            .ok_or(Error::Closed(BackendKind::AppendLog))?;
        log.writer.flush()?;
        let file = log.writer.get_mut();
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        log.cursor = 0;
        self.records.store(0, Ordering::Release);
        debug!(target: "indexbench::storage", path = ?self.path, "Truncated append log");
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let mut first_error = None;
        if let Some(mut log) = self.log.lock().take() {
            if let Err(e) = log.writer.flush() {
                first_error = Some(self.release_error(&self.path, e));
            }
        }
        {
            let mut primary = self.primary.write();
            primary.clear();
            primary.shrink_to_fit();
        }
        self.primary_len.store(0, Ordering::Release);

        if let Some(temp) = self.transient.lock().take() {
            let dir = temp.path().to_path_buf();
            if let Err(e) = temp.close() {
                first_error.get_or_insert_with(|| self.release_error(&dir, e));
            }
        }
        debug!(target: "indexbench::storage", path = ?self.path, "Closed append log backend");

        match first_error {
            None => Ok(()),
            Some(e) => Err(e),
        }
    }
}

impl Drop for AppendLogBackend {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(target: "indexbench::storage", error = %e, "Failed to close append log backend");
        }
    }
}

/// Read every record of a log file, verifying checksums.
///
/// A truncated trailing record ends the scan; a checksum mismatch is an error.
pub fn read_log(path: &Path) -> Result<Vec<String>> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut values = Vec::new();
    loop {
        let len = match reader.read_u32::<LittleEndian>() {
            Ok(len) => len as usize,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let crc = match reader.read_u32::<LittleEndian>() {
            Ok(crc) => crc,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        };
        let mut buf = vec![0u8; len];
        match reader.read_exact(&mut buf) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }
        if crc32fast::hash(&buf) != crc {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("checksum mismatch in record {}", values.len()),
            )
            .into());
        }
        let value = String::from_utf8(buf)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        values.push(value);
    }
    Ok(values)
}
