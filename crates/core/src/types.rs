//! Core types for the indexing benchmark
//!
//! - `Record`: one (key, value) pair of the primary population
//! - `BackendKind`: which storage engine a trial runs against
//! - `IndexOutcome`: result of indexing a value into the secondary store

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A primary record: dense `u64` key and a textual 128-bit identifier.
///
/// Records are immutable once generated.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    /// Dense key in `0..N`
    pub key: u64,
    /// UUID string (36 ASCII bytes)
    pub value: String,
}

impl Record {
    /// Create a new record
    pub fn new(key: u64, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

/// Storage engine selected for a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    /// Lock-free managed-memory map
    Concurrent,
    /// Fixed-capacity off-heap map, optionally file-backed
    Persistent,
    /// Sequential append-only log
    AppendLog,
}

impl BackendKind {
    /// All backends, in report order.
    pub const ALL: [BackendKind; 3] = [
        BackendKind::Concurrent,
        BackendKind::Persistent,
        BackendKind::AppendLog,
    ];

    /// Stable lowercase name used in config, logs and bench ids.
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Concurrent => "concurrent",
            BackendKind::Persistent => "persistent",
            BackendKind::AppendLog => "append-log",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concurrent" | "nonblocking" | "dashmap" => Ok(BackendKind::Concurrent),
            "persistent" | "offheap" | "off-heap" => Ok(BackendKind::Persistent),
            "append-log" | "append_log" | "appendlog" | "log" => Ok(BackendKind::AppendLog),
            other => Err(Error::InvalidConfig(format!("unknown backend: {}", other))),
        }
    }
}

/// Outcome of a single `index_if_absent` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexOutcome {
    /// No entry existed for the hash; the value was inserted.
    Inserted,
    /// An entry already occupied the hash; it is returned unchanged.
    Present(String),
    /// The value was appended to a log at `offset`. No read-back exists,
    /// so no previous value can ever be reported.
    Appended {
        /// Byte offset of the appended record
        offset: u64,
    },
}

impl IndexOutcome {
    /// Previous value, if the backend reported one.
    pub fn previous(&self) -> Option<&str> {
        match self {
            IndexOutcome::Present(v) => Some(v.as_str()),
            _ => None,
        }
    }
}
