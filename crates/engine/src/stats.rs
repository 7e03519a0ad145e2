//! Timing and memory observations
//!
//! Throughput helpers used by every report, and a process memory snapshot
//! taken at teardown. The snapshot reads `/proc/self/status` on Linux and
//! is empty elsewhere.

use serde::Serialize;
use std::time::Duration;

/// Operations per second over `elapsed`; 0 when nothing was timed
pub fn per_second(count: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs == 0.0 {
        return 0.0;
    }
    count as f64 / secs
}

/// Mean nanoseconds per operation; 0 for an empty run
pub fn avg_nanos(count: u64, elapsed: Duration) -> f64 {
    if count == 0 {
        return 0.0;
    }
    elapsed.as_nanos() as f64 / count as f64
}

/// Resident memory of this process
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemorySnapshot {
    /// Current resident set size
    pub rss_bytes: Option<u64>,
    /// Peak resident set size
    pub peak_rss_bytes: Option<u64>,
}

impl MemorySnapshot {
    /// Capture the current process memory usage
    pub fn capture() -> Self {
        #[cfg(target_os = "linux")]
        {
            let status = std::fs::read_to_string("/proc/self/status").unwrap_or_default();
            Self::parse_status(&status)
        }

        #[cfg(not(target_os = "linux"))]
        {
            Self::default()
        }
    }

    /// Parse `VmRSS` and `VmHWM` (kB) from a `/proc/<pid>/status` body
    pub fn parse_status(status: &str) -> Self {
        let parse_kb = |prefix: &str| -> Option<u64> {
            status
                .lines()
                .find(|l| l.starts_with(prefix))
                .and_then(|l| l.split_whitespace().nth(1).and_then(|s| s.parse::<u64>().ok()))
                .map(|kb| kb * 1024)
        };
        Self {
            rss_bytes: parse_kb("VmRSS:"),
            peak_rss_bytes: parse_kb("VmHWM:"),
        }
    }
}
