//! The summary printed at the end of a run.

use std::fmt;
use std::time::Duration;

/// Aggregate outcome of a single benchmark run.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    /// Name of the backend the run was executed against.
    pub backend: &'static str,
    /// Name of the workload profile.
    pub workload: String,
    /// Number of characters in each written payload.
    pub payload_size: usize,
    /// Number of operations issued in the steady state.
    pub total_ops: u64,
    /// Number of write attempts.
    pub writes: u64,
    /// Number of read attempts.
    pub reads: u64,
    /// Writes that failed in tolerant mode.
    pub write_failures: u64,
    /// Reads that failed in tolerant mode.
    pub read_failures: u64,
    /// Reads that were not issued because the key pool was empty.
    pub reads_skipped: u64,
    /// Reads that found no record.
    pub reads_absent: u64,
    /// Wall-clock time of the steady state.
    pub elapsed: Duration,
}

impl Report {
    /// Operations per second over the whole steady state.
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.total_ops as f64 / secs
        } else {
            0.0
        }
    }

    /// Returns `true` if any operation failed.
    pub fn has_failures(&self) -> bool {
        self.write_failures > 0 || self.read_failures > 0
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Workload '{}' with data size {}: Executed {} operations ({} writes, {} reads) in {:.4} seconds.",
            self.backend,
            self.workload,
            self.payload_size,
            self.total_ops,
            self.writes,
            self.reads,
            self.elapsed.as_secs_f64(),
        )
    }
}
