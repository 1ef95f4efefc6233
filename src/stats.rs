//! Running file and byte counters plus the final throughput report.

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::fmt;
use std::time::{Duration, Instant};

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    files: u64,
    bytes: u64,
}

#[derive(Debug)]
pub struct RunStats {
    counts: Mutex<Counts>,
    started: Instant,
}

impl RunStats {
    pub fn start() -> Self {
        RunStats {
            counts: Mutex::new(Counts::default()),
            started: Instant::now(),
        }
    }

    /// Counts one processed file of `bytes` bytes.
    ///
    /// Both counters move together under one lock, so a concurrent reader
    /// never sees the file counted without its bytes.
    pub fn add(&self, bytes: u64) {
        let mut counts = self.counts.lock();
        counts.files += 1;
        counts.bytes = counts.bytes.saturating_add(bytes);
    }

    pub fn report(&self) -> StatsReport {
        let counts = *self.counts.lock();
        StatsReport::new(counts.files, counts.bytes, self.started.elapsed(), Local::now())
    }
}

/// Final statistics, computed once after all workers exited.
#[derive(Debug, Clone)]
pub struct StatsReport {
    pub files: u64,
    pub bytes: u64,
    pub elapsed: Duration,
    pub finished_at: DateTime<Local>,
}

impl StatsReport {
    fn new(files: u64, bytes: u64, elapsed: Duration, finished_at: DateTime<Local>) -> Self {
        StatsReport {
            files,
            bytes,
            elapsed,
            finished_at,
        }
    }

    /// Whole megabytes processed.
    pub fn megabytes(&self) -> u64 {
        self.bytes / BYTES_PER_MB
    }

    /// Megabytes per second, `None` when no measurable time elapsed.
    pub fn throughput(&self) -> Option<f64> {
        let seconds = self.elapsed.as_secs_f64();
        if seconds > 0.0 {
            Some(self.megabytes() as f64 / seconds)
        } else {
            None
        }
    }
}

impl fmt::Display for StatsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "*".repeat(46);
        writeln!(f, "{rule}")?;
        writeln!(f, "Final file and timing data:")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "phantom version : {}", env!("CARGO_PKG_VERSION"))?;
        writeln!(
            f,
            "date            : {}",
            self.finished_at.format("%a %b %e %H:%M:%S %Y")
        )?;
        writeln!(f, "elapsed time    : {:.3} s", self.elapsed.as_secs_f64())?;
        writeln!(f, "files processed : {}", self.files)?;
        writeln!(f, "data processed  : {} MB", self.megabytes())?;
        match self.throughput() {
            Some(rate) => write!(f, "throughput      : {rate:.2} MB/s"),
            None => write!(f, "throughput      : n/a"),
        }
    }
}
