use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Counters for the scan currently running on a session.
pub struct ProgressTracker {
    pub entries_probed: AtomicUsize,
    pub bytes_measured: AtomicU64,
    start_time: Mutex<Instant>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            entries_probed: AtomicUsize::new(0),
            bytes_measured: AtomicU64::new(0),
            start_time: Mutex::new(Instant::now()),
        }
    }

    /// Zero the counters and restart the clock for a new scan.
    pub fn reset(&self) {
        self.entries_probed.store(0, Ordering::Relaxed);
        self.bytes_measured.store(0, Ordering::Relaxed);
        if let Ok(mut start) = self.start_time.lock() {
            *start = Instant::now();
        }
    }

    /// Record one probed entry and return the running count.
    pub fn record(&self, size: u64) -> usize {
        self.bytes_measured.fetch_add(size, Ordering::Relaxed);
        self.entries_probed.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time
            .lock()
            .map(|start| start.elapsed())
            .unwrap_or_default()
    }

    pub fn entries_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed < f64::EPSILON {
            return 0.0;
        }
        self.entries_probed.load(Ordering::Relaxed) as f64 / elapsed
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            entries_probed: self.entries_probed.load(Ordering::Relaxed),
            bytes_measured: self.bytes_measured.load(Ordering::Relaxed),
            elapsed: self.elapsed(),
            entries_per_second: self.entries_per_second(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ProgressSnapshot {
    pub entries_probed: usize,
    pub bytes_measured: u64,
    pub elapsed: Duration,
    pub entries_per_second: f64,
}
