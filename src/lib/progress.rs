//! Interval progress logging.

use std::sync::atomic::{AtomicU64, Ordering};

use famcall_metrics::format_count;
use log::info;

/// Default number of items between progress lines
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 100_000;

/// Counts processed items and logs a line every time the count passes a multiple of the
/// interval. Safe to share between threads.
///
/// # Example
/// ```
/// use famcall_lib::progress::ProgressTracker;
///
/// let tracker = ProgressTracker::new("reads").with_interval(100);
/// tracker.record(250); // logs "Processed 100 reads" and "Processed 200 reads"
/// tracker.finish();    // logs "Processed 250 reads (complete)"
/// assert_eq!(tracker.count(), 250);
/// ```
#[derive(Debug)]
pub struct ProgressTracker {
    noun: String,
    interval: u64,
    count: AtomicU64,
}

impl ProgressTracker {
    #[must_use]
    pub fn new(noun: impl Into<String>) -> Self {
        Self { noun: noun.into(), interval: DEFAULT_PROGRESS_INTERVAL, count: AtomicU64::new(0) }
    }

    /// Sets the logging interval; zero is treated as one.
    #[must_use]
    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    /// Adds `n` items, logging once for each interval boundary crossed.
    /// Returns the number of lines logged.
    pub fn record(&self, n: u64) -> u64 {
        if n == 0 {
            return 0;
        }
        let before = self.count.fetch_add(n, Ordering::Relaxed);
        let after = before + n;
        let (first, last) = (before / self.interval + 1, after / self.interval);
        for milestone in first..=last {
            info!("Processed {} {}", format_count(milestone * self.interval), self.noun);
        }
        last.saturating_sub(first - 1)
    }

    /// Logs the final count unless it was just logged on an interval boundary.
    pub fn finish(&self) {
        let count = self.count();
        if count == 0 || count % self.interval != 0 {
            info!("Processed {} {} (complete)", format_count(count), self.noun);
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}
