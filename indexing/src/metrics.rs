//! Lock-free metrics for the indexing service.
//!
//! Counters are plain atomics; durations accumulate as milliseconds and are divided down on
//! snapshot, so averages may read as zero when the corresponding count is zero. Peak memory is
//! updated with a compare-and-swap loop so concurrent samplers never regress it.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[cfg(feature = "metrics-rss")]
mod rss {
    use sysinfo::{Pid, System};

    pub fn sample_bytes() -> u64 {
        let pid = Pid::from_u32(std::process::id());
        let mut system = System::new();
        system.refresh_process(pid);
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

#[cfg(not(feature = "metrics-rss"))]
mod rss {
    /// No-op sampler: the core never touches OS-specific syscalls in its hot path unless the
    /// `metrics-rss` feature is enabled.
    pub fn sample_bytes() -> u64 {
        0
    }
}

/// An immutable point-in-time view of [`Metrics`], returned by `get_metrics()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub files_indexed: u64,
    pub search_queries: u64,
    pub total_indexing_duration_ms: u64,
    pub total_search_duration_ms: u64,
    pub avg_indexing_duration_ms: u64,
    pub avg_search_duration_ms: u64,
    pub current_memory_bytes: u64,
    pub peak_memory_bytes: u64,
    pub healthy: bool,
}

/// Atomic counters backing a [`MetricsSnapshot`].
#[derive(Debug, Default)]
pub struct Metrics {
    files_indexed: AtomicU64,
    search_queries: AtomicU64,
    total_indexing_duration_ms: AtomicU64,
    total_search_duration_ms: AtomicU64,
    current_memory_bytes: AtomicU64,
    peak_memory_bytes: AtomicU64,
}

const HEALTHY_AVG_INDEXING_MS: u64 = 1_000;
const HEALTHY_AVG_SEARCH_MS: u64 = 100;

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful `index_file` call and sample memory opportunistically.
    pub fn record_indexing(&self, duration: Duration) {
        self.files_indexed.fetch_add(1, Ordering::Relaxed);
        self.total_indexing_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.sample_memory();
    }

    /// Record one `search_all` call and sample memory opportunistically.
    pub fn record_search(&self, duration: Duration) {
        self.search_queries.fetch_add(1, Ordering::Relaxed);
        self.total_search_duration_ms
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        self.sample_memory();
    }

    fn sample_memory(&self) {
        let sample = rss::sample_bytes();
        self.current_memory_bytes.store(sample, Ordering::Relaxed);

        let mut peak = self.peak_memory_bytes.load(Ordering::Relaxed);
        while sample > peak {
            match self.peak_memory_bytes.compare_exchange_weak(
                peak,
                sample,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let files_indexed = self.files_indexed.load(Ordering::Relaxed);
        let search_queries = self.search_queries.load(Ordering::Relaxed);
        let total_indexing_duration_ms = self.total_indexing_duration_ms.load(Ordering::Relaxed);
        let total_search_duration_ms = self.total_search_duration_ms.load(Ordering::Relaxed);

        let avg_indexing_duration_ms = checked_avg(total_indexing_duration_ms, files_indexed);
        let avg_search_duration_ms = checked_avg(total_search_duration_ms, search_queries);

        MetricsSnapshot {
            files_indexed,
            search_queries,
            total_indexing_duration_ms,
            total_search_duration_ms,
            avg_indexing_duration_ms,
            avg_search_duration_ms,
            current_memory_bytes: self.current_memory_bytes.load(Ordering::Relaxed),
            peak_memory_bytes: self.peak_memory_bytes.load(Ordering::Relaxed),
            healthy: avg_indexing_duration_ms < HEALTHY_AVG_INDEXING_MS
                && avg_search_duration_ms < HEALTHY_AVG_SEARCH_MS,
        }
    }
}

fn checked_avg(total_ms: u64, count: u64) -> u64 {
    if count == 0 {
        0
    } else {
        total_ms / count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metrics_are_healthy_with_zero_averages() {
        let metrics = Metrics::new();
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.avg_indexing_duration_ms, 0);
        assert_eq!(snapshot.avg_search_duration_ms, 0);
        assert!(snapshot.healthy);
    }

    #[test]
    fn recording_accumulates_counts_and_durations() {
        let metrics = Metrics::new();
        metrics.record_indexing(Duration::from_millis(50));
        metrics.record_indexing(Duration::from_millis(150));
        metrics.record_search(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_indexed, 2);
        assert_eq!(snapshot.search_queries, 1);
        assert_eq!(snapshot.total_indexing_duration_ms, 200);
        assert_eq!(snapshot.avg_indexing_duration_ms, 100);
        assert_eq!(snapshot.avg_search_duration_ms, 10);
    }

    #[test]
    fn unhealthy_when_averages_exceed_thresholds() {
        let metrics = Metrics::new();
        metrics.record_indexing(Duration::from_millis(2_000));
        assert!(!metrics.snapshot().healthy);
    }
}
