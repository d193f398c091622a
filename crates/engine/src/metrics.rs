//! Transaction metrics
//!
//! Counters use Relaxed ordering: they are purely observational and do not
//! synchronize any other memory operations. Approximate counts under
//! concurrency are acceptable.

use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters owned by a database
#[derive(Debug, Default)]
pub(crate) struct MetricCounters {
    active_count: AtomicU64,
    total_started: AtomicU64,
    total_committed: AtomicU64,
    total_aborted: AtomicU64,
    total_failed: AtomicU64,
}

impl MetricCounters {
    pub(crate) fn record_start(&self) {
        self.active_count.fetch_add(1, Ordering::Relaxed);
        self.total_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.finish();
        self.total_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_abort(&self) {
        self.finish();
        self.total_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.finish();
        self.total_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// An attempt dropped before reaching a terminal state
    pub(crate) fn record_abandon(&self) {
        self.finish();
    }

    fn finish(&self) {
        // Saturating decrement to prevent underflow
        let _ = self
            .active_count
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |x| {
                Some(x.saturating_sub(1))
            });
    }

    pub(crate) fn snapshot(&self) -> TransactionMetrics {
        let started = self.total_started.load(Ordering::Relaxed);
        let committed = self.total_committed.load(Ordering::Relaxed);

        TransactionMetrics {
            active_count: self.active_count.load(Ordering::Relaxed),
            total_started: started,
            total_committed: committed,
            total_aborted: self.total_aborted.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
            commit_rate: if started > 0 {
                committed as f64 / started as f64
            } else {
                0.0
            },
        }
    }
}

/// Transaction metrics
///
/// Point-in-time copy of the transaction lifecycle counters.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionMetrics {
    /// Attempts begun but not yet committed, aborted, or dropped
    pub active_count: u64,
    /// Total number of attempts begun
    pub total_started: u64,
    /// Total number of attempts committed
    pub total_committed: u64,
    /// Total number of attempts aborted by validation
    pub total_aborted: u64,
    /// Total number of attempts whose transaction procedure returned an error
    pub total_failed: u64,
    /// Commit success rate (committed / started)
    pub commit_rate: f64,
}

impl TransactionMetrics {
    /// Total attempts that reached a terminal state
    pub fn total_completed(&self) -> u64 {
        self.total_committed + self.total_aborted + self.total_failed
    }

    /// Abort rate (aborted / started)
    pub fn abort_rate(&self) -> f64 {
        if self.total_started > 0 {
            self.total_aborted as f64 / self.total_started as f64
        } else {
            0.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_metrics() {
        let m = MetricCounters::default().snapshot();
        assert_eq!(m.total_started, 0);
        assert_eq!(m.commit_rate, 0.0);
        assert_eq!(m.abort_rate(), 0.0);
    }

    #[test]
    fn test_lifecycle_counts() {
        let counters = MetricCounters::default();
        for _ in 0..4 {
            counters.record_start();
        }
        counters.record_commit();
        counters.record_commit();
        counters.record_abort();

        let m = counters.snapshot();
        assert_eq!(m.active_count, 1);
        assert_eq!(m.total_completed(), 3);
        assert_eq!(m.commit_rate, 0.5);
        assert_eq!(m.abort_rate(), 0.25);

        counters.record_failure();
        let m = counters.snapshot();
        assert_eq!(m.active_count, 0);
        assert_eq!(m.total_failed, 1);
    }

    #[test]
    fn test_active_count_saturates() {
        let counters = MetricCounters::default();
        counters.record_abandon();
        assert_eq!(counters.snapshot().active_count, 0);
    }
}
