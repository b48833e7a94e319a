//! Dispatcher metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// In-process counters for one dispatcher instance
#[derive(Debug, Default)]
pub struct DispatcherMetrics {
    /// Current pending queue length
    queue_len: AtomicUsize,
    /// Messages accepted by the trigger
    enqueued_count: AtomicU64,
    /// Confirmed sends
    sent_count: AtomicU64,
    /// Failed send (or connect) attempts
    failure_count: AtomicU64,
    /// Failed client closes
    close_failure_count: AtomicU64,
    /// Dispatch loops started
    loops_started: AtomicU64,
}

impl DispatcherMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn enqueued_count(&self) -> u64 {
        self.enqueued_count.load(Ordering::Relaxed)
    }

    pub fn add_enqueued(&self, count: usize) {
        self.enqueued_count.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn sent_count(&self) -> u64 {
        self.sent_count.load(Ordering::Relaxed)
    }

    pub fn inc_sent_count(&self) {
        self.sent_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn close_failure_count(&self) -> u64 {
        self.close_failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_close_failure_count(&self) {
        self.close_failure_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn loops_started(&self) -> u64 {
        self.loops_started.load(Ordering::Relaxed)
    }

    pub fn inc_loops_started(&self) {
        self.loops_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queue_len: self.queue_len(),
            enqueued_count: self.enqueued_count(),
            sent_count: self.sent_count(),
            failure_count: self.failure_count(),
            close_failure_count: self.close_failure_count(),
            loops_started: self.loops_started(),
        }
    }
}

/// Snapshot of dispatcher metrics (for reporting)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub queue_len: usize,
    pub enqueued_count: u64,
    pub sent_count: u64,
    pub failure_count: u64,
    pub close_failure_count: u64,
    pub loops_started: u64,
}
