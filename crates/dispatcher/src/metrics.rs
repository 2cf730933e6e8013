//! Engine metrics for observability

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Counters shared by every dispatch worker
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Messages popped and dispatched
    processed: AtomicU64,
    /// Messages committed
    committed: AtomicU64,
    /// Messages rolled back (policy or failure)
    rolled_back: AtomicU64,
    /// Messages whose bucket matched no action
    unknown: AtomicU64,
    /// Anomaly alerts (no new keys produced)
    anomalies: AtomicU64,
    /// Stale destination keys observed
    stale_keys: AtomicU64,
    /// Stale destination keys actually deleted
    deleted_keys: AtomicU64,
    /// Fan-out blocks enqueued
    fanout: AtomicU64,
    /// Failed action executions
    failures: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_processed(&self) {
        self.processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_committed(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rolled_back(&self) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_unknown(&self) {
        self.unknown.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_anomalies(&self) {
        self.anomalies.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_stale_keys(&self, n: usize) {
        self.stale_keys.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn add_deleted_keys(&self, n: usize) {
        self.deleted_keys.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn inc_fanout(&self) {
        self.fanout.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failures(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::Relaxed)
    }

    pub fn rolled_back(&self) -> u64 {
        self.rolled_back.load(Ordering::Relaxed)
    }

    pub fn anomalies(&self) -> u64 {
        self.anomalies.load(Ordering::Relaxed)
    }

    /// Get snapshot of all counters
    pub fn snapshot(&self) -> EngineMetricsSnapshot {
        EngineMetricsSnapshot {
            processed: self.processed.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            unknown: self.unknown.load(Ordering::Relaxed),
            anomalies: self.anomalies.load(Ordering::Relaxed),
            stale_keys: self.stale_keys.load(Ordering::Relaxed),
            deleted_keys: self.deleted_keys.load(Ordering::Relaxed),
            fanout: self.fanout.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of engine metrics (for reporting)
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineMetricsSnapshot {
    pub processed: u64,
    pub committed: u64,
    pub rolled_back: u64,
    pub unknown: u64,
    pub anomalies: u64,
    pub stale_keys: u64,
    pub deleted_keys: u64,
    pub fanout: u64,
    pub failures: u64,
}

impl std::fmt::Display for EngineMetricsSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Engine Summary ===")?;
        writeln!(f, "Messages processed: {}", self.processed)?;
        writeln!(
            f,
            "  committed: {}, rolled back: {}, unmatched bucket: {}",
            self.committed, self.rolled_back, self.unknown
        )?;
        writeln!(f, "Action failures: {}", self.failures)?;
        writeln!(f, "Anomaly alerts: {}", self.anomalies)?;
        writeln!(
            f,
            "Stale keys: {} observed, {} deleted",
            self.stale_keys, self.deleted_keys
        )?;
        writeln!(f, "Fan-out blocks enqueued: {}", self.fanout)?;
        Ok(())
    }
}

/// Metrics for one batched index writer
#[derive(Debug, Default)]
pub struct WriterMetrics {
    /// Current write queue length
    queue_len: AtomicUsize,
    /// Documents successfully indexed
    docs_written: AtomicU64,
    /// Bulk batches flushed
    batches_flushed: AtomicU64,
    /// Failed bulk flushes
    failure_count: AtomicU64,
}

impl WriterMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_len(&self) -> usize {
        self.queue_len.load(Ordering::Relaxed)
    }

    pub fn set_queue_len(&self, len: usize) {
        self.queue_len.store(len, Ordering::Relaxed);
    }

    pub fn docs_written(&self) -> u64 {
        self.docs_written.load(Ordering::Relaxed)
    }

    pub fn add_docs_written(&self, n: usize) {
        self.docs_written.fetch_add(n as u64, Ordering::Relaxed);
    }

    pub fn batches_flushed(&self) -> u64 {
        self.batches_flushed.load(Ordering::Relaxed)
    }

    pub fn inc_batches_flushed(&self) {
        self.batches_flushed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn failure_count(&self) -> u64 {
        self.failure_count.load(Ordering::Relaxed)
    }

    pub fn inc_failure_count(&self) {
        self.failure_count.fetch_add(1, Ordering::Relaxed);
    }
}
