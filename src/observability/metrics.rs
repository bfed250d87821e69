//! Evaluation metrics
//!
//! - Counters only, monotonic, reset on process start
//! - Relaxed atomics; exact totals, no ordering between counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters for one range's evaluations.
#[derive(Debug, Default)]
pub struct EvalMetrics {
    batches: AtomicU64,
    batches_failed: AtomicU64,
    requests: AtomicU64,
    regular_writes: AtomicU64,
    blind_writes: AtomicU64,
    inline_writes: AtomicU64,
    reads: AtomicU64,
    lock_conflicts: AtomicU64,
    replays_detected: AtomicU64,
    replays_rejected: AtomicU64,
    write_too_old: AtomicU64,
    storage_failures: AtomicU64,
    intents_resolved: AtomicU64,
    bytes_written: AtomicU64,
}

impl EvalMetrics {
    /// Create a registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_batches(&self) {
        self.batches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_batches_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_requests(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_regular_writes(&self) {
        self.regular_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blind_writes(&self) {
        self.blind_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_inline_writes(&self) {
        self.inline_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_reads(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    /// Adds `count` conflicting locks.
    pub fn add_lock_conflicts(&self, count: u64) {
        self.lock_conflicts.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_replays_detected(&self) {
        self.replays_detected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_replays_rejected(&self) {
        self.replays_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_write_too_old(&self) {
        self.write_too_old.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_storage_failures(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_intents_resolved(&self) {
        self.intents_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_bytes_written(&self, bytes: u64) {
        self.bytes_written.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            regular_writes: self.regular_writes.load(Ordering::Relaxed),
            blind_writes: self.blind_writes.load(Ordering::Relaxed),
            inline_writes: self.inline_writes.load(Ordering::Relaxed),
            reads: self.reads.load(Ordering::Relaxed),
            lock_conflicts: self.lock_conflicts.load(Ordering::Relaxed),
            replays_detected: self.replays_detected.load(Ordering::Relaxed),
            replays_rejected: self.replays_rejected.load(Ordering::Relaxed),
            write_too_old: self.write_too_old.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            intents_resolved: self.intents_resolved.load(Ordering::Relaxed),
            bytes_written: self.bytes_written.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub batches: u64,
    pub batches_failed: u64,
    pub requests: u64,
    pub regular_writes: u64,
    pub blind_writes: u64,
    pub inline_writes: u64,
    pub reads: u64,
    pub lock_conflicts: u64,
    pub replays_detected: u64,
    pub replays_rejected: u64,
    pub write_too_old: u64,
    pub storage_failures: u64,
    pub intents_resolved: u64,
    pub bytes_written: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_registry_has_zero_values() {
        assert_eq!(EvalMetrics::new().snapshot(), MetricsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let metrics = EvalMetrics::new();
        metrics.increment_batches();
        metrics.increment_requests();
        metrics.increment_requests();
        metrics.add_lock_conflicts(3);
        metrics.add_bytes_written(128);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.batches, 1);
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.lock_conflicts, 3);
        assert_eq!(snapshot.bytes_written, 128);
    }

    #[test]
    fn test_snapshot_serializes() {
        let metrics = EvalMetrics::new();
        metrics.increment_blind_writes();
        let json = serde_json::to_value(metrics.snapshot()).unwrap();
        assert_eq!(json["blind_writes"], 1);
        assert_eq!(json["regular_writes"], 0);
    }

    #[test]
    fn test_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let metrics = Arc::new(EvalMetrics::new());
        let mut handles = vec![];
        for _ in 0..8 {
            let m = Arc::clone(&metrics);
            handles.push(thread::spawn(move || {
                for _ in 0..100 {
                    m.increment_requests();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(metrics.snapshot().requests, 800);
    }
}
