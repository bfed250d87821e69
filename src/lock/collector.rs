//! Lock conflict collection
//!
//! An evaluation that touches several keys keeps going after a lock
//! conflict so the caller can resolve every blocking lock at once. It
//! stops once the configured bound is reached. A bound of zero means
//! no bound.

use super::ConflictingLock;

/// Accumulates conflicting locks up to a bound.
#[derive(Debug, Default)]
pub struct LockConflictCollector {
    max: u64,
    locks: Vec<ConflictingLock>,
}

impl LockConflictCollector {
    /// Creates a collector that stops after `max` locks (0 = unbounded).
    pub fn new(max: u64) -> Self {
        Self {
            max,
            locks: Vec::new(),
        }
    }

    /// Adds conflicting locks. Returns true once the bound is reached
    /// and evaluation should stop.
    pub fn add(&mut self, locks: impl IntoIterator<Item = ConflictingLock>) -> bool {
        for lock in locks {
            if self.limit_reached() {
                break;
            }
            if !self.locks.contains(&lock) {
                self.locks.push(lock);
            }
        }
        self.limit_reached()
    }

    /// Returns true once `max` locks have been collected.
    pub fn limit_reached(&self) -> bool {
        self.max > 0 && self.locks.len() as u64 >= self.max
    }

    /// Returns true if no conflict was collected.
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }

    /// Number of collected locks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// Consumes the collector, returning the collected locks in order.
    pub fn into_locks(self) -> Vec<ConflictingLock> {
        self.locks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{Key, Timestamp, TxnId, TxnMeta};

    fn lock(key: &str) -> ConflictingLock {
        ConflictingLock {
            key: Key::from(key),
            txn: TxnMeta {
                id: TxnId::new_v4(),
                epoch: 0,
                priority: 0,
                write_timestamp: Timestamp::from_wall(1),
                sequence: 0,
            },
            timestamp: Timestamp::from_wall(1),
        }
    }

    #[test]
    fn test_unbounded_collects_everything() {
        let mut collector = LockConflictCollector::new(0);
        for key in ["a", "b", "c"] {
            assert!(!collector.add([lock(key)]));
        }
        assert_eq!(collector.len(), 3);
    }

    #[test]
    fn test_bound_stops_collection() {
        let mut collector = LockConflictCollector::new(2);
        assert!(!collector.add([lock("a")]));
        assert!(collector.add([lock("b"), lock("c")]));
        assert_eq!(collector.len(), 2);
        let keys: Vec<Key> = collector.into_locks().into_iter().map(|l| l.key).collect();
        assert_eq!(keys, vec![Key::from("a"), Key::from("b")]);
    }

    #[test]
    fn test_duplicate_locks_counted_once() {
        let mut collector = LockConflictCollector::new(0);
        let a = lock("a");
        collector.add([a.clone()]);
        collector.add([a]);
        assert_eq!(collector.len(), 1);
    }
}
