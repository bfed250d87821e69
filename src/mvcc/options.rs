//! Write and read options

use std::fmt;

use serde::{Deserialize, Serialize};

use super::stats::MvccStats;
use crate::kv::{Timestamp, TxnMeta};

/// What to do when a regular write finds a committed version at or
/// above its timestamp.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteTooOldPolicy {
    /// Fail with `WriteTooOld` and let the caller pick a new timestamp.
    #[default]
    Reject,
    /// Write just above the newest committed version.
    Push,
}

impl WriteTooOldPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteTooOldPolicy::Reject => "reject",
            WriteTooOldPolicy::Push => "push",
        }
    }
}

impl fmt::Display for WriteTooOldPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for a single MVCC write.
#[derive(Debug, Default)]
pub struct WriteOptions<'a> {
    /// Owning transaction; `None` writes a committed version directly.
    pub txn: Option<&'a TxnMeta>,
    /// Local clock reading of the writer.
    pub local_timestamp: Option<Timestamp>,
    /// Accumulator for statistics deltas.
    pub stats: Option<&'a mut MvccStats>,
    /// Reject replays that cannot be proven identical to the original.
    pub replay_protection: bool,
    pub write_too_old: WriteTooOldPolicy,
    /// Conflicting locks reported before failing (0 = unbounded).
    pub max_lock_conflicts: u64,
}

impl<'a> WriteOptions<'a> {
    /// Options for a non-transactional write with default policy.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_txn(mut self, txn: Option<&'a TxnMeta>) -> Self {
        self.txn = txn;
        self
    }

    pub fn with_stats(mut self, stats: &'a mut MvccStats) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.replay_protection = enabled;
        self
    }

    pub fn with_write_too_old(mut self, policy: WriteTooOldPolicy) -> Self {
        self.write_too_old = policy;
        self
    }

    pub fn with_max_lock_conflicts(mut self, max: u64) -> Self {
        self.max_lock_conflicts = max;
        self
    }
}

/// Options for an MVCC read.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOptions<'a> {
    /// Reading transaction, whose own intents are visible.
    pub txn: Option<&'a TxnMeta>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_defaults_to_reject() {
        assert_eq!(WriteTooOldPolicy::default(), WriteTooOldPolicy::Reject);
        assert_eq!(WriteOptions::new().write_too_old, WriteTooOldPolicy::Reject);
        assert_eq!(WriteOptions::new().max_lock_conflicts, 0);
    }

    #[test]
    fn test_policy_serde_names() {
        let push: WriteTooOldPolicy = serde_json::from_str("\"push\"").unwrap();
        assert_eq!(push, WriteTooOldPolicy::Push);
        assert_eq!(serde_json::to_string(&WriteTooOldPolicy::Reject).unwrap(), "\"reject\"");
    }
}
