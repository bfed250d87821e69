//! Evaluation results

use serde::Serialize;

use crate::kv::{Timestamp, Value};
use crate::lock::AcquiredLock;
use crate::mvcc::{MvccStats, WriteOutcome};
use crate::storage::WriteBatch;

/// Side effects of evaluation propagated to the caller alongside the
/// write batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Statistics delta of the staged writes.
    pub stats: MvccStats,
    pub acquired_locks: Vec<AcquiredLock>,
}

impl CommandResult {
    pub fn from_stats(stats: MvccStats) -> Self {
        Self {
            stats,
            acquired_locks: Vec::new(),
        }
    }

    pub fn from_write(stats: MvccStats, outcome: &WriteOutcome) -> Self {
        Self {
            stats,
            acquired_locks: outcome.acquired_lock.iter().cloned().collect(),
        }
    }

    /// Folds `other` into `self`.
    pub fn merge(&mut self, other: CommandResult) {
        self.stats.add(&other.stats);
        self.acquired_locks.extend(other.acquired_locks);
    }
}

/// Response to a write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PutResponse {
    pub write_timestamp: Timestamp,
    /// The write had already been applied; nothing new was staged.
    pub replayed: bool,
}

impl From<&WriteOutcome> for PutResponse {
    fn from(outcome: &WriteOutcome) -> Self {
        Self {
            write_timestamp: outcome.write_timestamp,
            replayed: outcome.replayed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GetResponse {
    pub value: Option<Value>,
}

/// Response to one request, in request order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Response {
    Put(PutResponse),
    ConditionalPut(PutResponse),
    Get(GetResponse),
}

impl Response {
    /// Returns true for a write that had already been applied.
    pub fn is_replay(&self) -> bool {
        match self {
            Self::Put(r) | Self::ConditionalPut(r) => r.replayed,
            Self::Get(_) => false,
        }
    }
}

/// Outcome of a successfully evaluated batch.
///
/// Nothing is visible in storage until `write_batch` is applied.
#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchResponse {
    pub responses: Vec<Response>,
    pub result: CommandResult,
    #[serde(skip)]
    pub write_batch: WriteBatch,
}
