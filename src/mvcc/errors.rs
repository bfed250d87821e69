//! MVCC Errors

use thiserror::Error;

use super::replay::ReplayRejection;
use crate::kv::{Key, Timestamp, TxnId, Value};
use crate::lock::ConflictingLock;
use crate::storage::StorageError;

/// Result type for MVCC operations
pub type MvccResult<T> = Result<T, MvccError>;

/// Errors produced by the MVCC write and read paths.
#[derive(Debug, Error)]
pub enum MvccError {
    // ==================
    // Contention
    // ==================
    /// Intents held by other transactions block the operation.
    #[error("conflicting intents on {} key(s)", locks.len())]
    LockConflict { locks: Vec<ConflictingLock> },

    /// A committed version exists at or above the write timestamp.
    #[error("write on {key} at {write_ts} is too old: committed version at {existing_ts}")]
    WriteTooOld {
        key: Key,
        write_ts: Timestamp,
        existing_ts: Timestamp,
    },

    // ==================
    // Replay
    // ==================
    /// A re-delivered write cannot be treated as idempotent.
    #[error("ambiguous replay rejected on {key}: {reason}")]
    AmbiguousReplayRejected {
        key: Key,
        txn_id: Option<TxnId>,
        reason: ReplayRejection,
    },

    /// The writer runs at an older epoch than the intent it found.
    #[error("txn {txn_id} at epoch {epoch} is stale: intent on {key} is at epoch {intent_epoch}")]
    StaleEpoch {
        key: Key,
        txn_id: TxnId,
        epoch: u32,
        intent_epoch: u32,
    },

    // ==================
    // Request Errors
    // ==================
    /// The current value does not match the expected value.
    #[error("condition failed on {key}")]
    ConditionFailed { key: Key, actual: Option<Value> },

    /// The write is malformed for the state of the key.
    #[error("invalid write: {0}")]
    InvalidWrite(String),

    // ==================
    // Storage
    // ==================
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl MvccError {
    /// Builds a single-lock conflict error.
    pub fn conflict(lock: ConflictingLock) -> Self {
        MvccError::LockConflict { locks: vec![lock] }
    }

    /// Returns the conflicting locks if this is a lock conflict.
    pub fn conflicting_locks(&self) -> Option<&[ConflictingLock]> {
        match self {
            MvccError::LockConflict { locks } => Some(locks),
            _ => None,
        }
    }
}
