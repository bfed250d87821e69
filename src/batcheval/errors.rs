//! Evaluation errors
//!
//! Every failure of a batch surfaces as one `EvalError`. Contention
//! errors are retryable by the caller; the rest are final.

use thiserror::Error;

use crate::kv::{Key, Timestamp, TxnId, Value};
use crate::lock::ConflictingLock;
use crate::mvcc::{MvccError, ReplayRejection};
use crate::storage::StorageError;

/// Result type for evaluation
pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Error)]
pub enum EvalError {
    // ==================
    // Contention
    // ==================
    /// Locks held by other transactions; the caller pushes or waits on them.
    #[error("lock conflict on {} key(s)", locks.len())]
    LockConflict { locks: Vec<ConflictingLock> },

    #[error("write on {key} at {write_ts} is too old: committed version at {existing_ts}")]
    WriteTooOld {
        key: Key,
        write_ts: Timestamp,
        existing_ts: Timestamp,
    },

    // ==================
    // Replay
    // ==================
    #[error("ambiguous replay rejected on {key}: {reason}")]
    AmbiguousReplayRejected {
        key: Key,
        txn_id: Option<TxnId>,
        reason: ReplayRejection,
    },

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
    #[error("condition failed on {key}")]
    ConditionFailed { key: Key, actual: Option<Value> },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("key {key} is outside range r{range_id}")]
    KeyOutsideRange { key: Key, range_id: u64 },

    #[error("unsupported request: {0}")]
    UnsupportedRequest(String),

    // ==================
    // Storage
    // ==================
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EvalError {
    /// Stable error code
    pub fn code(&self) -> &'static str {
        match self {
            Self::LockConflict { .. } => "AERO_EVAL_LOCK_CONFLICT",
            Self::WriteTooOld { .. } => "AERO_EVAL_WRITE_TOO_OLD",
            Self::AmbiguousReplayRejected { .. } => "AERO_EVAL_AMBIGUOUS_REPLAY",
            Self::StaleEpoch { .. } => "AERO_EVAL_STALE_EPOCH",
            Self::ConditionFailed { .. } => "AERO_EVAL_CONDITION_FAILED",
            Self::InvalidRequest(_) => "AERO_EVAL_INVALID_REQUEST",
            Self::KeyOutsideRange { .. } => "AERO_EVAL_KEY_OUTSIDE_RANGE",
            Self::UnsupportedRequest(_) => "AERO_EVAL_UNSUPPORTED_REQUEST",
            Self::Storage(err) => err.code().code(),
        }
    }

    /// Returns true if the caller may retry after resolving contention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::LockConflict { .. } | Self::WriteTooOld { .. })
    }

    /// Returns the conflicting locks if this is a lock conflict.
    pub fn conflicting_locks(&self) -> Option<&[ConflictingLock]> {
        match self {
            Self::LockConflict { locks } => Some(locks),
            _ => None,
        }
    }
}

impl From<MvccError> for EvalError {
    fn from(err: MvccError) -> Self {
        match err {
            MvccError::LockConflict { locks } => Self::LockConflict { locks },
            MvccError::WriteTooOld {
                key,
                write_ts,
                existing_ts,
            } => Self::WriteTooOld {
                key,
                write_ts,
                existing_ts,
            },
            MvccError::AmbiguousReplayRejected {
                key,
                txn_id,
                reason,
            } => Self::AmbiguousReplayRejected {
                key,
                txn_id,
                reason,
            },
            MvccError::StaleEpoch {
                key,
                txn_id,
                epoch,
                intent_epoch,
            } => Self::StaleEpoch {
                key,
                txn_id,
                epoch,
                intent_epoch,
            },
            MvccError::ConditionFailed { key, actual } => Self::ConditionFailed { key, actual },
            MvccError::InvalidWrite(msg) => Self::InvalidRequest(msg),
            MvccError::Storage(err) => Self::Storage(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mvcc_errors_keep_their_kind() {
        let err: EvalError = MvccError::WriteTooOld {
            key: Key::from("a"),
            write_ts: Timestamp::from_wall(1),
            existing_ts: Timestamp::from_wall(2),
        }
        .into();
        assert_eq!(err.code(), "AERO_EVAL_WRITE_TOO_OLD");
        assert!(err.is_retryable());

        let err: EvalError = MvccError::InvalidWrite("bad".into()).into();
        assert_eq!(err.code(), "AERO_EVAL_INVALID_REQUEST");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_storage_error_code_passes_through() {
        let err: EvalError = MvccError::Storage(StorageError::read_failed("boom")).into();
        assert_eq!(err.code(), "AERO_STORAGE_READ_FAILED");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_key_outside_range_display() {
        let err = EvalError::KeyOutsideRange {
            key: Key::from("z"),
            range_id: 4,
        };
        assert_eq!(err.to_string(), "key z is outside range r4");
        assert!(err.conflicting_locks().is_none());
    }
}
