//! Replay Guard
//!
//! A write may be re-proposed after its first application. The guard
//! recognizes such replays so the write path can return the original
//! outcome without applying anything twice.
//!
//! Two sources of evidence are checked:
//! - Sequence replay: the writer's own intent already records a write at
//!   the request's sequence number in the same epoch
//! - Committed replay: with replay protection on, a committed version
//!   exists at exactly the write timestamp
//!
//! With replay protection on, a replay must also match the recorded
//! timestamp. Anything that looks like a replay but differs is rejected.

use std::fmt;

use serde::Serialize;

use crate::kv::{Key, Timestamp, TxnMeta, Value};
use crate::storage::{Intent, MvccValue, Reader, StorageResult};

/// Why a replay could not be treated as idempotent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum ReplayRejection {
    /// The recorded payload differs from the replayed one.
    PayloadMismatch,
    /// The recorded write landed at a different timestamp.
    TimestampChanged {
        recorded: Timestamp,
        requested: Timestamp,
    },
    /// The intent has no record of the replayed sequence.
    MissingSequence { sequence: u32 },
}

impl fmt::Display for ReplayRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReplayRejection::PayloadMismatch => write!(f, "payload differs from recorded write"),
            ReplayRejection::TimestampChanged {
                recorded,
                requested,
            } => write!(f, "recorded at {} but replayed at {}", recorded, requested),
            ReplayRejection::MissingSequence { sequence } => {
                write!(f, "no write recorded at sequence {}", sequence)
            }
        }
    }
}

/// Outcome of replay inspection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayVerdict {
    /// Not a replay; the write proceeds.
    NotReplay,
    /// Already applied at `timestamp`; the write is a no-op.
    Applied { timestamp: Timestamp },
    /// A replay that cannot be proven identical.
    Rejected(ReplayRejection),
}

/// Replay detection for one write.
#[derive(Copy, Clone, Debug, Default)]
pub struct ReplayGuard {
    protection: bool,
}

impl ReplayGuard {
    /// Creates a guard; `protection` mirrors the header's ambiguous
    /// replay marker.
    pub fn new(protection: bool) -> Self {
        Self { protection }
    }

    #[inline]
    pub fn is_protected(&self) -> bool {
        self.protection
    }

    /// Returns true if `txn` is re-issuing a sequence already recorded
    /// in `intent`.
    pub fn is_sequence_replay(intent: &Intent, txn: &TxnMeta) -> bool {
        intent.txn.same_txn(txn)
            && intent.txn.epoch == txn.epoch
            && txn.sequence <= intent.txn.sequence
    }

    /// Inspects the writer's own intent.
    pub fn inspect_intent(
        &self,
        intent: &Intent,
        txn: &TxnMeta,
        write_ts: Timestamp,
        value: &Value,
    ) -> ReplayVerdict {
        if !Self::is_sequence_replay(intent, txn) {
            return ReplayVerdict::NotReplay;
        }
        match intent.value_at_sequence(txn.sequence) {
            None => ReplayVerdict::Rejected(ReplayRejection::MissingSequence {
                sequence: txn.sequence,
            }),
            Some(recorded) if recorded != value => {
                ReplayVerdict::Rejected(ReplayRejection::PayloadMismatch)
            }
            Some(_) if self.protection && intent.timestamp != write_ts => {
                ReplayVerdict::Rejected(ReplayRejection::TimestampChanged {
                    recorded: intent.timestamp,
                    requested: write_ts,
                })
            }
            Some(_) => ReplayVerdict::Applied {
                timestamp: intent.timestamp,
            },
        }
    }

    /// Inspects a committed version found at or below the write timestamp.
    pub fn inspect_committed(
        &self,
        version_ts: Timestamp,
        committed: &MvccValue,
        write_ts: Timestamp,
        value: &Value,
    ) -> ReplayVerdict {
        if !self.protection || version_ts != write_ts {
            return ReplayVerdict::NotReplay;
        }
        if committed.value == *value {
            ReplayVerdict::Applied {
                timestamp: version_ts,
            }
        } else {
            ReplayVerdict::Rejected(ReplayRejection::PayloadMismatch)
        }
    }

    /// Reads the evidence for `key` and inspects it.
    pub fn check<R: Reader + ?Sized>(
        &self,
        reader: &R,
        key: &Key,
        txn: Option<&TxnMeta>,
        write_ts: Timestamp,
        value: &Value,
    ) -> StorageResult<ReplayVerdict> {
        if let Some(txn) = txn {
            if let Some(intent) = reader.get_intent(key)? {
                let verdict = self.inspect_intent(&intent, txn, write_ts, value);
                if verdict != ReplayVerdict::NotReplay {
                    return Ok(verdict);
                }
            }
        }
        if self.protection {
            if let Some((version_ts, committed)) = reader.get_version(key, write_ts)? {
                return Ok(self.inspect_committed(version_ts, &committed, write_ts, value));
            }
        }
        Ok(ReplayVerdict::NotReplay)
    }
}
