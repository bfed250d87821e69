//! Intent resolution
//!
//! Resolution belongs to the transaction coordinator. This is the storage
//! entry point it drives: commit the provisional value of an intent into
//! the version keyspace, or discard it.

use serde::{Deserialize, Serialize};

use super::errors::{MvccError, MvccResult};
use super::stats::{key_stats, MvccStats};
use crate::kv::{Key, Timestamp, TxnId};
use crate::storage::{MvccValue, ReadWriter};

/// Final status of the transaction owning an intent.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum IntentStatus {
    /// Committed at `timestamp`; the value lands at the later of this and
    /// the intent timestamp.
    Committed { timestamp: Timestamp },
    Aborted,
}

/// Resolves the intent of `txn_id` on `key`.
///
/// Returns false if the key holds no intent of that transaction.
pub fn resolve_intent<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    txn_id: TxnId,
    status: IntentStatus,
    stats: Option<&mut MvccStats>,
) -> MvccResult<bool> {
    let intent = match rw.get_intent(key)? {
        Some(intent) if intent.txn.id == txn_id => intent,
        _ => return Ok(false),
    };

    let commit_ts = match status {
        IntentStatus::Committed { timestamp } => {
            let commit_ts = timestamp.max(intent.timestamp);
            if let Some((existing_ts, _)) = rw.get_version(key, commit_ts)? {
                if existing_ts == commit_ts {
                    return Err(MvccError::WriteTooOld {
                        key: key.clone(),
                        write_ts: commit_ts,
                        existing_ts,
                    });
                }
            }
            intent.value.verify(key)?;
            Some(commit_ts)
        }
        IntentStatus::Aborted => None,
    };

    let before = match stats {
        Some(_) => Some(key_stats(&*rw, key)?),
        None => None,
    };

    rw.clear_intent(key)?;
    if let Some(commit_ts) = commit_ts {
        let version = MvccValue::new(intent.value, intent.local_timestamp, commit_ts);
        rw.put_version(key, commit_ts, version)?;
    }

    if let (Some(stats), Some(before)) = (stats, before) {
        let after = key_stats(&*rw, key)?;
        stats.add(&MvccStats::delta(&after, &before));
    }
    Ok(true)
}
