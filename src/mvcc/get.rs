//! MVCC read path

use super::errors::{MvccError, MvccResult};
use super::options::ReadOptions;
use crate::kv::{Key, Timestamp, Value};
use crate::lock::{LockState, LockTable};
use crate::storage::{Intent, Reader};

/// Reads `key` at `timestamp`.
///
/// Inline values are returned regardless of timestamp. The reader's own
/// intent in its current epoch is visible at the reader's sequence.
/// Another transaction's intent at or below `timestamp` is a conflict.
pub fn get<R: Reader + ?Sized>(
    reader: &R,
    key: &Key,
    timestamp: Timestamp,
    opts: ReadOptions<'_>,
) -> MvccResult<Option<Value>> {
    if let Some(value) = reader.get_inline(key)? {
        value.verify(key)?;
        return Ok(Some(value));
    }

    match LockTable::lookup(reader, key, opts.txn)? {
        LockState::HeldByOther(lock) if lock.timestamp <= timestamp => {
            return Err(MvccError::conflict(lock));
        }
        LockState::HeldByWriter(intent) => {
            let own = opts
                .txn
                .filter(|txn| txn.epoch == intent.txn.epoch)
                .and_then(|txn| value_at_or_below(&intent, txn.sequence));
            if let Some(value) = own {
                value.verify(key)?;
                return Ok(Some(value.clone()));
            }
        }
        _ => {}
    }

    match reader.get_version(key, timestamp)? {
        Some((_, committed)) => {
            committed.value.verify(key)?;
            Ok(Some(committed.value))
        }
        None => Ok(None),
    }
}

/// The newest value the intent's epoch wrote at or below `sequence`.
fn value_at_or_below(intent: &Intent, sequence: u32) -> Option<&Value> {
    if sequence >= intent.txn.sequence {
        return Some(&intent.value);
    }
    intent
        .history
        .iter()
        .rev()
        .find(|entry| entry.sequence <= sequence)
        .map(|entry| &entry.value)
}
