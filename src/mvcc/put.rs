//! MVCC write path
//!
//! Three write modes:
//! - Regular: reads the lock and version state of the key first and
//!   reports conflicts, stale epochs, replays and too-old timestamps
//! - Blind: installs the value without reading, except for replay
//!   evidence when replay protection is on
//! - Inline: replaces the unversioned slot of the key
//!
//! A transactional write leaves its value in an intent; a
//! non-transactional write installs a committed version. Every mode
//! stages its mutations through the caller's `ReadWriter`, so a failed
//! write leaves nothing behind once the caller discards the batch.

use serde::Serialize;

use super::errors::{MvccError, MvccResult};
use super::options::{WriteOptions, WriteTooOldPolicy};
use super::replay::{ReplayGuard, ReplayRejection, ReplayVerdict};
use super::stats::{key_stats, MvccStats};
use crate::kv::{Key, Timestamp, TxnMeta, Value};
use crate::lock::{AcquiredLock, ConflictingLock, LockConflictCollector, LockStrength, LockTable};
use crate::storage::{Intent, IntentHistoryEntry, MvccValue, ReadWriter, Reader, StorageResult};

/// Result of a successful write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    /// Timestamp the value landed at; zero for inline writes.
    pub write_timestamp: Timestamp,
    /// True if the write had already been applied and nothing was written.
    pub replayed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquired_lock: Option<AcquiredLock>,
}

/// Expected current value for a conditional write.
#[derive(Clone, Copy, Debug, Default)]
pub struct Condition<'a> {
    /// Value the key must currently hold; `None` expects no value.
    pub expected: Option<&'a Value>,
    /// Succeed when the key holds no value, whatever `expected` says.
    pub allow_if_does_not_exist: bool,
}

impl Condition<'_> {
    pub fn check(&self, key: &Key, actual: Option<&Value>) -> MvccResult<()> {
        let satisfied = match actual {
            None => self.allow_if_does_not_exist || self.expected.is_none(),
            Some(actual) => self.expected == Some(actual),
        };
        if satisfied {
            Ok(())
        } else {
            Err(MvccError::ConditionFailed {
                key: key.clone(),
                actual: actual.cloned(),
            })
        }
    }
}

/// Regular timestamped write of `value` to `key`.
pub fn put<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    timestamp: Timestamp,
    value: Value,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    write_versioned(rw, key, timestamp, value, None, opts)
}

/// Regular write that first checks the current value against `condition`.
pub fn conditional_put<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    timestamp: Timestamp,
    value: Value,
    condition: Condition<'_>,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    write_versioned(rw, key, timestamp, value, Some(condition), opts)
}

/// Replaces the inline value of `key` if it matches `condition`.
pub fn conditional_put_inline<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    value: Value,
    condition: Condition<'_>,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    write_inline(rw, key, value, Some(condition), opts)
}

/// Blind timestamped write.
///
/// The caller guarantees no conflicting writer exists. No intent or
/// version is inspected, so statistics are accounted as if the key held
/// no data before the write. A transactional blind write replaces
/// whatever intent record the key held.
pub fn blind_put<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    timestamp: Timestamp,
    value: Value,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    validate_timestamped(key, timestamp)?;
    let value = value.with_checksum(key);

    let guard = ReplayGuard::new(opts.replay_protection);
    if guard.is_protected() {
        match guard.check(&*rw, key, opts.txn, timestamp, &value)? {
            ReplayVerdict::NotReplay => {}
            ReplayVerdict::Applied { timestamp } => {
                return Ok(replayed_outcome(&*rw, key, opts.txn, timestamp)?);
            }
            ReplayVerdict::Rejected(reason) => {
                return Err(replay_rejected(key, opts.txn, reason));
            }
        }
    }

    let (encoded_len, acquired_lock) = match opts.txn {
        Some(txn) => {
            let intent = new_intent(txn, timestamp, value, opts.local_timestamp, Vec::new());
            let len = intent.encoded_len();
            (len, Some(LockTable::record(&mut *rw, key, intent)?))
        }
        None => {
            let version = MvccValue::new(value, opts.local_timestamp, timestamp);
            let len = version.encoded_len();
            rw.put_version(key, timestamp, version)?;
            (len, None)
        }
    };

    if let Some(stats) = opts.stats {
        stats.add(&MvccStats::for_new_version(key, encoded_len, opts.txn.is_some()));
    }
    Ok(WriteOutcome {
        write_timestamp: timestamp,
        replayed: false,
        acquired_lock,
    })
}

/// Replaces the inline value of `key`.
pub fn put_inline<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    value: Value,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    write_inline(rw, key, value, None, opts)
}

fn validate_timestamped(key: &Key, timestamp: Timestamp) -> MvccResult<()> {
    if key.is_empty() {
        return Err(MvccError::InvalidWrite("empty key".to_string()));
    }
    if timestamp.is_empty() {
        return Err(MvccError::InvalidWrite(format!(
            "timestamped write on {} requires a non-zero timestamp",
            key
        )));
    }
    Ok(())
}

fn write_versioned<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    timestamp: Timestamp,
    value: Value,
    condition: Option<Condition<'_>>,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    validate_timestamped(key, timestamp)?;
    if rw.get_inline(key)?.is_some() {
        return Err(MvccError::InvalidWrite(format!("{} holds an inline value", key)));
    }
    let value = value.with_checksum(key);
    let txn = opts.txn;
    let guard = ReplayGuard::new(opts.replay_protection);

    if let Some(lock) = LockTable::check_conflict(&*rw, key, txn)? {
        return Err(conflict_error(lock, opts.max_lock_conflicts));
    }
    // Without a conflict, any intent left on the key is the writer's own.
    let own_intent = match txn {
        Some(_) => rw.get_intent(key)?,
        None => None,
    };

    if let (Some(txn), Some(intent)) = (txn, own_intent.as_ref()) {
        if intent.txn.epoch > txn.epoch {
            return Err(MvccError::StaleEpoch {
                key: key.clone(),
                txn_id: txn.id,
                epoch: txn.epoch,
                intent_epoch: intent.txn.epoch,
            });
        }
        match guard.inspect_intent(intent, txn, timestamp, &value) {
            ReplayVerdict::NotReplay => {}
            ReplayVerdict::Applied { timestamp } => {
                return Ok(WriteOutcome {
                    write_timestamp: timestamp,
                    replayed: true,
                    acquired_lock: Some(acquired_from(key, intent)),
                });
            }
            ReplayVerdict::Rejected(reason) => return Err(replay_rejected(key, Some(txn), reason)),
        }
    }

    if own_intent.is_none() && guard.is_protected() {
        if let Some((version_ts, committed)) = rw.get_version(key, timestamp)? {
            match guard.inspect_committed(version_ts, &committed, timestamp, &value) {
                ReplayVerdict::NotReplay => {}
                ReplayVerdict::Applied { timestamp } => {
                    return Ok(WriteOutcome {
                        write_timestamp: timestamp,
                        replayed: true,
                        acquired_lock: None,
                    });
                }
                ReplayVerdict::Rejected(reason) => return Err(replay_rejected(key, txn, reason)),
            }
        }
    }

    // An intent from an older epoch is discarded, not rewritten.
    let current_intent = own_intent
        .filter(|intent| txn.is_some_and(|txn| txn.epoch == intent.txn.epoch));
    let latest = rw.latest_version(key)?;

    if let Some(condition) = condition {
        let actual = match (&current_intent, &latest) {
            (Some(intent), _) => Some(&intent.value),
            (None, Some((_, committed))) => Some(&committed.value),
            (None, None) => None,
        };
        if let Some(actual) = actual {
            actual.verify(key)?;
        }
        condition.check(key, actual)?;
    }

    let mut write_ts = timestamp;
    if let Some(intent) = &current_intent {
        write_ts = write_ts.max(intent.timestamp);
    }
    if let Some((existing_ts, _)) = latest {
        if existing_ts >= write_ts {
            match opts.write_too_old {
                // A protected write lands only at its requested timestamp.
                WriteTooOldPolicy::Push if !guard.is_protected() => write_ts = existing_ts.next(),
                WriteTooOldPolicy::Reject | WriteTooOldPolicy::Push => {
                    return Err(MvccError::WriteTooOld {
                        key: key.clone(),
                        write_ts,
                        existing_ts,
                    });
                }
            }
        }
    }

    let before = match opts.stats {
        Some(_) => Some(key_stats(&*rw, key)?),
        None => None,
    };

    let acquired_lock = match txn {
        Some(txn) => {
            let history = match current_intent {
                Some(previous) => {
                    let mut history = previous.history;
                    history.push(IntentHistoryEntry {
                        sequence: previous.txn.sequence,
                        value: previous.value,
                    });
                    history
                }
                None => Vec::new(),
            };
            let intent = new_intent(txn, write_ts, value, opts.local_timestamp, history);
            Some(LockTable::record(&mut *rw, key, intent)?)
        }
        None => {
            let version = MvccValue::new(value, opts.local_timestamp, write_ts);
            rw.put_version(key, write_ts, version)?;
            None
        }
    };

    if let (Some(stats), Some(before)) = (opts.stats, before) {
        let after = key_stats(&*rw, key)?;
        stats.add(&MvccStats::delta(&after, &before));
    }
    Ok(WriteOutcome {
        write_timestamp: write_ts,
        replayed: false,
        acquired_lock,
    })
}

fn write_inline<RW: ReadWriter + ?Sized>(
    rw: &mut RW,
    key: &Key,
    value: Value,
    condition: Option<Condition<'_>>,
    opts: WriteOptions<'_>,
) -> MvccResult<WriteOutcome> {
    if key.is_empty() {
        return Err(MvccError::InvalidWrite("empty key".to_string()));
    }
    if opts.txn.is_some() {
        return Err(MvccError::InvalidWrite(format!(
            "inline write on {} cannot be transactional",
            key
        )));
    }
    if rw.get_intent(key)?.is_some() || rw.latest_version(key)?.is_some() {
        return Err(MvccError::InvalidWrite(format!("{} holds versioned data", key)));
    }

    let value = value.with_checksum(key);
    let prior = rw.get_inline(key)?;
    if let Some(prior) = &prior {
        prior.verify(key)?;
    }
    if let Some(condition) = condition {
        condition.check(key, prior.as_ref())?;
    }

    let before = prior
        .map(|prior| MvccStats::for_inline(key, prior.encoded_len()))
        .unwrap_or_default();
    let after = MvccStats::for_inline(key, value.encoded_len());
    rw.put_inline(key, value)?;

    if let Some(stats) = opts.stats {
        stats.add(&MvccStats::delta(&after, &before));
    }
    Ok(WriteOutcome {
        write_timestamp: Timestamp::ZERO,
        replayed: false,
        acquired_lock: None,
    })
}

fn new_intent(
    txn: &TxnMeta,
    timestamp: Timestamp,
    value: Value,
    local_timestamp: Option<Timestamp>,
    history: Vec<IntentHistoryEntry>,
) -> Intent {
    let mut meta = txn.clone();
    meta.write_timestamp = timestamp;
    Intent {
        txn: meta,
        timestamp,
        value,
        local_timestamp: local_timestamp.filter(|local| *local < timestamp),
        history,
    }
}

fn acquired_from(key: &Key, intent: &Intent) -> AcquiredLock {
    AcquiredLock {
        key: key.clone(),
        txn: intent.txn.clone(),
        timestamp: intent.timestamp,
        strength: LockStrength::Intent,
    }
}

fn replayed_outcome<R: Reader + ?Sized>(
    reader: &R,
    key: &Key,
    txn: Option<&TxnMeta>,
    timestamp: Timestamp,
) -> StorageResult<WriteOutcome> {
    let acquired_lock = match (txn, reader.get_intent(key)?) {
        (Some(txn), Some(intent)) if intent.txn.same_txn(txn) => Some(acquired_from(key, &intent)),
        _ => None,
    };
    Ok(WriteOutcome {
        write_timestamp: timestamp,
        replayed: true,
        acquired_lock,
    })
}

/// Builds the conflict error for `lock`, bounded like a batch collector.
fn conflict_error(lock: ConflictingLock, max_lock_conflicts: u64) -> MvccError {
    let mut collector = LockConflictCollector::new(max_lock_conflicts);
    collector.add([lock]);
    MvccError::LockConflict {
        locks: collector.into_locks(),
    }
}

fn replay_rejected(key: &Key, txn: Option<&TxnMeta>, reason: ReplayRejection) -> MvccError {
    MvccError::AmbiguousReplayRejected {
        key: key.clone(),
        txn_id: txn.map(|txn| txn.id),
        reason,
    }
}
