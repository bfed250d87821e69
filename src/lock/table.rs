//! Lock/intent table
//!
//! Intents live in the engine's lock keyspace, one per key. The table
//! answers whether a writer may proceed on a key and records the intents
//! a write leaves behind. It never removes intents on its own: resolution
//! is performed by an external process and is observed here as the
//! intent being gone, or as an intent owned by another epoch of the
//! writer's own transaction (which is not a conflict).
//!
//! Callers hold the write latch on every key they pass in.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::kv::{Key, Timestamp, TxnMeta};
use crate::storage::{Intent, Reader, StorageResult, Writer};

/// How strongly a request interacts with the lock table on a span.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockStrength {
    /// Observes locks without acquiring any.
    None,
    /// Writes a provisional value, acquiring an intent.
    Intent,
}

/// A lock held by another transaction that blocked a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictingLock {
    pub key: Key,
    pub txn: TxnMeta,
    pub timestamp: Timestamp,
}

impl ConflictingLock {
    fn from_intent(key: &Key, intent: &Intent) -> Self {
        Self {
            key: key.clone(),
            txn: intent.txn.clone(),
            timestamp: intent.timestamp,
        }
    }
}

impl fmt::Display for ConflictingLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} held by txn {} at {}",
            self.key,
            self.txn.id.short(),
            self.timestamp
        )
    }
}

/// A lock acquired by an evaluation, propagated with its result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AcquiredLock {
    pub key: Key,
    pub txn: TxnMeta,
    pub timestamp: Timestamp,
    pub strength: LockStrength,
}

/// State of the lock on one key relative to a writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockState {
    /// No intent on the key.
    Unlocked,
    /// The intent belongs to the writer's transaction, in some epoch.
    HeldByWriter(Intent),
    /// The intent belongs to another transaction.
    HeldByOther(ConflictingLock),
}

/// Stateless access to the lock keyspace.
pub struct LockTable;

impl LockTable {
    /// Classifies the lock on `key` for a writer running as `txn`.
    ///
    /// Non-transactional writers conflict with every intent.
    pub fn lookup<R: Reader + ?Sized>(
        reader: &R,
        key: &Key,
        txn: Option<&TxnMeta>,
    ) -> StorageResult<LockState> {
        let intent = match reader.get_intent(key)? {
            Some(intent) => intent,
            None => return Ok(LockState::Unlocked),
        };
        match txn {
            Some(txn) if intent.txn.same_txn(txn) => Ok(LockState::HeldByWriter(intent)),
            _ => Ok(LockState::HeldByOther(ConflictingLock::from_intent(key, &intent))),
        }
    }

    /// Returns the lock blocking a write to `key` by `txn`, if any.
    pub fn check_conflict<R: Reader + ?Sized>(
        reader: &R,
        key: &Key,
        txn: Option<&TxnMeta>,
    ) -> StorageResult<Option<ConflictingLock>> {
        match Self::lookup(reader, key, txn)? {
            LockState::HeldByOther(lock) => Ok(Some(lock)),
            LockState::Unlocked | LockState::HeldByWriter(_) => Ok(None),
        }
    }

    /// Returns the lock blocking a read of `key` at `read_ts` by `txn`.
    ///
    /// Intents above the read timestamp are invisible and do not block.
    pub fn check_read_conflict<R: Reader + ?Sized>(
        reader: &R,
        key: &Key,
        txn: Option<&TxnMeta>,
        read_ts: Timestamp,
    ) -> StorageResult<Option<ConflictingLock>> {
        match Self::lookup(reader, key, txn)? {
            LockState::HeldByOther(lock) if lock.timestamp <= read_ts => Ok(Some(lock)),
            _ => Ok(None),
        }
    }

    /// Records `intent` as the lock on `key`, replacing any previous one.
    pub fn record<W: Writer + ?Sized>(
        writer: &mut W,
        key: &Key,
        intent: Intent,
    ) -> StorageResult<AcquiredLock> {
        let acquired = AcquiredLock {
            key: key.clone(),
            txn: intent.txn.clone(),
            timestamp: intent.timestamp,
            strength: LockStrength::Intent,
        };
        writer.put_intent(key, intent)?;
        Ok(acquired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::{TxnId, Value};
    use crate::storage::{Engine, InMemoryEngine, WriteBatch};

    fn meta(id: TxnId, epoch: u32, ts: i64) -> TxnMeta {
        TxnMeta {
            id,
            epoch,
            priority: 0,
            write_timestamp: Timestamp::from_wall(ts),
            sequence: 0,
        }
    }

    fn intent(txn: TxnMeta) -> Intent {
        Intent {
            timestamp: txn.write_timestamp,
            txn,
            value: Value::from("p"),
            local_timestamp: None,
            history: Vec::new(),
        }
    }

    fn engine_with_intent(key: &Key, txn: TxnMeta) -> InMemoryEngine {
        let engine = InMemoryEngine::new();
        let mut batch = WriteBatch::new();
        LockTable::record(&mut batch, key, intent(txn)).unwrap();
        engine.apply(batch).unwrap();
        engine
    }

    #[test]
    fn test_unlocked_key_has_no_conflict() {
        let engine = InMemoryEngine::new();
        let owner = meta(TxnId::new_v4(), 0, 100);
        assert_eq!(
            LockTable::check_conflict(&engine, &Key::from("a"), Some(&owner)).unwrap(),
            None
        );
    }

    #[test]
    fn test_other_txn_conflicts() {
        let key = Key::from("a");
        let holder = meta(TxnId::new_v4(), 0, 100);
        let engine = engine_with_intent(&key, holder.clone());

        let writer = meta(TxnId::new_v4(), 0, 101);
        let lock = LockTable::check_conflict(&engine, &key, Some(&writer))
            .unwrap()
            .unwrap();
        assert_eq!(lock.txn.id, holder.id);
        assert_eq!(lock.key, key);
    }

    #[test]
    fn test_non_transactional_writer_conflicts() {
        let key = Key::from("a");
        let engine = engine_with_intent(&key, meta(TxnId::new_v4(), 0, 100));
        assert!(LockTable::check_conflict(&engine, &key, None).unwrap().is_some());
    }

    #[test]
    fn test_own_intent_from_older_epoch_is_not_a_conflict() {
        let key = Key::from("a");
        let id = TxnId::new_v4();
        let engine = engine_with_intent(&key, meta(id, 0, 100));

        let writer = meta(id, 1, 100);
        assert!(LockTable::check_conflict(&engine, &key, Some(&writer)).unwrap().is_none());
        assert!(matches!(
            LockTable::lookup(&engine, &key, Some(&writer)).unwrap(),
            LockState::HeldByWriter(_)
        ));
    }

    #[test]
    fn test_reads_below_intent_are_not_blocked() {
        let key = Key::from("a");
        let engine = engine_with_intent(&key, meta(TxnId::new_v4(), 0, 100));

        let below = LockTable::check_read_conflict(&engine, &key, None, Timestamp::from_wall(99));
        assert!(below.unwrap().is_none());
        let at = LockTable::check_read_conflict(&engine, &key, None, Timestamp::from_wall(100));
        assert!(at.unwrap().is_some());
    }
}
