//! Storage engine interface and in-memory engine
//!
//! The evaluation core reads engine state through `Reader` and stages
//! every mutation through `Writer` into a `WriteBatch`. Only the
//! replication layer applies batches to an `Engine`, so an evaluation
//! that fails leaves the engine untouched.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::batch::{BatchOp, WriteBatch};
use super::errors::{StorageError, StorageResult};
use super::record::{Intent, MvccValue};
use crate::kv::{Key, Timestamp, Value};

/// Read access to engine state.
pub trait Reader {
    /// The inline (unversioned) value stored at `key`.
    fn get_inline(&self, key: &Key) -> StorageResult<Option<Value>>;

    /// The intent held on `key`, if any.
    fn get_intent(&self, key: &Key) -> StorageResult<Option<Intent>>;

    /// The newest committed version of `key` with timestamp at or below `ts`.
    fn get_version(&self, key: &Key, ts: Timestamp)
        -> StorageResult<Option<(Timestamp, MvccValue)>>;

    /// Every committed version of `key`, newest first.
    fn versions(&self, key: &Key) -> StorageResult<Vec<(Timestamp, MvccValue)>>;

    /// The newest committed version of `key`.
    fn latest_version(&self, key: &Key) -> StorageResult<Option<(Timestamp, MvccValue)>> {
        self.get_version(key, Timestamp::MAX)
    }
}

/// Write access to engine state.
pub trait Writer {
    /// Replaces the inline value at `key`.
    fn put_inline(&mut self, key: &Key, value: Value) -> StorageResult<()>;

    /// Stores a committed version of `key` at `ts`.
    fn put_version(&mut self, key: &Key, ts: Timestamp, value: MvccValue) -> StorageResult<()>;

    /// Stores the intent held on `key`, replacing any previous one.
    fn put_intent(&mut self, key: &Key, intent: Intent) -> StorageResult<()>;

    /// Removes the intent held on `key`.
    fn clear_intent(&mut self, key: &Key) -> StorageResult<()>;
}

/// Combined read/write access, as used during evaluation.
pub trait ReadWriter: Reader + Writer {}

impl<T: Reader + Writer> ReadWriter for T {}

/// A storage engine that can atomically apply write batches.
pub trait Engine: Reader + Send + Sync {
    /// Applies every operation of `batch` or none of them.
    fn apply(&self, batch: WriteBatch) -> StorageResult<()>;
}

#[derive(Debug, Default)]
struct EngineState {
    inline: BTreeMap<Key, Value>,
    versions: BTreeMap<Key, BTreeMap<Timestamp, MvccValue>>,
    intents: BTreeMap<Key, Intent>,
}

/// An in-memory engine.
///
/// Reads and batch application are internally synchronized. Read and
/// write failures can be injected to exercise error propagation.
#[derive(Debug, Default)]
pub struct InMemoryEngine {
    state: RwLock<EngineState>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent read fail until cleared.
    pub fn set_read_failure(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Makes every subsequent batch application fail until cleared.
    pub fn set_write_failure(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Every key with any inline value, version or intent, in order.
    pub fn keys(&self) -> StorageResult<Vec<Key>> {
        let state = self.read_state()?;
        let mut keys: Vec<Key> = state
            .inline
            .keys()
            .chain(state.versions.keys())
            .chain(state.intents.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        Ok(keys)
    }

    fn read_state(&self) -> StorageResult<RwLockReadGuard<'_, EngineState>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StorageError::read_failed("injected read failure"));
        }
        self.state
            .read()
            .map_err(|_| StorageError::read_failed("engine state lock poisoned"))
    }

    fn write_state(&self) -> StorageResult<RwLockWriteGuard<'_, EngineState>> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StorageError::write_failed("injected write failure"));
        }
        self.state
            .write()
            .map_err(|_| StorageError::write_failed("engine state lock poisoned"))
    }
}

impl Reader for InMemoryEngine {
    fn get_inline(&self, key: &Key) -> StorageResult<Option<Value>> {
        Ok(self.read_state()?.inline.get(key).cloned())
    }

    fn get_intent(&self, key: &Key) -> StorageResult<Option<Intent>> {
        Ok(self.read_state()?.intents.get(key).cloned())
    }

    fn get_version(
        &self,
        key: &Key,
        ts: Timestamp,
    ) -> StorageResult<Option<(Timestamp, MvccValue)>> {
        let state = self.read_state()?;
        Ok(state.versions.get(key).and_then(|versions| {
            versions
                .range(..=ts)
                .next_back()
                .map(|(ts, value)| (*ts, value.clone()))
        }))
    }

    fn versions(&self, key: &Key) -> StorageResult<Vec<(Timestamp, MvccValue)>> {
        let state = self.read_state()?;
        Ok(state
            .versions
            .get(key)
            .map(|versions| {
                versions
                    .iter()
                    .rev()
                    .map(|(ts, value)| (*ts, value.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl Engine for InMemoryEngine {
    fn apply(&self, batch: WriteBatch) -> StorageResult<()> {
        let mut state = self.write_state()?;
        for op in batch.into_ops() {
            match op {
                BatchOp::PutInline { key, value } => {
                    state.inline.insert(key, value);
                }
                BatchOp::PutVersion {
                    key,
                    timestamp,
                    value,
                } => {
                    state.versions.entry(key).or_default().insert(timestamp, value);
                }
                BatchOp::PutIntent { key, intent } => {
                    state.intents.insert(key, intent);
                }
                BatchOp::ClearIntent { key } => {
                    state.intents.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(data: &str, ts: i64) -> MvccValue {
        MvccValue::new(Value::from(data), None, Timestamp::from_wall(ts))
    }

    #[test]
    fn test_get_version_picks_newest_at_or_below() {
        let engine = InMemoryEngine::new();
        let key = Key::from("a");
        let mut batch = WriteBatch::new();
        batch.put_version(&key, Timestamp::from_wall(10), version("v10", 10)).unwrap();
        batch.put_version(&key, Timestamp::from_wall(20), version("v20", 20)).unwrap();
        engine.apply(batch).unwrap();

        let (ts, _) = engine.get_version(&key, Timestamp::from_wall(15)).unwrap().unwrap();
        assert_eq!(ts, Timestamp::from_wall(10));
        let (ts, _) = engine.get_version(&key, Timestamp::from_wall(20)).unwrap().unwrap();
        assert_eq!(ts, Timestamp::from_wall(20));
        assert!(engine.get_version(&key, Timestamp::from_wall(5)).unwrap().is_none());

        let all = engine.versions(&key).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].0 > all[1].0);
    }

    #[test]
    fn test_injected_failures() {
        let engine = InMemoryEngine::new();
        engine.set_read_failure(true);
        assert!(engine.get_inline(&Key::from("a")).is_err());
        engine.set_read_failure(false);
        assert!(engine.get_inline(&Key::from("a")).is_ok());

        engine.set_write_failure(true);
        let mut batch = WriteBatch::new();
        batch.put_inline(&Key::from("a"), Value::from("x")).unwrap();
        assert!(engine.apply(batch).is_err());
        engine.set_write_failure(false);
        assert!(engine.get_inline(&Key::from("a")).unwrap().is_none());
    }

    #[test]
    fn test_keys_are_sorted_and_unique() {
        let engine = InMemoryEngine::new();
        let mut batch = WriteBatch::new();
        batch.put_inline(&Key::from("c"), Value::from("x")).unwrap();
        batch.put_version(&Key::from("a"), Timestamp::from_wall(1), version("y", 1)).unwrap();
        batch.put_version(&Key::from("a"), Timestamp::from_wall(2), version("z", 2)).unwrap();
        engine.apply(batch).unwrap();

        assert_eq!(engine.keys().unwrap(), vec![Key::from("a"), Key::from("c")]);
    }
}
