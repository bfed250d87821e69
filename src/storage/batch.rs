//! Write batches
//!
//! `WriteBatch` is the ordered list of engine mutations produced by one
//! evaluation. `Batch` layers a write batch over a `Reader` so that an
//! evaluation observes its own earlier writes.

use std::collections::BTreeMap;

use serde::Serialize;

use super::engine::{Reader, Writer};
use super::errors::StorageResult;
use super::record::{Intent, MvccValue, VERSION_TIMESTAMP_LEN};
use crate::kv::{Key, Timestamp, Value};

/// A single staged engine mutation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BatchOp {
    PutInline {
        key: Key,
        value: Value,
    },
    PutVersion {
        key: Key,
        timestamp: Timestamp,
        value: MvccValue,
    },
    PutIntent {
        key: Key,
        intent: Intent,
    },
    ClearIntent {
        key: Key,
    },
}

impl BatchOp {
    /// Approximate number of bytes this operation writes.
    pub fn encoded_size(&self) -> usize {
        match self {
            BatchOp::PutInline { key, value } => key.len() + value.encoded_len(),
            BatchOp::PutVersion { key, value, .. } => {
                key.len() + VERSION_TIMESTAMP_LEN + value.encoded_len()
            }
            BatchOp::PutIntent { key, intent } => {
                key.len() + VERSION_TIMESTAMP_LEN + intent.encoded_len()
            }
            BatchOp::ClearIntent { key } => key.len(),
        }
    }
}

/// Ordered engine mutations awaiting replication.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Creates an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the staged operations in order.
    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    /// Consumes the batch, returning its operations.
    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }

    /// Number of staged operations.
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Returns true if nothing was staged.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total bytes written by the batch.
    pub fn encoded_size(&self) -> usize {
        self.ops.iter().map(BatchOp::encoded_size).sum()
    }
}

impl Writer for WriteBatch {
    fn put_inline(&mut self, key: &Key, value: Value) -> StorageResult<()> {
        self.ops.push(BatchOp::PutInline {
            key: key.clone(),
            value,
        });
        Ok(())
    }

    fn put_version(&mut self, key: &Key, ts: Timestamp, value: MvccValue) -> StorageResult<()> {
        self.ops.push(BatchOp::PutVersion {
            key: key.clone(),
            timestamp: ts,
            value,
        });
        Ok(())
    }

    fn put_intent(&mut self, key: &Key, intent: Intent) -> StorageResult<()> {
        self.ops.push(BatchOp::PutIntent {
            key: key.clone(),
            intent,
        });
        Ok(())
    }

    fn clear_intent(&mut self, key: &Key) -> StorageResult<()> {
        self.ops.push(BatchOp::ClearIntent { key: key.clone() });
        Ok(())
    }
}

/// A read-your-writes view: staged writes layered over a base reader.
pub struct Batch<'a, R: Reader + ?Sized> {
    base: &'a R,
    writes: WriteBatch,
    inline: BTreeMap<Key, Value>,
    versions: BTreeMap<Key, BTreeMap<Timestamp, MvccValue>>,
    // `None` records a cleared intent shadowing the base.
    intents: BTreeMap<Key, Option<Intent>>,
}

impl<'a, R: Reader + ?Sized> Batch<'a, R> {
    /// Creates an empty batch over `base`.
    pub fn new(base: &'a R) -> Self {
        Self {
            base,
            writes: WriteBatch::new(),
            inline: BTreeMap::new(),
            versions: BTreeMap::new(),
            intents: BTreeMap::new(),
        }
    }

    /// Staged writes so far.
    pub fn writes(&self) -> &WriteBatch {
        &self.writes
    }

    /// Consumes the view, returning the staged writes.
    pub fn into_write_batch(self) -> WriteBatch {
        self.writes
    }
}

impl<R: Reader + ?Sized> Reader for Batch<'_, R> {
    fn get_inline(&self, key: &Key) -> StorageResult<Option<Value>> {
        match self.inline.get(key) {
            Some(value) => Ok(Some(value.clone())),
            None => self.base.get_inline(key),
        }
    }

    fn get_intent(&self, key: &Key) -> StorageResult<Option<Intent>> {
        match self.intents.get(key) {
            Some(staged) => Ok(staged.clone()),
            None => self.base.get_intent(key),
        }
    }

    fn get_version(
        &self,
        key: &Key,
        ts: Timestamp,
    ) -> StorageResult<Option<(Timestamp, MvccValue)>> {
        let staged = self.versions.get(key).and_then(|versions| {
            versions
                .range(..=ts)
                .next_back()
                .map(|(ts, value)| (*ts, value.clone()))
        });
        let base = self.base.get_version(key, ts)?;
        Ok(match (staged, base) {
            (Some(staged), Some(base)) if base.0 > staged.0 => Some(base),
            (Some(staged), _) => Some(staged),
            (None, base) => base,
        })
    }

    fn versions(&self, key: &Key) -> StorageResult<Vec<(Timestamp, MvccValue)>> {
        let mut merged: BTreeMap<Timestamp, MvccValue> =
            self.base.versions(key)?.into_iter().collect();
        if let Some(staged) = self.versions.get(key) {
            for (ts, value) in staged {
                merged.insert(*ts, value.clone());
            }
        }
        Ok(merged.into_iter().rev().collect())
    }
}

impl<R: Reader + ?Sized> Writer for Batch<'_, R> {
    fn put_inline(&mut self, key: &Key, value: Value) -> StorageResult<()> {
        self.inline.insert(key.clone(), value.clone());
        self.writes.put_inline(key, value)
    }

    fn put_version(&mut self, key: &Key, ts: Timestamp, value: MvccValue) -> StorageResult<()> {
        self.versions
            .entry(key.clone())
            .or_default()
            .insert(ts, value.clone());
        self.writes.put_version(key, ts, value)
    }

    fn put_intent(&mut self, key: &Key, intent: Intent) -> StorageResult<()> {
        self.intents.insert(key.clone(), Some(intent.clone()));
        self.writes.put_intent(key, intent)
    }

    fn clear_intent(&mut self, key: &Key) -> StorageResult<()> {
        self.intents.insert(key.clone(), None);
        self.writes.clear_intent(key)
    }
}
