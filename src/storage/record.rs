//! Engine record types
//!
//! The engine keeps three keyspaces per key:
//!
//! ```text
//! inline   key            -> Value          (unversioned slot)
//! version  key @ ts       -> MvccValue      (committed, immutable)
//! lock     key            -> Intent         (at most one per key)
//! ```
//!
//! A provisional write lives only in its intent record until the
//! external resolution process commits it into the version keyspace or
//! discards it.

use serde::Serialize;

use crate::kv::{Timestamp, TxnMeta, Value};

/// Size of the timestamp suffix of a versioned key.
pub const VERSION_TIMESTAMP_LEN: usize = 12;

/// A committed version payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MvccValue {
    pub value: Value,
    /// Local clock reading at write time, kept only when it is below the
    /// version timestamp.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_timestamp: Option<Timestamp>,
}

impl MvccValue {
    /// Creates a version payload, dropping a local timestamp that does not
    /// precede `version_ts`.
    pub fn new(value: Value, local_timestamp: Option<Timestamp>, version_ts: Timestamp) -> Self {
        Self {
            value,
            local_timestamp: local_timestamp.filter(|local| *local < version_ts),
        }
    }

    /// Size as accounted in storage statistics.
    pub fn encoded_len(&self) -> usize {
        let header = if self.local_timestamp.is_some() {
            VERSION_TIMESTAMP_LEN
        } else {
            0
        };
        self.value.encoded_len() + header
    }
}

/// An earlier write by the same transaction epoch on the same key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IntentHistoryEntry {
    pub sequence: u32,
    pub value: Value,
}

/// A provisional, transaction-scoped write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Intent {
    /// Owning transaction at the time of the latest write.
    pub txn: TxnMeta,
    /// Provisional version timestamp.
    pub timestamp: Timestamp,
    /// Latest provisional value.
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_timestamp: Option<Timestamp>,
    /// Earlier values written in the same epoch, ordered by sequence.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<IntentHistoryEntry>,
}

impl Intent {
    /// Value written by the owning epoch at `sequence`, if any.
    pub fn value_at_sequence(&self, sequence: u32) -> Option<&Value> {
        if sequence == self.txn.sequence {
            return Some(&self.value);
        }
        self.history
            .iter()
            .find(|entry| entry.sequence == sequence)
            .map(|entry| &entry.value)
    }

    /// The provisional value as the version it would commit to.
    pub fn as_mvcc_value(&self) -> MvccValue {
        MvccValue::new(self.value.clone(), self.local_timestamp, self.timestamp)
    }

    /// Size of the provisional value as accounted in storage statistics.
    pub fn encoded_len(&self) -> usize {
        self.as_mvcc_value().encoded_len()
    }
}
