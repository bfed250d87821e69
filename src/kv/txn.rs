//! Transaction context
//!
//! Transaction identity, epoch, priority and timestamps are owned by the
//! transaction coordinator. The evaluation core only reads them from the
//! request header.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

/// Globally unique transaction identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TxnId(Uuid);

impl TxnId {
    /// Generates a fresh random identifier.
    pub fn new_v4() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl fmt::Display for TxnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The subset of transaction state recorded with an intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnMeta {
    pub id: TxnId,
    /// Incremented on every transaction restart.
    #[serde(default)]
    pub epoch: u32,
    #[serde(default)]
    pub priority: i32,
    /// Provisional commit timestamp.
    pub write_timestamp: Timestamp,
    /// Sequence number of the write within the current epoch.
    #[serde(default)]
    pub sequence: u32,
}

impl TxnMeta {
    /// Returns true if both refer to the same transaction, in any epoch.
    #[inline]
    pub fn same_txn(&self, other: &TxnMeta) -> bool {
        self.id == other.id
    }
}

/// A transaction as carried on a request header.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub name: String,
    pub meta: TxnMeta,
    pub read_timestamp: Timestamp,
}

impl Transaction {
    /// Creates a transaction at epoch zero reading and writing at `timestamp`.
    pub fn new(name: impl Into<String>, timestamp: Timestamp, priority: i32) -> Self {
        Self {
            name: name.into(),
            meta: TxnMeta {
                id: TxnId::new_v4(),
                epoch: 0,
                priority,
                write_timestamp: timestamp,
                sequence: 0,
            },
            read_timestamp: timestamp,
        }
    }

    /// Returns the transaction identifier.
    #[inline]
    pub fn id(&self) -> TxnId {
        self.meta.id
    }

    /// Returns the transaction restarted at the next epoch.
    pub fn restarted(mut self) -> Self {
        self.meta.epoch += 1;
        self.meta.sequence = 0;
        self
    }

    /// Sets the sequence number used for the next write.
    pub fn with_sequence(mut self, sequence: u32) -> Self {
        self.meta.sequence = sequence;
        self
    }

    /// Metadata for a write at `write_timestamp`, optionally overriding
    /// the sequence number.
    pub fn meta_for_write(&self, write_timestamp: Timestamp, sequence: Option<u32>) -> TxnMeta {
        let mut meta = self.meta.clone();
        meta.write_timestamp = write_timestamp;
        if let Some(sequence) = sequence {
            meta.sequence = sequence;
        }
        meta
    }
}
