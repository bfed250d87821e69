//! Request model
//!
//! Every request evaluated on a range routes through `Request`. A batch
//! carries one header shared by all of its requests.

use serde::{Deserialize, Serialize};

use crate::kv::{Key, Timestamp, Transaction, TxnMeta, Value};

/// All requests evaluated on a range route through this enum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    Put(PutRequest),
    ConditionalPut(ConditionalPutRequest),
    Get(GetRequest),
}

impl Request {
    /// The key the request addresses
    pub fn key(&self) -> &Key {
        match self {
            Self::Put(r) => &r.key,
            Self::ConditionalPut(r) => &r.key,
            Self::Get(r) => &r.key,
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Put(_) => Method::Put,
            Self::ConditionalPut(_) => Method::ConditionalPut,
            Self::Get(_) => Method::Get,
        }
    }

    /// How the request writes, or `None` for reads
    pub fn write_mode(&self) -> Option<WriteMode> {
        match self {
            Self::Put(r) if r.inline => Some(WriteMode::Inline),
            Self::Put(r) if r.blind => Some(WriteMode::Blind),
            Self::Put(_) => Some(WriteMode::Regular),
            Self::ConditionalPut(r) if r.inline => Some(WriteMode::Inline),
            Self::ConditionalPut(_) => Some(WriteMode::Regular),
            Self::Get(_) => None,
        }
    }
}

/// Request type tag, used to look up command handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Put,
    ConditionalPut,
    Get,
}

impl Method {
    /// Get method name for metrics/logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Put => "put",
            Self::ConditionalPut => "conditional_put",
            Self::Get => "get",
        }
    }
}

/// Write mode of a mutating request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Checks locks and history before writing
    Regular,
    /// Writes without inspecting existing state
    Blind,
    /// Replaces the unversioned value of the key
    Inline,
}

/// Write a value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutRequest {
    pub key: Key,
    pub value: Value,
    /// Write the unversioned slot instead of a timestamped version
    #[serde(default)]
    pub inline: bool,
    /// The caller guarantees no conflicting writer exists
    #[serde(default)]
    pub blind: bool,
    /// Overrides the transaction's sequence number for this write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

/// Write a value if the key currently holds `expected`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalPutRequest {
    pub key: Key,
    pub value: Value,
    /// `None` expects the key to hold no value
    #[serde(default)]
    pub expected: Option<Value>,
    #[serde(default)]
    pub allow_if_does_not_exist: bool,
    #[serde(default)]
    pub inline: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence: Option<u32>,
}

/// Read a single key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetRequest {
    pub key: Key,
}

/// Context shared by every request of a batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    /// Evaluation timestamp; zero defers to the transaction's write timestamp
    #[serde(default)]
    pub timestamp: Timestamp,
    #[serde(default)]
    pub txn: Option<Transaction>,
    /// Verify that re-applied writes match what was originally written
    #[serde(default)]
    pub ambiguous_replay_protection: bool,
    /// Local clock reading recorded with written values
    #[serde(default)]
    pub now: Option<Timestamp>,
}

impl Header {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            ..Self::default()
        }
    }

    pub fn with_txn(mut self, txn: Transaction) -> Self {
        self.txn = Some(txn);
        self
    }

    pub fn with_replay_protection(mut self, enabled: bool) -> Self {
        self.ambiguous_replay_protection = enabled;
        self
    }

    /// Timestamp timestamped writes are evaluated at.
    pub fn write_timestamp(&self) -> Timestamp {
        match &self.txn {
            Some(txn) if self.timestamp.is_empty() => txn.meta.write_timestamp,
            _ => self.timestamp,
        }
    }

    /// Timestamp reads observe.
    pub fn read_timestamp(&self) -> Timestamp {
        match &self.txn {
            Some(txn) => txn.read_timestamp,
            None => self.timestamp,
        }
    }

    /// Transaction metadata recorded with a write at the header's write
    /// timestamp.
    pub fn txn_meta(&self, sequence: Option<u32>) -> Option<TxnMeta> {
        self.txn
            .as_ref()
            .map(|txn| txn.meta_for_write(self.write_timestamp(), sequence))
    }
}

/// A batch of requests evaluated atomically against one range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub header: Header,
    pub requests: Vec<Request>,
}

impl BatchRequest {
    pub fn new(header: Header, requests: Vec<Request>) -> Self {
        Self { header, requests }
    }

    pub fn single(header: Header, request: Request) -> Self {
        Self::new(header, vec![request])
    }

    /// Returns true if any request writes
    pub fn is_write(&self) -> bool {
        self.requests.iter().any(|r| r.write_mode().is_some())
    }
}
