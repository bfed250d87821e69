//! Value - Checksummed payload
//!
//! A value carries its payload bytes and an optional CRC32 checksum
//! bound to the key it is stored under. Every value written through
//! the MVCC layer is checksummed; reads verify the checksum and treat
//! a mismatch as corruption.

use std::fmt;

use crc32fast::Hasher;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::Key;
use crate::storage::{StorageError, StorageResult};

/// Fixed per-value header size: 4 checksum bytes and 1 tag byte.
pub const VALUE_HEADER_LEN: usize = 5;

/// A value payload.
///
/// Equality compares payload bytes only; the checksum is derived data.
#[derive(Clone, Default)]
pub struct Value {
    data: Vec<u8>,
    checksum: Option<u32>,
}

impl Value {
    /// Creates an unchecksummed value.
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            checksum: None,
        }
    }

    /// Returns the payload bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns the stored checksum, if any.
    #[inline]
    pub fn checksum(&self) -> Option<u32> {
        self.checksum
    }

    /// Size of the value as accounted in storage statistics.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.data.len() + VALUE_HEADER_LEN
    }

    /// Returns a copy of this value checksummed for `key`.
    pub fn with_checksum(mut self, key: &Key) -> Self {
        self.checksum = Some(compute_checksum(key, &self.data));
        self
    }

    /// Verifies the checksum against `key`. Values without a checksum pass.
    pub fn verify(&self, key: &Key) -> StorageResult<()> {
        match self.checksum {
            Some(expected) if expected != compute_checksum(key, &self.data) => {
                Err(StorageError::corruption_for_key(
                    key,
                    format!("value checksum mismatch: expected {:#010x}", expected),
                ))
            }
            _ => Ok(()),
        }
    }

    /// Overwrites the stored checksum. Only used to simulate corruption.
    #[doc(hidden)]
    pub fn set_checksum_unchecked(&mut self, checksum: u32) {
        self.checksum = Some(checksum);
    }
}

fn compute_checksum(key: &Key, data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(key.as_bytes());
    hasher.update(data);
    hasher.finalize()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for Value {}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Value({:?})", String::from_utf8_lossy(&self.data))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::from_bytes(s.as_bytes().to_vec())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::from_bytes(s.into_bytes())
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&String::from_utf8_lossy(&self.data))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Value::from)
    }
}
