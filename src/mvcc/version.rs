//! Version - Immutable committed version
//!
//! - A version is the committed value of a key at one timestamp
//! - Once written it never changes; later writes add newer versions
//!
//! This is a PURE TYPE with NO behavior beyond construction and access.

use crate::kv::{Key, Timestamp, Value};
use crate::storage::MvccValue;

/// A single committed version of a key.
///
/// All fields are private to enforce immutability.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Version {
    key: Key,
    timestamp: Timestamp,
    value: MvccValue,
}

impl Version {
    /// Creates a version. After construction it cannot be modified.
    pub fn new(key: Key, timestamp: Timestamp, value: MvccValue) -> Self {
        Self {
            key,
            timestamp,
            value,
        }
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Returns the stored payload including its local timestamp.
    #[inline]
    pub fn mvcc_value(&self) -> &MvccValue {
        &self.value
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_accessors() {
        let ts = Timestamp::from_wall(7);
        let version = Version::new(
            Key::from("k"),
            ts,
            MvccValue::new(Value::from("d"), None, ts),
        );

        assert_eq!(version.key(), &Key::from("k"));
        assert_eq!(version.timestamp(), ts);
        assert_eq!(version.value(), &Value::from("d"));
        assert!(version.mvcc_value().local_timestamp.is_none());
    }
}
