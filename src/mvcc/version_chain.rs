//! VersionChain - Committed history of one key
//!
//! - Versions of a key are totally ordered by timestamp
//! - The chain is held newest first, as the engine returns it
//! - Provisional values are not part of the chain

use super::Version;
use crate::kv::{Key, Timestamp};
use crate::storage::{Reader, StorageResult};

/// The committed version history of a single key, newest first.
#[derive(Clone, Debug)]
pub struct VersionChain {
    key: Key,
    versions: Vec<Version>,
}

impl VersionChain {
    /// Creates an empty chain.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            versions: Vec::new(),
        }
    }

    /// Loads the full committed history of `key`. Checksums are verified.
    pub fn load<R: Reader + ?Sized>(reader: &R, key: &Key) -> StorageResult<Self> {
        let mut versions = Vec::new();
        for (timestamp, value) in reader.versions(key)? {
            value.value.verify(key)?;
            versions.push(Version::new(key.clone(), timestamp, value));
        }
        Ok(Self {
            key: key.clone(),
            versions,
        })
    }

    #[inline]
    pub fn key(&self) -> &Key {
        &self.key
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.versions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// All versions, newest first.
    #[inline]
    pub fn versions(&self) -> &[Version] {
        &self.versions
    }

    /// The newest version.
    pub fn latest(&self) -> Option<&Version> {
        self.versions.first()
    }

    /// The newest version with timestamp at or below `ts`.
    pub fn visible_at(&self, ts: Timestamp) -> Option<&Version> {
        self.versions.iter().find(|version| version.timestamp() <= ts)
    }

    /// The version written exactly at `ts`.
    pub fn at(&self, ts: Timestamp) -> Option<&Version> {
        self.versions.iter().find(|version| version.timestamp() == ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::Value;
    use crate::storage::{Engine, InMemoryEngine, MvccValue, WriteBatch, Writer};

    fn engine_with_versions(key: &Key, walls: &[i64]) -> InMemoryEngine {
        let engine = InMemoryEngine::new();
        let mut batch = WriteBatch::new();
        for wall in walls {
            let ts = Timestamp::from_wall(*wall);
            let value = Value::from(format!("v{}", wall)).with_checksum(key);
            batch.put_version(key, ts, MvccValue::new(value, None, ts)).unwrap();
        }
        engine.apply(batch).unwrap();
        engine
    }

    #[test]
    fn test_empty_chain() {
        let chain = VersionChain::new(Key::from("k"));
        assert!(chain.is_empty());
        assert!(chain.latest().is_none());
    }

    #[test]
    fn test_loaded_chain_is_newest_first() {
        let key = Key::from("k");
        let engine = engine_with_versions(&key, &[10, 30, 20]);
        let chain = VersionChain::load(&engine, &key).unwrap();

        let walls: Vec<i64> = chain.versions().iter().map(|v| v.timestamp().wall_time).collect();
        assert_eq!(walls, vec![30, 20, 10]);
        assert_eq!(chain.latest().unwrap().value(), &Value::from("v30"));
    }

    #[test]
    fn test_visible_at() {
        let key = Key::from("k");
        let engine = engine_with_versions(&key, &[10, 20]);
        let chain = VersionChain::load(&engine, &key).unwrap();

        assert_eq!(chain.visible_at(Timestamp::from_wall(15)).unwrap().value(), &Value::from("v10"));
        assert!(chain.visible_at(Timestamp::from_wall(5)).is_none());
        assert!(chain.at(Timestamp::from_wall(20)).is_some());
        assert!(chain.at(Timestamp::from_wall(15)).is_none());
    }

    #[test]
    fn test_load_detects_corruption() {
        let key = Key::from("k");
        let engine = InMemoryEngine::new();
        let ts = Timestamp::from_wall(1);
        let mut value = Value::from("x").with_checksum(&key);
        value.set_checksum_unchecked(0xdead_beef);
        let mut batch = WriteBatch::new();
        batch.put_version(&key, ts, MvccValue::new(value, None, ts)).unwrap();
        engine.apply(batch).unwrap();

        let err = VersionChain::load(&engine, &key).unwrap_err();
        assert!(err.is_fatal());
    }
}
