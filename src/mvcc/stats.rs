//! MVCC statistics
//!
//! Statistics are signed byte and count deltas. A range keeps a running
//! total; every write reports the delta it caused.
//!
//! Accounting per key:
//!
//! ```text
//! meta key          len(key) + 1
//! version suffix    12 bytes per timestamped version (intent included)
//! value             payload + 5 header bytes (+12 with a local timestamp)
//! live              meta key + newest version (intent if present)
//! ```

use serde::{Deserialize, Serialize};

use super::VersionChain;
use crate::kv::Key;
use crate::storage::{Reader, StorageResult, VERSION_TIMESTAMP_LEN};

/// Byte and count statistics, or a delta of them.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MvccStats {
    pub live_bytes: i64,
    pub live_count: i64,
    pub key_bytes: i64,
    pub key_count: i64,
    pub val_bytes: i64,
    pub val_count: i64,
    pub intent_bytes: i64,
    pub intent_count: i64,
    pub lock_count: i64,
}

impl MvccStats {
    pub fn add(&mut self, other: &MvccStats) {
        self.live_bytes += other.live_bytes;
        self.live_count += other.live_count;
        self.key_bytes += other.key_bytes;
        self.key_count += other.key_count;
        self.val_bytes += other.val_bytes;
        self.val_count += other.val_count;
        self.intent_bytes += other.intent_bytes;
        self.intent_count += other.intent_count;
        self.lock_count += other.lock_count;
    }

    pub fn subtract(&mut self, other: &MvccStats) {
        self.live_bytes -= other.live_bytes;
        self.live_count -= other.live_count;
        self.key_bytes -= other.key_bytes;
        self.key_count -= other.key_count;
        self.val_bytes -= other.val_bytes;
        self.val_count -= other.val_count;
        self.intent_bytes -= other.intent_bytes;
        self.intent_count -= other.intent_count;
        self.lock_count -= other.lock_count;
    }

    /// `after - before`.
    pub fn delta(after: &MvccStats, before: &MvccStats) -> MvccStats {
        let mut delta = *after;
        delta.subtract(before);
        delta
    }

    pub fn is_zero(&self) -> bool {
        *self == MvccStats::default()
    }

    /// Bytes visible to a reader at the newest timestamp.
    #[inline]
    pub fn logical_bytes(&self) -> i64 {
        self.live_bytes
    }

    /// Bytes held by the engine for keys and values.
    #[inline]
    pub fn physical_bytes(&self) -> i64 {
        self.key_bytes + self.val_bytes
    }

    /// Stats of a key holding exactly one timestamped value of
    /// `value_len` encoded bytes, provisional when `intent` is set.
    pub fn for_new_version(key: &Key, value_len: usize, intent: bool) -> MvccStats {
        let mut stats = MvccStats::default();
        stats.add_meta_key(key);
        stats.add_version(value_len);
        if intent {
            stats.add_intent(value_len);
        }
        stats.set_live(key, VERSION_TIMESTAMP_LEN + value_len);
        stats
    }

    /// Stats of a key holding an inline value of `value_len` encoded bytes.
    pub fn for_inline(key: &Key, value_len: usize) -> MvccStats {
        let mut stats = MvccStats::default();
        stats.add_meta_key(key);
        stats.val_count += 1;
        stats.val_bytes += value_len as i64;
        stats.set_live(key, value_len);
        stats
    }

    fn add_meta_key(&mut self, key: &Key) {
        self.key_count += 1;
        self.key_bytes += meta_key_len(key);
    }

    fn add_version(&mut self, value_len: usize) {
        self.key_bytes += VERSION_TIMESTAMP_LEN as i64;
        self.val_count += 1;
        self.val_bytes += value_len as i64;
    }

    fn add_intent(&mut self, value_len: usize) {
        self.intent_count += 1;
        self.lock_count += 1;
        self.intent_bytes += (VERSION_TIMESTAMP_LEN + value_len) as i64;
    }

    fn set_live(&mut self, key: &Key, live_len: usize) {
        self.live_count = 1;
        self.live_bytes = meta_key_len(key) + live_len as i64;
    }
}

fn meta_key_len(key: &Key) -> i64 {
    key.len() as i64 + 1
}

/// Computes the stats of a single key from its stored state.
pub fn key_stats<R: Reader + ?Sized>(reader: &R, key: &Key) -> StorageResult<MvccStats> {
    if let Some(value) = reader.get_inline(key)? {
        return Ok(MvccStats::for_inline(key, value.encoded_len()));
    }

    let chain = VersionChain::load(reader, key)?;
    let intent = reader.get_intent(key)?;
    let mut stats = MvccStats::default();
    if chain.is_empty() && intent.is_none() {
        return Ok(stats);
    }

    stats.add_meta_key(key);
    for version in chain.versions() {
        stats.add_version(version.mvcc_value().encoded_len());
    }
    let live_len = match (&intent, chain.latest()) {
        (Some(intent), _) => {
            let len = intent.encoded_len();
            stats.add_version(len);
            stats.add_intent(len);
            len
        }
        (None, Some(latest)) => latest.mvcc_value().encoded_len(),
        (None, None) => 0,
    };
    stats.set_live(key, VERSION_TIMESTAMP_LEN + live_len);
    Ok(stats)
}

/// Computes stats from scratch over `keys`.
pub fn compute_stats<'k, R: Reader + ?Sized>(
    reader: &R,
    keys: impl IntoIterator<Item = &'k Key>,
) -> StorageResult<MvccStats> {
    let mut total = MvccStats::default();
    for key in keys {
        total.add(&key_stats(reader, key)?);
    }
    Ok(total)
}
