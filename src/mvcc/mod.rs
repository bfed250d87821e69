//! MVCC Store
//!
//! This module provides:
//! - `put` / `blind_put` / `put_inline` / `conditional_put` / `conditional_put_inline` - The write path
//! - `get` - Timestamped point reads
//! - `resolve_intent` - Commit or discard a provisional write
//! - `ReplayGuard` - Detection of re-applied writes
//! - `MvccStats` - Byte and count accounting
//! - `Version` / `VersionChain` - Committed history of a key
//!
//! # Invariants
//!
//! - Committed versions are immutable; writes add newer versions
//! - At most one intent per key; another transaction's intent is a conflict
//! - Inline values have no history and no intent
//! - Every operation stages its mutations through the caller's batch

mod errors;
mod get;
mod options;
mod put;
mod replay;
mod resolve;
mod stats;
mod version;
mod version_chain;

pub use errors::{MvccError, MvccResult};
pub use get::get;
pub use options::{ReadOptions, WriteOptions, WriteTooOldPolicy};
pub use put::{
    blind_put, conditional_put, conditional_put_inline, put, put_inline, Condition, WriteOutcome,
};
pub use replay::{ReplayGuard, ReplayRejection, ReplayVerdict};
pub use resolve::{resolve_intent, IntentStatus};
pub use stats::{compute_stats, key_stats, MvccStats};
pub use version::Version;
pub use version_chain::VersionChain;
