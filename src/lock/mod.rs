//! Lock/intent table
//!
//! This module provides:
//! - `LockTable` - Conflict checks and intent recording over the lock keyspace
//! - `LockState` - Classification of a key's lock relative to a writer
//! - `ConflictingLock` / `AcquiredLock` - Locks reported to the caller
//! - `LockConflictCollector` - Bounded accumulation of conflicts across keys

mod collector;
mod table;

pub use collector::LockConflictCollector;
pub use table::{AcquiredLock, ConflictingLock, LockState, LockStrength, LockTable};
