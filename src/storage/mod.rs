//! Storage engine collaborator interface
//!
//! The byte-level storage engine is external to the evaluation core.
//! This module defines the contract the core consumes from it and an
//! in-memory implementation used by the replica driver, the CLI and tests.
//!
//! # Design Principles
//!
//! - Evaluation never mutates the engine directly; it stages writes
//! - A write batch is applied all-or-nothing
//! - Values are checksum-verified on read
//! - Committed versions are never rewritten in place

mod batch;
mod engine;
mod errors;
mod record;

pub use batch::{Batch, BatchOp, WriteBatch};
pub use engine::{Engine, InMemoryEngine, ReadWriter, Reader, Writer};
pub use errors::{Severity, StorageError, StorageErrorCode, StorageResult};
pub use record::{Intent, IntentHistoryEntry, MvccValue, VERSION_TIMESTAMP_LEN};
