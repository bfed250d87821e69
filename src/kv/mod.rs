//! Key-value data model
//!
//! This module provides:
//! - `Key` / `Span` - Ordered keys and half-open key intervals
//! - `Timestamp` - Hybrid logical clock time
//! - `Clock` - Monotonic HLC timestamp source
//! - `Value` - Checksummed payload bytes
//! - `TxnId` / `TxnMeta` / `Transaction` - Transaction context read from headers

mod clock;
mod key;
mod timestamp;
mod txn;
mod value;

pub use clock::{Clock, PhysicalClock};
pub use key::{Key, Span};
pub use timestamp::Timestamp;
pub use txn::{Transaction, TxnId, TxnMeta};
pub use value::{Value, VALUE_HEADER_LEN};
