//! Span latching
//!
//! This module provides:
//! - `SpanSet` / `LatchSpan` / `SpanAccess` - Declared key spans of a batch
//! - `LatchManager` - Mutual exclusion over conflicting span sets
//!
//! Latches isolate concurrent evaluations on one range. They are held
//! from before evaluation until the resulting batch is applied.

mod manager;
mod spanset;

pub use manager::{LatchGuard, LatchManager};
pub use spanset::{LatchSpan, SpanAccess, SpanSet};
