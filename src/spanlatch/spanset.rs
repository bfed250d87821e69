//! Latch span sets
//!
//! A `SpanSet` is what a request declares it will touch. The latch
//! manager serializes requests whose span sets conflict.

use serde::Serialize;

use crate::kv::{Span, Timestamp};

/// How a request touches a span.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanAccess {
    ReadOnly,
    ReadWrite,
}

impl SpanAccess {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadOnly => "read_only",
            Self::ReadWrite => "read_write",
        }
    }
}

/// One declared latch.
///
/// A zero timestamp marks a non-MVCC access, which conflicts with every
/// overlapping access of the other kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LatchSpan {
    pub span: Span,
    pub access: SpanAccess,
    pub timestamp: Timestamp,
}

impl LatchSpan {
    /// Returns true if the two latches cannot be held concurrently.
    pub fn conflicts_with(&self, other: &LatchSpan) -> bool {
        if !self.span.overlaps(&other.span) {
            return false;
        }
        match (self.access, other.access) {
            (SpanAccess::ReadOnly, SpanAccess::ReadOnly) => false,
            (SpanAccess::ReadWrite, SpanAccess::ReadWrite) => true,
            (SpanAccess::ReadOnly, SpanAccess::ReadWrite) => {
                read_blocks_on_write(self.timestamp, other.timestamp)
            }
            (SpanAccess::ReadWrite, SpanAccess::ReadOnly) => {
                read_blocks_on_write(other.timestamp, self.timestamp)
            }
        }
    }
}

/// A read only observes writes at or below its timestamp.
fn read_blocks_on_write(read_ts: Timestamp, write_ts: Timestamp) -> bool {
    read_ts.is_empty() || write_ts.is_empty() || read_ts >= write_ts
}

/// The latches declared by one batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SpanSet {
    spans: Vec<LatchSpan>,
}

impl SpanSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `span`; exact duplicates are recorded once.
    pub fn add(&mut self, access: SpanAccess, span: Span, timestamp: Timestamp) {
        let latch = LatchSpan {
            span,
            access,
            timestamp,
        };
        if !self.spans.contains(&latch) {
            self.spans.push(latch);
        }
    }

    pub fn spans(&self) -> &[LatchSpan] {
        &self.spans
    }

    /// Declared spans with the given access.
    pub fn with_access(&self, access: SpanAccess) -> impl Iterator<Item = &LatchSpan> {
        self.spans.iter().filter(move |s| s.access == access)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Returns true if any latch of `self` conflicts with any of `other`.
    pub fn conflicts_with(&self, other: &SpanSet) -> bool {
        self.spans
            .iter()
            .any(|a| other.spans.iter().any(|b| a.conflicts_with(b)))
    }
}
