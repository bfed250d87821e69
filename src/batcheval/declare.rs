//! Key-span declaration
//!
//! Before evaluation each request declares the latches it needs and the
//! locks it will acquire or observe. Declaration depends only on the
//! request and its header, never on storage contents.

use serde::Serialize;

use super::request::Header;
use crate::kv::{Key, Span, Timestamp};
use crate::lock::LockStrength;
use crate::spanlatch::{LatchSpan, SpanAccess, SpanSet};

/// One declared lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LockSpan {
    pub span: Span,
    pub strength: LockStrength,
}

/// Locks a batch will acquire or observe.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LockSpanSet {
    spans: Vec<LockSpan>,
}

impl LockSpanSet {
    /// Declares a lock; exact duplicates are recorded once.
    pub fn add(&mut self, strength: LockStrength, span: Span) {
        let lock = LockSpan { span, strength };
        if !self.spans.contains(&lock) {
            self.spans.push(lock);
        }
    }

    pub fn spans(&self) -> &[LockSpan] {
        &self.spans
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

/// Latch and lock spans declared by a batch.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeclaredSpans {
    pub latches: SpanSet,
    pub locks: LockSpanSet,
}

impl DeclaredSpans {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_spans(&self) -> impl Iterator<Item = &LatchSpan> {
        self.latches.with_access(SpanAccess::ReadOnly)
    }

    pub fn write_spans(&self) -> impl Iterator<Item = &LatchSpan> {
        self.latches.with_access(SpanAccess::ReadWrite)
    }

    pub fn lock_spans(&self) -> &[LockSpan] {
        self.locks.spans()
    }
}

/// Declares a single-key write.
///
/// Inline writes take a non-MVCC write latch and no lock. Timestamped
/// writes latch at the header's write timestamp and acquire an intent.
pub fn declare_isolated_write(header: &Header, key: &Key, inline: bool, spans: &mut DeclaredSpans) {
    if inline {
        spans
            .latches
            .add(SpanAccess::ReadWrite, Span::point(key.clone()), Timestamp::ZERO);
        return;
    }
    spans.latches.add(
        SpanAccess::ReadWrite,
        Span::point(key.clone()),
        header.write_timestamp(),
    );
    spans.locks.add(LockStrength::Intent, Span::point(key.clone()));
}

/// Declares a single-key read at the header's read timestamp.
pub fn declare_read(header: &Header, key: &Key, spans: &mut DeclaredSpans) {
    spans.latches.add(
        SpanAccess::ReadOnly,
        Span::point(key.clone()),
        header.read_timestamp(),
    );
    spans.locks.add(LockStrength::None, Span::point(key.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_write_declares_non_mvcc_latch_only() {
        let header = Header::new(Timestamp::from_wall(10));
        let mut spans = DeclaredSpans::new();
        declare_isolated_write(&header, &Key::from("a"), true, &mut spans);

        let writes: Vec<_> = spans.write_spans().collect();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].timestamp, Timestamp::ZERO);
        assert!(spans.lock_spans().is_empty());
    }

    #[test]
    fn test_timestamped_write_declares_latch_and_intent() {
        let header = Header::new(Timestamp::from_wall(10));
        let mut spans = DeclaredSpans::new();
        declare_isolated_write(&header, &Key::from("a"), false, &mut spans);

        let writes: Vec<_> = spans.write_spans().collect();
        assert_eq!(writes[0].timestamp, Timestamp::from_wall(10));
        assert_eq!(writes[0].span, Span::point("a"));
        assert_eq!(
            spans.lock_spans(),
            &[LockSpan {
                span: Span::point("a"),
                strength: LockStrength::Intent
            }]
        );
    }

    #[test]
    fn test_read_declares_read_latch_and_observing_lock() {
        let header = Header::new(Timestamp::from_wall(10));
        let mut spans = DeclaredSpans::new();
        declare_read(&header, &Key::from("a"), &mut spans);
        assert_eq!(spans.read_spans().count(), 1);
        assert_eq!(spans.write_spans().count(), 0);
        assert_eq!(spans.lock_spans()[0].strength, LockStrength::None);
    }

    #[test]
    fn test_repeated_declaration_is_deduplicated() {
        let header = Header::new(Timestamp::from_wall(10));
        let mut spans = DeclaredSpans::new();
        declare_isolated_write(&header, &Key::from("a"), false, &mut spans);
        declare_isolated_write(&header, &Key::from("a"), false, &mut spans);
        assert_eq!(spans.latches.len(), 1);
        assert_eq!(spans.locks.len(), 1);
    }
}
