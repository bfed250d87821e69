//! Latch manager
//!
//! Requests acquire latches over their declared spans before evaluation
//! and release them once their write batch is applied. Conflicting span
//! sets wait; non-conflicting ones proceed concurrently.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

use super::spanset::SpanSet;
use crate::observability::{log_event_with_fields, Event};

#[derive(Debug, Default)]
struct LatchState {
    next_id: u64,
    held: BTreeMap<u64, SpanSet>,
}

impl LatchState {
    fn try_insert(&mut self, spans: &SpanSet) -> Option<u64> {
        if self.held.values().any(|held| held.conflicts_with(spans)) {
            return None;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.held.insert(id, spans.clone());
        Some(id)
    }
}

/// Serializes access to overlapping key spans within one range.
#[derive(Debug, Default)]
pub struct LatchManager {
    state: Mutex<LatchState>,
    released: Notify,
}

impl LatchManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until `spans` conflicts with no held latch, then holds it.
    pub async fn acquire(&self, spans: SpanSet) -> LatchGuard<'_> {
        let mut waited = false;
        loop {
            // Register before checking so a release in between is not missed.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(guard) = self.try_acquire(&spans) {
                return guard;
            }
            if !waited {
                waited = true;
                let count = spans.len().to_string();
                log_event_with_fields(Event::LatchWait, &[("spans", count.as_str())]);
            }
            notified.await;
        }
    }

    /// Holds `spans` if nothing conflicts, without waiting.
    pub fn try_acquire(&self, spans: &SpanSet) -> Option<LatchGuard<'_>> {
        let id = self.lock_state().try_insert(spans)?;
        Some(LatchGuard { manager: self, id })
    }

    /// Number of span sets currently held.
    pub fn held_count(&self) -> usize {
        self.lock_state().held.len()
    }

    fn release(&self, id: u64) {
        self.lock_state().held.remove(&id);
        self.released.notify_waiters();
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, LatchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Held latches; released on drop.
#[derive(Debug)]
pub struct LatchGuard<'a> {
    manager: &'a LatchManager,
    id: u64,
}

impl Drop for LatchGuard<'_> {
    fn drop(&mut self) {
        self.manager.release(self.id);
    }
}
