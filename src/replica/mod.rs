//! Replica driver
//!
//! Serves batches for one range: declares spans, waits for latches,
//! evaluates against the engine, and applies the staged batch before
//! releasing the latches. Range statistics and counters are maintained
//! from the results.
//!
//! The replica's hybrid clock stamps each batch with a local reading and
//! then observes the timestamps the batch carries.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::batcheval::{
    BatchRequest, BatchResponse, CommandRegistry, EvalError, EvalResult, Evaluator, Header,
    RangeDescriptor, RangeState, WriteMode,
};
use crate::config::{EvalConfig, SettingsProvider};
use crate::kv::{Clock, Key, Span, Timestamp, TxnId};
use crate::mvcc::{resolve_intent, IntentStatus, MvccStats};
use crate::observability::{log_event_with_fields, EvalMetrics, Event, MetricsSnapshot};
use crate::spanlatch::{LatchManager, SpanAccess, SpanSet};
use crate::storage::{Batch, Engine};

/// One range served over a storage engine.
pub struct Replica {
    engine: Arc<dyn Engine>,
    registry: CommandRegistry,
    latches: LatchManager,
    clock: Clock,
    state: RangeState,
    stats: Mutex<MvccStats>,
    metrics: EvalMetrics,
}

impl Replica {
    pub fn new(engine: Arc<dyn Engine>, state: RangeState) -> Self {
        Self {
            engine,
            registry: CommandRegistry::with_defaults(),
            latches: LatchManager::new(),
            clock: Clock::new(),
            state,
            stats: Mutex::new(MvccStats::default()),
            metrics: EvalMetrics::new(),
        }
    }

    /// A replica for the range described by `config`.
    pub fn from_config(
        config: &EvalConfig,
        engine: Arc<dyn Engine>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let descriptor = RangeDescriptor::from_config(&config.range);
        Self::new(engine, RangeState::new(descriptor, settings))
    }

    /// Replaces the command handlers.
    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the system clock.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Seeds the range statistics, e.g. after loading existing data.
    pub fn with_stats(self, stats: MvccStats) -> Self {
        *self.lock_stats() = stats;
        self
    }

    /// Evaluates `batch` and applies its writes.
    pub async fn send(&self, mut batch: BatchRequest) -> EvalResult<BatchResponse> {
        self.metrics.increment_batches();
        self.observe_clock(&mut batch.header);
        let evaluator = Evaluator::new(&self.registry);

        let spans = evaluator
            .declare(&batch, self.state.descriptor())
            .map_err(|err| self.record_failure(err))?;
        let _latches = self.latches.acquire(spans.latches).await;

        let response = evaluator
            .evaluate(self.engine.as_ref(), &self.state, &batch)
            .map_err(|err| self.record_failure(err))?;

        let bytes = response.write_batch.encoded_size() as u64;
        if !response.write_batch.is_empty() {
            self.engine
                .apply(response.write_batch.clone())
                .map_err(|err| self.record_failure(err.into()))?;
        }

        self.lock_stats().add(&response.result.stats);
        self.record_success(&batch, &response, bytes);
        Ok(response)
    }

    /// Commits or discards the intent of `txn_id` on `key`.
    ///
    /// Returns false if the key holds no intent of that transaction.
    pub async fn resolve_intent(
        &self,
        key: &Key,
        txn_id: TxnId,
        status: IntentStatus,
    ) -> EvalResult<bool> {
        if !self.state.descriptor().contains_key(key) {
            return Err(EvalError::KeyOutsideRange {
                key: key.clone(),
                range_id: self.state.range_id(),
            });
        }

        let mut spans = SpanSet::new();
        spans.add(SpanAccess::ReadWrite, Span::point(key.clone()), Timestamp::ZERO);
        let _latches = self.latches.acquire(spans).await;

        let mut batch = Batch::new(self.engine.as_ref());
        let mut delta = MvccStats::default();
        let resolved = resolve_intent(&mut batch, key, txn_id, status, Some(&mut delta))
            .map_err(|err| self.record_failure(err.into()))?;
        if !resolved {
            return Ok(false);
        }

        let write_batch = batch.into_write_batch();
        let bytes = write_batch.encoded_size() as u64;
        self.engine
            .apply(write_batch)
            .map_err(|err| self.record_failure(err.into()))?;
        self.lock_stats().add(&delta);
        self.metrics.increment_intents_resolved();
        self.metrics.add_bytes_written(bytes);

        let status = match status {
            IntentStatus::Committed { .. } => "committed",
            IntentStatus::Aborted => "aborted",
        };
        log_event_with_fields(
            Event::IntentResolved,
            &[
                ("key", key.to_string().as_str()),
                ("txn_id", txn_id.short().as_str()),
                ("status", status),
            ],
        );
        Ok(true)
    }

    pub fn descriptor(&self) -> &RangeDescriptor {
        self.state.descriptor()
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Running statistics of the range.
    pub fn stats(&self) -> MvccStats {
        *self.lock_stats()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Number of batches currently holding latches.
    pub fn latches_held(&self) -> usize {
        self.latches.held_count()
    }

    /// Records the local clock reading unless the sender supplied one,
    /// then ratchets the clock past the batch's timestamps.
    fn observe_clock(&self, header: &mut Header) {
        if header.now.is_none() {
            header.now = Some(self.clock.now());
        }
        self.clock.update(header.timestamp);
        if let Some(txn) = &header.txn {
            self.clock.update(txn.meta.write_timestamp);
        }
    }

    fn lock_stats(&self) -> MutexGuard<'_, MvccStats> {
        self.stats.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record_success(&self, batch: &BatchRequest, response: &BatchResponse, bytes: u64) {
        for request in &batch.requests {
            self.metrics.increment_requests();
            match request.write_mode() {
                Some(WriteMode::Regular) => self.metrics.increment_regular_writes(),
                Some(WriteMode::Blind) => self.metrics.increment_blind_writes(),
                Some(WriteMode::Inline) => self.metrics.increment_inline_writes(),
                None => self.metrics.increment_reads(),
            }
        }
        for response in &response.responses {
            if response.is_replay() {
                self.metrics.increment_replays_detected();
            }
        }
        self.metrics.add_bytes_written(bytes);
    }

    fn record_failure(&self, err: EvalError) -> EvalError {
        self.metrics.increment_batches_failed();
        match &err {
            EvalError::LockConflict { locks } => self.metrics.add_lock_conflicts(locks.len() as u64),
            EvalError::WriteTooOld { .. } => self.metrics.increment_write_too_old(),
            EvalError::AmbiguousReplayRejected { .. } => self.metrics.increment_replays_rejected(),
            EvalError::Storage(_) => self.metrics.increment_storage_failures(),
            _ => {}
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcheval::{GetRequest, Header, PutRequest, Request, Response};
    use crate::config::ClusterSettings;
    use crate::kv::{Transaction, Value};
    use crate::mvcc::compute_stats;
    use crate::storage::{InMemoryEngine, Reader};

    fn replica() -> (Arc<InMemoryEngine>, Replica) {
        let engine = Arc::new(InMemoryEngine::new());
        let state = RangeState::new(RangeDescriptor::unbounded(1), Arc::new(ClusterSettings::new()));
        (Arc::clone(&engine), Replica::new(engine, state))
    }

    fn put(key: &str, value: &str) -> Request {
        Request::Put(PutRequest {
            key: Key::from(key),
            value: Value::from(value),
            inline: false,
            blind: false,
            sequence: None,
        })
    }

    #[tokio::test]
    async fn test_send_applies_writes_and_tracks_stats() {
        let (engine, replica) = replica();
        let header = Header::new(Timestamp::from_wall(10));
        replica
            .send(BatchRequest::new(header, vec![put("a", "1"), put("b", "2")]))
            .await
            .unwrap();

        let keys = engine.keys().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(replica.stats(), compute_stats(engine.as_ref(), &keys).unwrap());
        assert_eq!(replica.latches_held(), 0);

        let snapshot = replica.metrics();
        assert_eq!(snapshot.batches, 1);
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.regular_writes, 2);
        assert!(snapshot.bytes_written > 0);
    }

    #[tokio::test]
    async fn test_clock_stamps_local_timestamp_and_observes_batches() {
        let (engine, replica) = replica();
        let replica = replica.with_clock(Clock::with_physical(Box::new(|| 50)));
        replica
            .send(BatchRequest::single(Header::new(Timestamp::from_wall(100)), put("a", "v")))
            .await
            .unwrap();

        let (_, version) = engine.latest_version(&Key::from("a")).unwrap().unwrap();
        assert_eq!(version.local_timestamp, Some(Timestamp::from_wall(50)));
        assert!(replica.clock().now() > Timestamp::from_wall(100));

        let keys = engine.keys().unwrap();
        assert_eq!(replica.stats(), compute_stats(engine.as_ref(), &keys).unwrap());
    }

    #[tokio::test]
    async fn test_sender_local_timestamp_is_kept() {
        let (engine, replica) = replica();
        let mut header = Header::new(Timestamp::from_wall(100));
        header.now = Some(Timestamp::from_wall(70));
        replica
            .send(BatchRequest::single(header, put("a", "v")))
            .await
            .unwrap();

        let (_, version) = engine.latest_version(&Key::from("a")).unwrap().unwrap();
        assert_eq!(version.local_timestamp, Some(Timestamp::from_wall(70)));
    }

    #[tokio::test]
    async fn test_resolve_commits_intent() {
        let (engine, replica) = replica();
        let txn = Transaction::new("t", Timestamp::from_wall(10), 0);
        let header = Header::default().with_txn(txn.clone());
        replica
            .send(BatchRequest::single(header, put("a", "v")))
            .await
            .unwrap();

        let committed = IntentStatus::Committed {
            timestamp: Timestamp::from_wall(12),
        };
        assert!(replica.resolve_intent(&Key::from("a"), txn.id(), committed).await.unwrap());
        assert!(!replica.resolve_intent(&Key::from("a"), txn.id(), committed).await.unwrap());

        let read = BatchRequest::single(
            Header::new(Timestamp::from_wall(12)),
            Request::Get(GetRequest { key: Key::from("a") }),
        );
        let response = replica.send(read).await.unwrap();
        match &response.responses[0] {
            Response::Get(get) => assert_eq!(get.value, Some(Value::from("v"))),
            other => panic!("unexpected response: {:?}", other),
        }

        let keys = engine.keys().unwrap();
        assert_eq!(replica.stats(), compute_stats(engine.as_ref(), &keys).unwrap());
        assert_eq!(replica.metrics().intents_resolved, 1);
    }

    #[tokio::test]
    async fn test_failure_counters() {
        let (_engine, replica) = replica();
        replica
            .send(BatchRequest::single(Header::new(Timestamp::from_wall(20)), put("a", "new")))
            .await
            .unwrap();

        let err = replica
            .send(BatchRequest::single(Header::new(Timestamp::from_wall(10)), put("a", "old")))
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::WriteTooOld { .. }));

        let snapshot = replica.metrics();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.batches_failed, 1);
        assert_eq!(snapshot.write_too_old, 1);
    }
}
