//! Batch evaluator
//!
//! Evaluates a batch against a read-only snapshot, staging every write
//! in one batch. The caller applies the batch atomically once it holds
//! the latches the batch declared; on error nothing is staged.

use super::command::{CommandArgs, CommandRegistry};
use super::declare::DeclaredSpans;
use super::errors::{EvalError, EvalResult};
use super::range::{RangeDescriptor, RangeState};
use super::request::{BatchRequest, Request};
use super::result::{BatchResponse, CommandResult};
use crate::lock::LockConflictCollector;
use crate::observability::{log_event_with_fields, Event};
use crate::storage::{Batch, Reader};

/// Dispatches batches to registered command handlers.
pub struct Evaluator<'r> {
    registry: &'r CommandRegistry,
}

impl<'r> Evaluator<'r> {
    pub fn new(registry: &'r CommandRegistry) -> Self {
        Self { registry }
    }

    /// Declares the latches and locks of every request in `batch`.
    pub fn declare(&self, batch: &BatchRequest, range: &RangeDescriptor) -> EvalResult<DeclaredSpans> {
        let mut spans = DeclaredSpans::new();
        for request in &batch.requests {
            check_in_range(request, range)?;
            self.registry
                .lookup(request.method())?
                .declare_keys(&batch.header, request, &mut spans)?;
        }
        Ok(spans)
    }

    /// Evaluates `batch` over `reader`.
    ///
    /// Lock conflicts do not stop evaluation immediately: conflicts are
    /// collected across requests until the range's configured bound is
    /// reached, then reported together. Any other error fails the batch
    /// at once.
    pub fn evaluate<R: Reader + ?Sized>(
        &self,
        reader: &R,
        range: &RangeState,
        batch: &BatchRequest,
    ) -> EvalResult<BatchResponse> {
        let range_id = range.range_id().to_string();
        let request_count = batch.requests.len().to_string();
        log_event_with_fields(
            Event::EvalBegin,
            &[
                ("range_id", range_id.as_str()),
                ("requests", request_count.as_str()),
            ],
        );

        let mut conflicts = LockConflictCollector::new(range.settings().max_lock_conflicts());
        let mut rw = Batch::new(reader);
        let mut responses = Vec::with_capacity(batch.requests.len());
        let mut result = CommandResult::default();

        for request in &batch.requests {
            check_in_range(request, range.descriptor())?;
            let command = self.registry.lookup(request.method())?;
            let args = CommandArgs {
                rw: &mut rw,
                range,
                header: &batch.header,
            };

            match command.eval(args, request) {
                Ok((response, command_result)) => {
                    if response.is_replay() {
                        log_event_with_fields(
                            Event::ReplayDetected,
                            &[("key", request.key().to_string().as_str())],
                        );
                    }
                    responses.push(response);
                    result.merge(command_result);
                }
                Err(EvalError::LockConflict { locks }) => {
                    for lock in &locks {
                        log_event_with_fields(
                            Event::LockConflict,
                            &[("lock", lock.to_string().as_str())],
                        );
                    }
                    if conflicts.add(locks) {
                        break;
                    }
                }
                Err(err) => {
                    log_failure(request, &err);
                    return Err(err);
                }
            }
        }

        if !conflicts.is_empty() {
            return Err(EvalError::LockConflict {
                locks: conflicts.into_locks(),
            });
        }

        let write_batch = rw.into_write_batch();
        let staged = write_batch.len().to_string();
        log_event_with_fields(
            Event::EvalComplete,
            &[("range_id", range_id.as_str()), ("staged", staged.as_str())],
        );

        Ok(BatchResponse {
            responses,
            result,
            write_batch,
        })
    }
}

fn check_in_range(request: &Request, range: &RangeDescriptor) -> EvalResult<()> {
    if range.contains_key(request.key()) {
        Ok(())
    } else {
        Err(EvalError::KeyOutsideRange {
            key: request.key().clone(),
            range_id: range.range_id,
        })
    }
}

fn log_failure(request: &Request, err: &EvalError) {
    let event = match err {
        EvalError::WriteTooOld { .. } => Event::WriteTooOld,
        EvalError::AmbiguousReplayRejected { .. } => Event::ReplayRejected,
        EvalError::Storage(_) => Event::StorageFailure,
        _ => return,
    };
    log_event_with_fields(
        event,
        &[
            ("key", request.key().to_string().as_str()),
            ("code", err.code()),
            ("error", err.to_string().as_str()),
        ],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batcheval::request::{GetRequest, Header, PutRequest};
    use crate::batcheval::result::{GetResponse, Response};
    use crate::config::ClusterSettings;
    use crate::kv::{Key, Timestamp, Transaction, Value};
    use crate::storage::{Engine, InMemoryEngine};
    use std::sync::Arc;

    fn range_state(max_conflicts: u64) -> RangeState {
        let settings = ClusterSettings::new();
        settings.set_max_lock_conflicts(max_conflicts);
        RangeState::new(RangeDescriptor::new(1, "a", "m"), Arc::new(settings))
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

    fn write_intent(engine: &InMemoryEngine, registry: &CommandRegistry, key: &str) {
        let txn = Transaction::new("holder", Timestamp::from_wall(5), 0);
        let batch = BatchRequest::single(Header::default().with_txn(txn), put(key, "locked"));
        let response = Evaluator::new(registry)
            .evaluate(engine, &range_state(0), &batch)
            .unwrap();
        engine.apply(response.write_batch).unwrap();
    }

    #[test]
    fn test_batch_reads_its_own_writes() {
        let engine = InMemoryEngine::new();
        let registry = CommandRegistry::with_defaults();
        let batch = BatchRequest::new(
            Header::new(Timestamp::from_wall(10)),
            vec![
                put("b", "v1"),
                Request::Get(GetRequest { key: Key::from("b") }),
            ],
        );

        let response = Evaluator::new(&registry)
            .evaluate(&engine, &range_state(0), &batch)
            .unwrap();
        assert_eq!(response.responses.len(), 2);
        assert_eq!(
            response.responses[1],
            Response::Get(GetResponse {
                value: Some(Value::from("v1"))
            })
        );
        assert_eq!(response.write_batch.len(), 1);
        assert_eq!(response.result.stats.key_count, 1);
        assert!(engine.keys().unwrap().is_empty());
    }

    #[test]
    fn test_conflicts_collected_across_requests() {
        let engine = InMemoryEngine::new();
        let registry = CommandRegistry::with_defaults();
        write_intent(&engine, &registry, "b");
        write_intent(&engine, &registry, "c");
        write_intent(&engine, &registry, "d");

        let batch = BatchRequest::new(
            Header::new(Timestamp::from_wall(10)),
            vec![put("b", "x"), put("c", "x"), put("d", "x")],
        );

        let err = Evaluator::new(&registry)
            .evaluate(&engine, &range_state(0), &batch)
            .unwrap_err();
        assert_eq!(err.conflicting_locks().unwrap().len(), 3);

        let err = Evaluator::new(&registry)
            .evaluate(&engine, &range_state(2), &batch)
            .unwrap_err();
        let locks = err.conflicting_locks().unwrap();
        assert_eq!(locks.len(), 2);
        assert_eq!(locks[0].key, Key::from("b"));
        assert_eq!(locks[1].key, Key::from("c"));
    }

    #[test]
    fn test_key_outside_range() {
        let engine = InMemoryEngine::new();
        let registry = CommandRegistry::with_defaults();
        let batch = BatchRequest::single(Header::new(Timestamp::from_wall(10)), put("z", "v"));
        let evaluator = Evaluator::new(&registry);

        let err = evaluator.evaluate(&engine, &range_state(0), &batch).unwrap_err();
        assert!(matches!(err, EvalError::KeyOutsideRange { range_id: 1, .. }));

        let err = evaluator
            .declare(&batch, &RangeDescriptor::new(1, "a", "m"))
            .unwrap_err();
        assert_eq!(err.code(), "AERO_EVAL_KEY_OUTSIDE_RANGE");
    }

    #[test]
    fn test_declare_collects_all_requests() {
        let registry = CommandRegistry::with_defaults();
        let batch = BatchRequest::new(
            Header::new(Timestamp::from_wall(10)),
            vec![
                put("b", "v"),
                Request::Get(GetRequest { key: Key::from("c") }),
            ],
        );
        let spans = Evaluator::new(&registry)
            .declare(&batch, &RangeDescriptor::unbounded(1))
            .unwrap();
        assert_eq!(spans.write_spans().count(), 1);
        assert_eq!(spans.read_spans().count(), 1);
        assert_eq!(spans.lock_spans().len(), 2);
    }

    #[test]
    fn test_storage_failure_fails_batch() {
        let engine = InMemoryEngine::new();
        engine.set_read_failure(true);
        let registry = CommandRegistry::with_defaults();
        let batch = BatchRequest::single(Header::new(Timestamp::from_wall(10)), put("b", "v"));

        let err = Evaluator::new(&registry)
            .evaluate(&engine, &range_state(0), &batch)
            .unwrap_err();
        assert!(matches!(err, EvalError::Storage(_)));
    }
}
