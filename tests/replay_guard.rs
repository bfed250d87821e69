//! Replay Guard Tests
//!
//! A write re-delivered after an ambiguous outcome must not apply twice:
//! - Identical replays succeed without changing state or statistics
//! - Replays that differ from the recorded write are rejected
//! - Protection checks committed versions and recorded timestamps

use std::sync::Arc;

use aerokv::batcheval::{
    BatchRequest, BatchResponse, EvalError, Header, PutRequest, RangeDescriptor, RangeState,
    Request, Response,
};
use aerokv::config::ClusterSettings;
use aerokv::kv::{Key, Timestamp, Transaction, Value};
use aerokv::mvcc::{ReplayRejection, WriteTooOldPolicy};
use aerokv::replica::Replica;
use aerokv::storage::{InMemoryEngine, Reader};

fn ts(wall: i64) -> Timestamp {
    Timestamp::from_wall(wall)
}

fn replica() -> (Arc<InMemoryEngine>, Replica) {
    let engine = Arc::new(InMemoryEngine::new());
    let state = RangeState::new(RangeDescriptor::unbounded(1), Arc::new(ClusterSettings::new()));
    (engine.clone(), Replica::new(engine, state))
}

fn write(key: &str, value: &str, blind: bool, sequence: Option<u32>) -> Request {
    Request::Put(PutRequest {
        key: Key::from(key),
        value: Value::from(value),
        inline: false,
        blind,
        sequence,
    })
}

fn put_response(response: &BatchResponse) -> (Timestamp, bool) {
    match &response.responses[0] {
        Response::Put(put) => (put.write_timestamp, put.replayed),
        other => panic!("unexpected response: {:?}", other),
    }
}

fn rejection(err: EvalError) -> ReplayRejection {
    match err {
        EvalError::AmbiguousReplayRejected { reason, .. } => reason,
        other => panic!("unexpected error: {:?}", other),
    }
}

// =============================================================================
// Identical Replays
// =============================================================================

/// A transactional write replayed with protection returns the original
/// outcome and leaves statistics unchanged.
#[tokio::test]
async fn test_transactional_replay_is_no_op() {
    let (engine, replica) = replica();
    let txn = Transaction::new("T", ts(100), 0).with_sequence(1);
    let header = Header::default()
        .with_txn(txn.clone())
        .with_replay_protection(true);
    let batch = BatchRequest::single(header, write("a", "1", false, None));

    let first = replica.send(batch.clone()).await.unwrap();
    let stats = replica.stats();
    let intent = engine.get_intent(&Key::from("a")).unwrap();

    let second = replica.send(batch).await.unwrap();
    assert_eq!(put_response(&first), (ts(100), false));
    assert_eq!(put_response(&second), (ts(100), true));
    assert_eq!(first.result.acquired_locks, second.result.acquired_locks);
    assert!(second.result.stats.is_zero());
    assert!(second.write_batch.is_empty());
    assert_eq!(replica.stats(), stats);
    assert_eq!(engine.get_intent(&Key::from("a")).unwrap(), intent);
    assert_eq!(replica.metrics().replays_detected, 1);
}

/// An earlier sequence replays against the intent history.
#[tokio::test]
async fn test_earlier_sequence_replays_against_history() {
    let (_engine, replica) = replica();
    let txn = Transaction::new("T", ts(100), 0);
    let header = Header::default().with_txn(txn);

    replica
        .send(BatchRequest::single(header.clone(), write("a", "s1", false, Some(1))))
        .await
        .unwrap();
    replica
        .send(BatchRequest::single(header.clone(), write("a", "s2", false, Some(2))))
        .await
        .unwrap();

    let replayed = replica
        .send(BatchRequest::single(header.clone(), write("a", "s1", false, Some(1))))
        .await
        .unwrap();
    assert!(put_response(&replayed).1);

    let err = replica
        .send(BatchRequest::single(header, write("a", "other", false, Some(1))))
        .await
        .unwrap_err();
    assert_eq!(rejection(err), ReplayRejection::PayloadMismatch);
}

/// A non-transactional write replayed with protection finds its
/// committed version.
#[tokio::test]
async fn test_committed_replay_is_no_op() {
    let (engine, replica) = replica();
    let header = Header::new(ts(50)).with_replay_protection(true);
    let batch = BatchRequest::single(header.clone(), write("a", "v", false, None));

    replica.send(batch.clone()).await.unwrap();
    let replayed = replica.send(batch).await.unwrap();
    assert_eq!(put_response(&replayed), (ts(50), true));
    assert_eq!(engine.versions(&Key::from("a")).unwrap().len(), 1);

    let err = replica
        .send(BatchRequest::single(header, write("a", "changed", false, None)))
        .await
        .unwrap_err();
    assert_eq!(rejection(err), ReplayRejection::PayloadMismatch);
}

/// Without protection the same non-transactional write is too old.
#[tokio::test]
async fn test_unprotected_committed_rewrite_is_too_old() {
    let (_engine, replica) = replica();
    let batch = BatchRequest::single(Header::new(ts(50)), write("a", "v", false, None));
    replica.send(batch.clone()).await.unwrap();
    let err = replica.send(batch).await.unwrap_err();
    assert!(matches!(err, EvalError::WriteTooOld { .. }));
}

// =============================================================================
// Rejected Replays
// =============================================================================

/// With protection, a replay at a different timestamp is rejected.
#[tokio::test]
async fn test_replay_at_changed_timestamp_rejected() {
    let (_engine, replica) = replica();
    let txn = Transaction::new("T", ts(100), 0);

    replica
        .send(BatchRequest::single(
            Header::default().with_txn(txn.clone()),
            write("a", "v", false, None),
        ))
        .await
        .unwrap();

    let moved = Header::new(ts(120))
        .with_txn(txn.clone())
        .with_replay_protection(true);
    let err = replica
        .send(BatchRequest::single(moved, write("a", "v", false, None)))
        .await
        .unwrap_err();
    assert_eq!(
        rejection(err),
        ReplayRejection::TimestampChanged {
            recorded: ts(100),
            requested: ts(120),
        }
    );

    // Without protection the same replay is accepted at the recorded timestamp.
    let unprotected = Header::new(ts(120)).with_txn(txn);
    let response = replica
        .send(BatchRequest::single(unprotected, write("a", "v", false, None)))
        .await
        .unwrap();
    assert_eq!(put_response(&response), (ts(100), true));
    assert_eq!(replica.metrics().replays_rejected, 1);
}

/// A sequence the intent never recorded cannot be replayed.
#[tokio::test]
async fn test_missing_sequence_rejected() {
    let (_engine, replica) = replica();
    let header = Header::default().with_txn(Transaction::new("T", ts(100), 0));

    replica
        .send(BatchRequest::single(header.clone(), write("a", "s3", false, Some(3))))
        .await
        .unwrap();
    let err = replica
        .send(BatchRequest::single(header, write("a", "s2", false, Some(2))))
        .await
        .unwrap_err();
    assert_eq!(rejection(err), ReplayRejection::MissingSequence { sequence: 2 });
}

// =============================================================================
// Blind Replays
// =============================================================================

/// Blind writes still honor replay protection.
#[tokio::test]
async fn test_blind_write_respects_replay_protection() {
    let (engine, replica) = replica();
    let header = Header::new(ts(70)).with_replay_protection(true);
    let batch = BatchRequest::single(header.clone(), write("b", "v", true, None));

    replica.send(batch.clone()).await.unwrap();
    let replayed = replica.send(batch).await.unwrap();
    assert_eq!(put_response(&replayed), (ts(70), true));
    assert_eq!(engine.versions(&Key::from("b")).unwrap().len(), 1);

    let err = replica
        .send(BatchRequest::single(header, write("b", "other", true, None)))
        .await
        .unwrap_err();
    assert_eq!(rejection(err), ReplayRejection::PayloadMismatch);
}

// =============================================================================
// Write-Too-Old Interaction
// =============================================================================

/// With the push policy, a protected write below a committed version is
/// rejected instead of pushed, so resending it can never apply twice.
#[tokio::test]
async fn test_protected_write_is_never_pushed() {
    let engine = Arc::new(InMemoryEngine::new());
    let settings = Arc::new(ClusterSettings::new());
    settings.set_write_too_old_policy(WriteTooOldPolicy::Push);
    let state = RangeState::new(RangeDescriptor::unbounded(1), settings);
    let replica = Replica::new(engine.clone(), state);

    replica
        .send(BatchRequest::single(Header::new(ts(150)), write("a", "other", false, None)))
        .await
        .unwrap();
    let stats = replica.stats();

    let protected = Header::new(ts(100)).with_replay_protection(true);
    let batch = BatchRequest::single(protected, write("a", "v", false, None));
    for _ in 0..2 {
        let err = replica.send(batch.clone()).await.unwrap_err();
        assert!(matches!(err, EvalError::WriteTooOld { .. }));
    }
    assert_eq!(engine.versions(&Key::from("a")).unwrap().len(), 1);
    assert_eq!(replica.stats(), stats);

    // Unprotected writes are still pushed.
    let pushed = replica
        .send(BatchRequest::single(Header::new(ts(100)), write("a", "v", false, None)))
        .await
        .unwrap();
    assert_eq!(put_response(&pushed), (ts(150).next(), false));
}
