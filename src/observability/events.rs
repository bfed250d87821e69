//! Observability events
//!
//! Events are explicit and typed. Contention outcomes (lock conflicts,
//! latch waits) are expected under load and log at TRACE; storage
//! failures are exceptional and log at ERROR.

use std::fmt;

use super::Severity;

/// Observable events of the evaluation core
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded and applied
    ConfigLoaded,

    // Evaluation
    /// A batch entered evaluation
    EvalBegin,
    /// A batch finished evaluation successfully
    EvalComplete,

    // Contention
    /// A request was blocked by another transaction's intent
    LockConflict,
    /// A batch waited for a latch held by an overlapping batch
    LatchWait,
    /// A committed version prevented a write at its timestamp
    WriteTooOld,

    // Replay
    /// A re-applied write was recognized and skipped
    ReplayDetected,
    /// A re-applied write could not be proven identical
    ReplayRejected,

    // Resolution
    /// An intent was committed or discarded
    IntentResolved,

    // Storage
    /// The storage engine failed
    StorageFailure,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::EvalBegin => "EVAL_BEGIN",
            Event::EvalComplete => "EVAL_COMPLETE",
            Event::LockConflict => "LOCK_CONFLICT",
            Event::LatchWait => "LATCH_WAIT",
            Event::WriteTooOld => "WRITE_TOO_OLD",
            Event::ReplayDetected => "REPLAY_DETECTED",
            Event::ReplayRejected => "REPLAY_REJECTED",
            Event::IntentResolved => "INTENT_RESOLVED",
            Event::StorageFailure => "STORAGE_FAILURE",
        }
    }

    /// Severity the event is logged at.
    pub fn severity(&self) -> Severity {
        match self {
            Event::EvalBegin | Event::LockConflict | Event::LatchWait | Event::WriteTooOld => {
                Severity::Trace
            }
            Event::StorageFailure => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
