//! Observability subsystem
//!
//! This module provides:
//! - Structured logging (JSON lines)
//! - Typed events
//! - Evaluation counters
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on evaluation
//! 3. No async or background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use aerokv::observability::{log_event_with_fields, Event, EvalMetrics};
//!
//! log_event_with_fields(Event::LockConflict, &[("key", "a")]);
//!
//! let metrics = EvalMetrics::new();
//! metrics.increment_requests();
//! ```

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{EvalMetrics, MetricsSnapshot};

/// Log an event at its own severity
pub fn log_event(event: Event) {
    Logger::log(event.severity(), event.as_str(), &[]);
}

/// Log an event with fields at its own severity
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(event.severity(), event.as_str(), fields);
}
