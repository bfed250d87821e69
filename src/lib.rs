//! aerokv - Per-range MVCC command evaluation
//!
//! A range evaluates batches of requests against a snapshot of its
//! storage engine and produces an atomic write batch:
//!
//! - `batcheval` declares spans and evaluates requests
//! - `mvcc` implements the versioned write and read paths
//! - `lock` manages intents held by transactions
//! - `spanlatch` isolates concurrent evaluations
//! - `replica` drives the whole flow for one range

pub mod batcheval;
pub mod cli;
pub mod config;
pub mod kv;
pub mod lock;
pub mod mvcc;
pub mod observability;
pub mod replica;
pub mod spanlatch;
pub mod storage;
