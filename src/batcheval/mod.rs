//! Command evaluation
//!
//! This module provides:
//! - `Request` / `BatchRequest` / `Header` - The request model
//! - `declare_isolated_write` / `declare_read` - Key-span declaration
//! - `Command` / `CommandRegistry` - Handlers keyed by request type
//! - `Evaluator` - Batch evaluation over a read-only snapshot
//! - `BatchResponse` / `CommandResult` - Responses and side effects
//!
//! # Flow
//!
//! ```text
//! BatchRequest
//!   -> declare (latch + lock spans)
//!   -> latches acquired by the caller
//!   -> evaluate (staged in one write batch)
//!   -> batch applied atomically by the caller
//! ```

mod cmd_conditional_put;
mod cmd_get;
mod cmd_put;
mod command;
mod declare;
mod errors;
mod evaluator;
mod range;
mod request;
mod result;

pub use cmd_conditional_put::ConditionalPutCommand;
pub use cmd_get::GetCommand;
pub use cmd_put::PutCommand;
pub use command::{Command, CommandArgs, CommandRegistry};
pub use declare::{declare_isolated_write, declare_read, DeclaredSpans, LockSpan, LockSpanSet};
pub use errors::{EvalError, EvalResult};
pub use evaluator::Evaluator;
pub use range::{RangeDescriptor, RangeState};
pub use request::{
    BatchRequest, ConditionalPutRequest, GetRequest, Header, Method, PutRequest, Request,
    WriteMode,
};
pub use result::{BatchResponse, CommandResult, GetResponse, PutResponse, Response};
