//! Command handlers
//!
//! Each request type is served by one `Command`, registered under its
//! `Method`. The evaluator dispatches through the registry, so adding a
//! request type never touches the evaluator.

use std::collections::HashMap;

use super::cmd_conditional_put::ConditionalPutCommand;
use super::cmd_get::GetCommand;
use super::cmd_put::PutCommand;
use super::declare::DeclaredSpans;
use super::errors::{EvalError, EvalResult};
use super::range::RangeState;
use super::request::{Header, Method, Request};
use super::result::{CommandResult, Response};
use crate::kv::TxnMeta;
use crate::mvcc::{MvccStats, WriteOptions};
use crate::storage::ReadWriter;

/// Everything a command may touch while evaluating one request.
pub struct CommandArgs<'a> {
    /// Staging batch; reads observe earlier writes of the same batch.
    pub rw: &'a mut dyn ReadWriter,
    pub range: &'a RangeState,
    pub header: &'a Header,
}

impl CommandArgs<'_> {
    /// Write options derived from the header and live settings.
    pub fn write_options<'o>(
        &self,
        txn: Option<&'o TxnMeta>,
        stats: &'o mut MvccStats,
    ) -> WriteOptions<'o> {
        WriteOptions {
            txn,
            local_timestamp: self.header.now,
            stats: Some(stats),
            replay_protection: self.header.ambiguous_replay_protection,
            write_too_old: self.range.settings().write_too_old_policy(),
            max_lock_conflicts: self.range.settings().max_lock_conflicts(),
        }
    }
}

/// Handler for one request type.
pub trait Command: Send + Sync {
    fn method(&self) -> Method;

    /// Declares the latches and locks `request` needs.
    fn declare_keys(
        &self,
        header: &Header,
        request: &Request,
        spans: &mut DeclaredSpans,
    ) -> EvalResult<()>;

    /// Evaluates `request`, staging its writes through `args.rw`.
    fn eval(&self, args: CommandArgs<'_>, request: &Request)
        -> EvalResult<(Response, CommandResult)>;
}

/// Error for a request routed to the wrong handler.
pub(crate) fn mismatched(command: Method, request: &Request) -> EvalError {
    EvalError::UnsupportedRequest(format!(
        "{} handler cannot evaluate a {} request",
        command.as_str(),
        request.method().as_str()
    ))
}

/// Lookup from request type to handler.
pub struct CommandRegistry {
    commands: HashMap<Method, Box<dyn Command>>,
}

impl CommandRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// A registry serving every built-in request type.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PutCommand));
        registry.register(Box::new(ConditionalPutCommand));
        registry.register(Box::new(GetCommand));
        registry
    }

    /// Registers `command`, replacing any handler for the same method.
    pub fn register(&mut self, command: Box<dyn Command>) {
        self.commands.insert(command.method(), command);
    }

    pub fn lookup(&self, method: Method) -> EvalResult<&dyn Command> {
        self.commands
            .get(&method)
            .map(|command| command.as_ref())
            .ok_or_else(|| {
                EvalError::UnsupportedRequest(format!("no handler for {}", method.as_str()))
            })
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
