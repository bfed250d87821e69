//! ConditionalPut

use super::command::{mismatched, Command, CommandArgs};
use super::declare::{declare_isolated_write, DeclaredSpans};
use super::errors::EvalResult;
use super::request::{Header, Method, Request};
use super::result::{CommandResult, PutResponse, Response};
use crate::mvcc::{conditional_put, conditional_put_inline, Condition, MvccStats};

/// Writes a value if the key currently holds the expected one.
pub struct ConditionalPutCommand;

impl Command for ConditionalPutCommand {
    fn method(&self) -> Method {
        Method::ConditionalPut
    }

    fn declare_keys(
        &self,
        header: &Header,
        request: &Request,
        spans: &mut DeclaredSpans,
    ) -> EvalResult<()> {
        let Request::ConditionalPut(req) = request else {
            return Err(mismatched(self.method(), request));
        };
        declare_isolated_write(header, &req.key, req.inline, spans);
        Ok(())
    }

    fn eval(
        &self,
        args: CommandArgs<'_>,
        request: &Request,
    ) -> EvalResult<(Response, CommandResult)> {
        let Request::ConditionalPut(req) = request else {
            return Err(mismatched(self.method(), request));
        };

        let txn = args.header.txn_meta(req.sequence);
        let condition = Condition {
            expected: req.expected.as_ref(),
            allow_if_does_not_exist: req.allow_if_does_not_exist,
        };
        let mut stats = MvccStats::default();
        let opts = args.write_options(txn.as_ref(), &mut stats);

        let outcome = if req.inline {
            conditional_put_inline(args.rw, &req.key, req.value.clone(), condition, opts)?
        } else {
            conditional_put(
                args.rw,
                &req.key,
                args.header.write_timestamp(),
                req.value.clone(),
                condition,
                opts,
            )?
        };

        Ok((
            Response::ConditionalPut(PutResponse::from(&outcome)),
            CommandResult::from_write(stats, &outcome),
        ))
    }
}
