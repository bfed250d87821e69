//! Put

use super::command::{mismatched, Command, CommandArgs};
use super::declare::{declare_isolated_write, DeclaredSpans};
use super::errors::EvalResult;
use super::request::{Header, Method, Request};
use super::result::{CommandResult, PutResponse, Response};
use crate::mvcc::{blind_put, put, put_inline, MvccStats};

/// Writes a value, inline, blind or regular.
pub struct PutCommand;

impl Command for PutCommand {
    fn method(&self) -> Method {
        Method::Put
    }

    fn declare_keys(
        &self,
        header: &Header,
        request: &Request,
        spans: &mut DeclaredSpans,
    ) -> EvalResult<()> {
        let Request::Put(req) = request else {
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
        let Request::Put(req) = request else {
            return Err(mismatched(self.method(), request));
        };

        let txn = args.header.txn_meta(req.sequence);
        let timestamp = args.header.write_timestamp();
        let mut stats = MvccStats::default();
        let opts = args.write_options(txn.as_ref(), &mut stats);

        let outcome = if req.inline {
            put_inline(args.rw, &req.key, req.value.clone(), opts)?
        } else if req.blind {
            blind_put(args.rw, &req.key, timestamp, req.value.clone(), opts)?
        } else {
            put(args.rw, &req.key, timestamp, req.value.clone(), opts)?
        };

        Ok((
            Response::Put(PutResponse::from(&outcome)),
            CommandResult::from_write(stats, &outcome),
        ))
    }
}
