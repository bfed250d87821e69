//! Get

use super::command::{mismatched, Command, CommandArgs};
use super::declare::{declare_read, DeclaredSpans};
use super::errors::EvalResult;
use super::request::{Header, Method, Request};
use super::result::{CommandResult, GetResponse, Response};
use crate::mvcc::{get, ReadOptions};

/// Reads a key at the header's read timestamp.
pub struct GetCommand;

impl Command for GetCommand {
    fn method(&self) -> Method {
        Method::Get
    }

    fn declare_keys(
        &self,
        header: &Header,
        request: &Request,
        spans: &mut DeclaredSpans,
    ) -> EvalResult<()> {
        let Request::Get(req) = request else {
            return Err(mismatched(self.method(), request));
        };
        declare_read(header, &req.key, spans);
        Ok(())
    }

    fn eval(
        &self,
        args: CommandArgs<'_>,
        request: &Request,
    ) -> EvalResult<(Response, CommandResult)> {
        let Request::Get(req) = request else {
            return Err(mismatched(self.method(), request));
        };

        let txn = args.header.txn.as_ref().map(|txn| &txn.meta);
        let value = get(
            &*args.rw,
            &req.key,
            args.header.read_timestamp(),
            ReadOptions { txn },
        )?;

        Ok((
            Response::Get(GetResponse { value }),
            CommandResult::default(),
        ))
    }
}
