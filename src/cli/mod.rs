//! CLI module for AeroKV
//!
//! Provides command-line interface for:
//! - eval: Evaluate a script against an in-memory range
//! - declare: Print the spans a script's batches declare

mod args;
mod commands;
mod errors;
mod io;
mod script;

pub use args::{Cli, Command};
pub use commands::{declare, declare_script, eval, load_config, run, run_command, run_script};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::{read_script, write_lines, write_stdout};
pub use script::{ResolveStep, Script, Step};
