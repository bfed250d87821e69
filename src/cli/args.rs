//! CLI argument definitions using clap
//!
//! Commands:
//! - aerokv eval --script <path> [--config <path>]
//! - aerokv declare --script <path> [--config <path>]

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// AeroKV - per-range MVCC command evaluation
#[derive(Parser, Debug)]
#[command(name = "aerokv")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Evaluate a script against an in-memory range
    Eval {
        /// Path to the JSON script
        #[arg(long)]
        script: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the spans each batch of a script declares
    Declare {
        /// Path to the JSON script
        #[arg(long)]
        script: PathBuf,

        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_eval() {
        let cli = Cli::try_parse_from(["aerokv", "eval", "--script", "s.json"]).unwrap();
        match cli.command {
            Command::Eval { script, config } => {
                assert_eq!(script, PathBuf::from("s.json"));
                assert!(config.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_script_is_required() {
        assert!(Cli::try_parse_from(["aerokv", "declare"]).is_err());
    }
}
