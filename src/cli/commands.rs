//! CLI command implementations
//!
//! Both commands run a script against a fresh in-memory range and
//! report one JSON line per step. A failing step does not stop the
//! script; its error is reported in its line.

use std::path::Path;
use std::sync::Arc;

use serde_json::{json, Value};

use crate::batcheval::{CommandRegistry, EvalError, Evaluator, RangeDescriptor};
use crate::config::{ClusterSettings, EvalConfig};
use crate::replica::Replica;
use crate::storage::InMemoryEngine;

use super::args::{Cli, Command};
use super::errors::{CliError, CliResult};
use super::io::{read_script, write_stdout};
use super::script::{Script, Step};

/// Entry point called by `main`
pub fn run() -> CliResult<()> {
    let cli = Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    let lines = match cmd {
        Command::Eval { script, config } => eval(&script, config.as_deref())?,
        Command::Declare { script, config } => declare(&script, config.as_deref())?,
    };
    write_stdout(&lines)
}

/// Load the configuration file, or defaults when none is given
pub fn load_config(path: Option<&Path>) -> CliResult<EvalConfig> {
    match path {
        Some(path) => Ok(EvalConfig::load(path)?),
        None => Ok(EvalConfig::default()),
    }
}

/// Evaluate every step of a script, returning the output lines
pub fn eval(script_path: &Path, config_path: Option<&Path>) -> CliResult<Vec<Value>> {
    let config = load_config(config_path)?;
    let script = read_script(script_path)?;

    let settings = Arc::new(ClusterSettings::new());
    config.apply(&settings);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime_error(format!("Failed to start runtime: {}", e)))?;
    Ok(runtime.block_on(run_script(&script, &config, settings)))
}

/// Evaluate `script` against a fresh in-memory range
pub async fn run_script(
    script: &Script,
    config: &EvalConfig,
    settings: Arc<ClusterSettings>,
) -> Vec<Value> {
    let replica = Replica::from_config(config, Arc::new(InMemoryEngine::new()), settings);
    let mut lines = Vec::with_capacity(script.steps.len() + 1);

    for (index, step) in script.steps.iter().enumerate() {
        let line = match step {
            Step::Batch(batch) => match replica.send(batch.clone()).await {
                Ok(response) => json!({
                    "step": index,
                    "status": "ok",
                    "responses": response.responses,
                    "stats": response.result.stats,
                    "acquired_locks": response.result.acquired_locks,
                }),
                Err(err) => error_line(index, &err),
            },
            Step::Resolve(resolve) => {
                match replica
                    .resolve_intent(&resolve.key, resolve.txn_id, resolve.status())
                    .await
                {
                    Ok(resolved) => json!({
                        "step": index,
                        "status": "ok",
                        "resolved": resolved,
                    }),
                    Err(err) => error_line(index, &err),
                }
            }
        };
        lines.push(line);
    }

    lines.push(json!({
        "status": "done",
        "stats": replica.stats(),
        "metrics": replica.metrics(),
    }));
    lines
}

/// Declare the spans of every batch step of a script
pub fn declare(script_path: &Path, config_path: Option<&Path>) -> CliResult<Vec<Value>> {
    let config = load_config(config_path)?;
    let script = read_script(script_path)?;
    Ok(declare_script(&script, &RangeDescriptor::from_config(&config.range)))
}

/// Declared spans of every batch step; resolve steps are skipped
pub fn declare_script(script: &Script, range: &RangeDescriptor) -> Vec<Value> {
    let registry = CommandRegistry::with_defaults();
    let evaluator = Evaluator::new(&registry);

    script
        .steps
        .iter()
        .enumerate()
        .filter_map(|(index, step)| match step {
            Step::Batch(batch) => Some(match evaluator.declare(batch, range) {
                Ok(spans) => json!({
                    "step": index,
                    "status": "ok",
                    "latches": spans.latches,
                    "locks": spans.locks,
                }),
                Err(err) => error_line(index, &err),
            }),
            Step::Resolve(_) => None,
        })
        .collect()
}

fn error_line(index: usize, err: &EvalError) -> Value {
    json!({
        "step": index,
        "status": "error",
        "code": err.code(),
        "message": err.to_string(),
        "retryable": err.is_retryable(),
        "locks": err.conflicting_locks(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(json: &str) -> Script {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_run_script_reports_each_step() {
        let script = script(
            r#"{ "steps": [
                { "step": "batch", "header": { "timestamp": { "wall_time": 20 } },
                  "requests": [ { "op": "put", "key": "a", "value": "v2" } ] },
                { "step": "batch", "header": { "timestamp": { "wall_time": 10 } },
                  "requests": [ { "op": "put", "key": "a", "value": "v1" } ] }
            ] }"#,
        );
        let lines = run_script(&script, &EvalConfig::default(), Arc::new(ClusterSettings::new())).await;

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["status"], "ok");
        assert_eq!(lines[0]["responses"][0]["op"], "put");
        assert_eq!(lines[1]["status"], "error");
        assert_eq!(lines[1]["code"], "AERO_EVAL_WRITE_TOO_OLD");
        assert_eq!(lines[1]["retryable"], true);
        assert_eq!(lines[2]["status"], "done");
        assert_eq!(lines[2]["metrics"]["batches_failed"], 1);
    }

    #[test]
    fn test_declare_script() {
        let script = script(
            r#"{ "steps": [
                { "step": "batch", "header": { "timestamp": { "wall_time": 10 } },
                  "requests": [ { "op": "put", "key": "a", "value": "v", "inline": true },
                                { "op": "get", "key": "b" } ] },
                { "step": "batch", "requests": [ { "op": "get", "key": "z" } ] }
            ] }"#,
        );
        let lines = declare_script(&script, &RangeDescriptor::new(1, "a", "m"));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["latches"].as_array().unwrap().len(), 2);
        assert_eq!(lines[0]["latches"][0]["access"], "read_write");
        assert_eq!(lines[0]["locks"].as_array().unwrap().len(), 1);
        assert_eq!(lines[1]["code"], "AERO_EVAL_KEY_OUTSIDE_RANGE");
    }
}
