//! JSON I/O handling for CLI
//!
//! - Input: one JSON script file
//! - Output: one JSON object per line on stdout
//! - UTF-8 only

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde_json::Value;

use super::errors::{CliError, CliResult};
use super::script::Script;

/// Read and parse a script file
pub fn read_script(path: &Path) -> CliResult<Script> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::io_error(format!("Failed to read script {}: {}", path.display(), e))
    })?;

    if content.trim().is_empty() {
        return Err(CliError::script_error("Empty script"));
    }

    serde_json::from_str(&content)
        .map_err(|e| CliError::script_error(format!("Invalid script JSON: {}", e)))
}

/// Write output lines to `out`, one JSON object per line
pub fn write_lines(out: &mut impl Write, lines: &[Value]) -> CliResult<()> {
    for line in lines {
        serde_json::to_writer(&mut *out, line)?;
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

/// Write output lines to stdout
pub fn write_stdout(lines: &[Value]) -> CliResult<()> {
    let stdout = io::stdout();
    let mut lock = stdout.lock();
    write_lines(&mut lock, lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_write_lines() {
        let mut out = Vec::new();
        write_lines(&mut out, &[json!({"a": 1}), json!({"b": 2})]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "{\"a\":1}\n{\"b\":2}\n");
    }

    #[test]
    fn test_read_empty_script() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = read_script(file.path()).unwrap_err();
        assert_eq!(err.code_str(), "AERO_CLI_SCRIPT_ERROR");
    }
}
