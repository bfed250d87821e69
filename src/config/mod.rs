//! Evaluation configuration
//!
//! `EvalConfig` is loaded from a JSON file and validated once. Its
//! settings are applied to a `ClusterSettings`, which evaluations read
//! on every call.
//!
//! ```json
//! {
//!   "max_lock_conflicts": 0,
//!   "write_too_old_policy": "reject",
//!   "log_level": "info",
//!   "range": { "range_id": 1, "start_key": "", "end_key": "" }
//! }
//! ```

mod errors;
mod settings;

pub use errors::{ConfigError, ConfigErrorCode, ConfigResult};
pub use settings::{ClusterSettings, SettingsProvider};

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::kv::Key;
use crate::mvcc::WriteTooOldPolicy;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

/// Bounds of the range served.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeConfig {
    #[serde(default = "default_range_id")]
    pub range_id: u64,
    /// Inclusive start key.
    #[serde(default)]
    pub start_key: Key,
    /// Exclusive end key; empty means unbounded.
    #[serde(default)]
    pub end_key: Key,
}

fn default_range_id() -> u64 {
    1
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RangeConfig {
    fn default() -> Self {
        Self {
            range_id: default_range_id(),
            start_key: Key::default(),
            end_key: Key::default(),
        }
    }
}

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Conflicting locks collected before a batch fails (0 = unbounded)
    #[serde(default)]
    pub max_lock_conflicts: u64,

    /// Handling of writes below a committed version (default "reject")
    #[serde(default)]
    pub write_too_old_policy: WriteTooOldPolicy,

    /// Minimum log severity (default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub range: RangeConfig,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            max_lock_conflicts: 0,
            write_too_old_policy: WriteTooOldPolicy::default(),
            log_level: default_log_level(),
            range: RangeConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Load and validate configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        let config: EvalConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.severity().is_none() {
            return Err(ConfigError::invalid(format!(
                "Invalid log_level: '{}'",
                self.log_level
            )));
        }

        let range = &self.range;
        if !range.end_key.is_empty() && range.start_key >= range.end_key {
            return Err(ConfigError::invalid(format!(
                "range start_key {} must sort before end_key {}",
                range.start_key, range.end_key
            )));
        }

        Ok(())
    }

    /// The configured log severity.
    pub fn severity(&self) -> Option<Severity> {
        Severity::parse(&self.log_level)
    }

    /// Applies process-wide settings: logging and `settings`.
    pub fn apply(&self, settings: &ClusterSettings) {
        if let Some(severity) = self.severity() {
            Logger::set_min_severity(severity);
        }
        settings.apply(self);

        let range_id = self.range.range_id.to_string();
        let max_lock_conflicts = self.max_lock_conflicts.to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[
                ("range_id", range_id.as_str()),
                ("max_lock_conflicts", max_lock_conflicts.as_str()),
                ("write_too_old_policy", self.write_too_old_policy.as_str()),
            ],
        );
    }
}
