//! Configuration errors

use std::fmt;
use std::io;

/// Configuration error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// Configuration file could not be read
    ReadFailed,
    /// Configuration file is not valid JSON for `EvalConfig`
    Parse,
    /// A setting has an invalid value
    Invalid,
}

impl ConfigErrorCode {
    /// Get the error code string
    pub fn code(&self) -> &'static str {
        match self {
            Self::ReadFailed => "AERO_CONFIG_READ_FAILED",
            Self::Parse => "AERO_CONFIG_PARSE_ERROR",
            Self::Invalid => "AERO_CONFIG_INVALID",
        }
    }
}

/// Configuration error
#[derive(Debug)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    pub fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::Invalid, msg)
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<io::Error> for ConfigError {
    fn from(e: io::Error) -> Self {
        Self::new(ConfigErrorCode::ReadFailed, format!("Failed to read config: {}", e))
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::new(ConfigErrorCode::Parse, format!("Invalid config JSON: {}", e))
    }
}

/// Config result type
pub type ConfigResult<T> = Result<T, ConfigError>;
