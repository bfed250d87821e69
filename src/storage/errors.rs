//! Storage error types
//!
//! Error codes:
//! - AERO_STORAGE_IO_ERROR (ERROR severity)
//! - AERO_STORAGE_WRITE_FAILED (ERROR severity)
//! - AERO_STORAGE_READ_FAILED (ERROR severity)
//! - AERO_DATA_CORRUPTION (FATAL severity)
//!
//! Storage errors terminate the evaluation of the current request. The
//! evaluation core never recovers from them locally; they are propagated
//! unchanged to the caller.

use std::fmt;
use std::io;

use crate::kv::Key;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Evaluation fails, range continues serving
    Error,
    /// Range must stop serving
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Storage-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Engine I/O failure
    AeroStorageIoError,
    /// Applying a write batch failed
    AeroStorageWriteFailed,
    /// Reading engine state failed
    AeroStorageReadFailed,
    /// Checksum or structural corruption
    AeroDataCorruption,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::AeroStorageIoError => "AERO_STORAGE_IO_ERROR",
            StorageErrorCode::AeroStorageWriteFailed => "AERO_STORAGE_WRITE_FAILED",
            StorageErrorCode::AeroStorageReadFailed => "AERO_STORAGE_READ_FAILED",
            StorageErrorCode::AeroDataCorruption => "AERO_DATA_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::AeroStorageIoError => Severity::Error,
            StorageErrorCode::AeroStorageWriteFailed => Severity::Error,
            StorageErrorCode::AeroStorageReadFailed => Severity::Error,
            StorageErrorCode::AeroDataCorruption => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with code, message and optional context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    details: Option<String>,
    source: Option<io::Error>,
}

impl StorageError {
    /// Create a new storage I/O error
    pub fn io_error(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageIoError,
            message: message.into(),
            details: None,
            source: Some(source),
        }
    }

    /// Create a write failed error without an I/O source
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageWriteFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a read failed error without an I/O source
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroStorageReadFailed,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a data corruption error (FATAL)
    pub fn data_corruption(message: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroDataCorruption,
            message: message.into(),
            details: None,
            source: None,
        }
    }

    /// Create a data corruption error with key context
    pub fn corruption_for_key(key: &Key, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::AeroDataCorruption,
            message: reason.into(),
            details: Some(format!("key: {}", key)),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns additional error details
    pub fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Returns whether this error is fatal
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )?;
        if let Some(ref details) = self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        Self::io_error("engine I/O failed", e)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
