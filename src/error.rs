//! # Error Types
//!
//! Custom error types for ctlscope using `thiserror`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ctlscope
#[derive(Debug, Error)]
pub enum CtlScopeError {
    /// Transport could not be opened (fatal at startup)
    #[error("Connection error: {0}")]
    Connection(String),

    /// A telemetry line failed to decode (per-line, dropped by the loop)
    #[error("Decode error: {0}")]
    Decode(String),

    /// The target log path already exists; existing logs are never overwritten
    #[error("Log file already exists: {0}")]
    LogExists(PathBuf),

    /// Replay log path does not exist
    #[error("Log file not found: {0}")]
    LogNotFound(PathBuf),

    /// Replay log file is not valid structured data
    #[error("Log parse error: {0}")]
    LogParse(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ctlscope
pub type Result<T> = std::result::Result<T, CtlScopeError>;
