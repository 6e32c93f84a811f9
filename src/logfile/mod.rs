//! # Log File Module
//!
//! Durable persistence of the decoded sample stream.
//!
//! This module handles:
//! - Streaming, crash-recoverable appends to a JSON log file
//! - Finalizing the file into valid JSON on shutdown
//! - Loading finished logs for offline replay

pub mod replay;
pub mod writer;

pub use replay::LogFile;
pub use writer::LogWriter;

/// Log container format version
pub const LOG_VERSION: &str = "0.0.0";
