//! # ctlscope Library
//!
//! Live monitor and logger for embedded control-system telemetry over serial.
//!
//! This library provides the core acquisition pipeline: CR-LF line framing
//! over a serial transport, fixed-point sample decoding, crash-recoverable
//! streaming JSON logs, and bounded per-channel time series for a pluggable
//! view sink. A replay mode rebuilds the same series from a finished log.

pub mod config;
pub mod error;
pub mod logfile;
pub mod monitor;
pub mod sample;
pub mod store;
pub mod transport;
