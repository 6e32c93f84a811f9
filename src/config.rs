//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::sample::Schema;
use crate::transport::DEFAULT_BAUD_RATE;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Serial transport; absent means replay mode
    #[serde(default)]
    pub serial: Option<SerialConfig>,

    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Log file: output path in live mode, input path in replay mode
    #[serde(default)]
    pub log: Option<LogConfig>,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Acquisition configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AcquisitionConfig {
    /// Wire schema emitted by the device
    #[serde(default = "default_schema")]
    pub schema: Schema,

    /// Requested sample rate, in samples per second
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Maximum buffered samples per channel
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Channel whitelist; empty means all channels
    #[serde(default)]
    pub channels: Vec<String>,
}

/// Log file configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogConfig {
    pub path: PathBuf,
}

/// Selected operating mode, resolved from the configuration
#[derive(Debug)]
pub enum Mode<'a> {
    /// Live acquisition over the serial transport
    Live(&'a SerialConfig),
    /// Offline replay of a previously recorded log
    Replay(&'a Path),
}

// Default value functions
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_schema() -> Schema { Schema::Scalar }
fn default_sample_rate() -> u32 { 25 }
fn default_sample_limit() -> usize { 500 }

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            schema: default_schema(),
            sample_rate: default_sample_rate(),
            sample_limit: default_sample_limit(),
            channels: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.serial.is_none() && self.log.is_none() {
            return Err(crate::error::CtlScopeError::Config(toml::de::Error::custom(
                "either [serial] or [log] must be configured",
            )));
        }

        if let Some(serial) = &self.serial {
            if serial.port.is_empty() {
                return Err(crate::error::CtlScopeError::Config(toml::de::Error::custom(
                    "serial port cannot be empty",
                )));
            }
        }

        if self.acquisition.sample_rate == 0 || self.acquisition.sample_rate > 1_000_000 {
            return Err(crate::error::CtlScopeError::Config(toml::de::Error::custom(
                "sample_rate must be between 1 and 1000000",
            )));
        }

        if self.acquisition.sample_limit == 0 {
            return Err(crate::error::CtlScopeError::Config(toml::de::Error::custom(
                "sample_limit must be greater than 0",
            )));
        }

        Ok(())
    }

    /// Resolve the operating mode: live when a serial port is configured,
    /// replay of the configured log otherwise
    pub fn mode(&self) -> Result<Mode<'_>> {
        match (&self.serial, &self.log) {
            (Some(serial), _) => Ok(Mode::Live(serial)),
            (None, Some(log)) => Ok(Mode::Replay(&log.path)),
            (None, None) => Err(crate::error::CtlScopeError::Config(toml::de::Error::custom(
                "either [serial] or [log] must be configured",
            ))),
        }
    }

    /// Requested device-side monitor interval in microseconds
    pub fn interval_us(&self) -> u64 {
        1_000_000 / u64::from(self.acquisition.sample_rate)
    }

    /// Channel whitelist as a set; `None` when no filter is configured
    pub fn whitelist(&self) -> Option<HashSet<String>> {
        if self.acquisition.channels.is_empty() {
            None
        } else {
            Some(self.acquisition.channels.iter().cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml_str: &str) -> Config {
        let config: Config = toml::from_str(toml_str).unwrap();
        config
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            r#"
            [serial]
            port = "/dev/ttyACM0"
            baud_rate = 921600

            [acquisition]
            schema = "control"
            sample_rate = 50
            sample_limit = 200
            channels = ["foo_var", "bar_var"]

            [log]
            path = "run.json"
            "#,
        );
        assert!(config.validate().is_ok());

        let serial = config.serial.as_ref().unwrap();
        assert_eq!(serial.port, "/dev/ttyACM0");
        assert_eq!(serial.baud_rate, 921600);
        assert_eq!(config.acquisition.schema, Schema::Control);
        assert_eq!(config.interval_us(), 20_000);
        assert_eq!(config.whitelist().unwrap().len(), 2);
        assert!(matches!(config.mode().unwrap(), Mode::Live(_)));
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
            [serial]
            port = "/dev/ttyACM0"
            "#,
        );
        assert!(config.validate().is_ok());

        assert_eq!(config.serial.as_ref().unwrap().baud_rate, DEFAULT_BAUD_RATE);
        assert_eq!(config.acquisition.schema, Schema::Scalar);
        assert_eq!(config.acquisition.sample_rate, 25);
        assert_eq!(config.acquisition.sample_limit, 500);
        assert_eq!(config.interval_us(), 40_000);
        assert!(config.whitelist().is_none());
    }

    #[test]
    fn test_replay_mode() {
        let config = parse(
            r#"
            [log]
            path = "old-run.json"
            "#,
        );
        assert!(config.validate().is_ok());
        assert!(matches!(config.mode().unwrap(), Mode::Replay(_)));
    }

    #[test]
    fn test_neither_serial_nor_log_is_rejected() {
        let config = parse("");
        assert!(config.validate().is_err());
        assert!(config.mode().is_err());
    }

    #[test]
    fn test_empty_port_is_rejected() {
        let config = parse(
            r#"
            [serial]
            port = ""
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sample_rate_is_rejected() {
        let config = parse(
            r#"
            [serial]
            port = "/dev/ttyACM0"

            [acquisition]
            sample_rate = 0
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sample_limit_is_rejected() {
        let config = parse(
            r#"
            [serial]
            port = "/dev/ttyACM0"

            [acquisition]
            sample_limit = 0
            "#,
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctlscope.toml");
        std::fs::write(&path, "[serial]\nport = \"/dev/ttyACM0\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.serial.unwrap().port, "/dev/ttyACM0");
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ctlscope.toml");
        std::fs::write(&path, "not = [valid").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_default_functions() {
        assert_eq!(default_baud_rate(), 115_200);
        assert_eq!(default_schema(), Schema::Scalar);
        assert_eq!(default_sample_rate(), 25);
        assert_eq!(default_sample_limit(), 500);
    }
}
