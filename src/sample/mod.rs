//! # Sample Decoding Module
//!
//! Decodes raw telemetry lines into structured samples.
//!
//! This module handles:
//! - The two wire schemas emitted by the control-system shell
//! - Q31 fixed-point to normalized float conversion
//! - Microsecond counter to floating-point seconds conversion
//! - Near-zero clamping of every numeric field

use crate::error::{CtlScopeError, Result};
use serde::{Deserialize, Serialize};

/// Divisor converting a signed Q31 fixed-point integer to a float in ~[-1, 1]
pub const Q31_SCALE: f64 = 2_147_483_648.0;

/// Microseconds per second, for device timestamp conversion
pub const USEC_PER_SEC: f64 = 1_000_000.0;

/// Smallest representable nonzero field magnitude
pub const CLAMP_FLOOR: f64 = 1e-4;

/// Clamp a decoded field away from zero.
///
/// Any nonzero value with magnitude below [`CLAMP_FLOOR`] is replaced by
/// ±`CLAMP_FLOOR` with its sign preserved, so near-zero values never lose
/// their sign or underflow display precision. Zero stays zero.
pub fn clamp_field(value: f64) -> f64 {
    if value > 0.0 && value < CLAMP_FLOOR {
        CLAMP_FLOOR
    } else if value < 0.0 && value > -CLAMP_FLOOR {
        -CLAMP_FLOOR
    } else {
        value
    }
}

/// Convert a raw Q31 fixed-point integer to a normalized float
pub fn q31_to_float(raw: i64) -> f64 {
    raw as f64 / Q31_SCALE
}

/// Convert a device microsecond counter value to seconds
pub fn usec_to_secs(raw: i64) -> f64 {
    raw as f64 / USEC_PER_SEC
}

/// Wire schema emitted by the device, selected at configuration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Schema {
    /// One value per line: `["channel_name", timestamp_usec, raw_q31]`
    Scalar,
    /// Control-loop triple per line: `{"nm": ..., "ts": ..., "sp": ..., "pv": ..., "sa": ...}`
    Control,
}

impl Schema {
    /// Decode one raw line into a validated [`Sample`].
    ///
    /// Parses the line as JSON in this schema's shape, converts the raw
    /// timestamp to seconds, converts each raw fixed-point field to a
    /// normalized float, and clamps every numeric field.
    ///
    /// # Errors
    ///
    /// Returns [`CtlScopeError::Decode`] on any parse or shape failure
    /// (malformed JSON, wrong arity, non-numeric field). The caller's policy
    /// is to drop the line and continue; a corrupt frame never stalls the
    /// stream.
    pub fn decode(&self, line: &str) -> Result<Sample> {
        match self {
            Schema::Scalar => {
                let (channel, ts, raw): (String, i64, i64) = serde_json::from_str(line)
                    .map_err(|e| CtlScopeError::Decode(format!("bad scalar record: {}", e)))?;

                Ok(Sample::Scalar(ScalarSample {
                    channel,
                    timestamp: usec_to_secs(ts),
                    value: clamp_field(q31_to_float(raw)),
                }))
            }
            Schema::Control => {
                #[derive(Deserialize)]
                struct Raw {
                    nm: String,
                    ts: i64,
                    sp: i64,
                    pv: i64,
                    sa: i64,
                }

                let raw: Raw = serde_json::from_str(line)
                    .map_err(|e| CtlScopeError::Decode(format!("bad control record: {}", e)))?;

                Ok(Sample::Control(ControlSample {
                    channel: raw.nm,
                    timestamp: usec_to_secs(raw.ts),
                    setpoint: clamp_field(q31_to_float(raw.sp)),
                    process_value: clamp_field(q31_to_float(raw.pv)),
                    actuator_output: clamp_field(q31_to_float(raw.sa)),
                }))
            }
        }
    }
}

/// Single-value sample: one monitored control-system variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarSample {
    /// Channel (variable) name
    #[serde(rename = "name")]
    pub channel: String,
    /// Timestamp in seconds
    pub timestamp: f64,
    /// Normalized, clamped value
    pub value: f64,
}

/// Control-loop sample: setpoint, process value, and actuator output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSample {
    /// Channel (control loop) name
    #[serde(rename = "nm")]
    pub channel: String,
    /// Timestamp in seconds
    #[serde(rename = "ts")]
    pub timestamp: f64,
    /// Setpoint
    #[serde(rename = "sp")]
    pub setpoint: f64,
    /// Process value
    #[serde(rename = "pv")]
    pub process_value: f64,
    /// Actuator output
    #[serde(rename = "sa")]
    pub actuator_output: f64,
}

/// One decoded telemetry observation.
///
/// Serializes to exactly the record shape persisted in log files, which
/// follows whichever device schema produced the sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Sample {
    /// Sample in the scalar schema
    Scalar(ScalarSample),
    /// Sample in the control-loop schema
    Control(ControlSample),
}

impl Sample {
    /// Channel name this sample belongs to
    pub fn channel(&self) -> &str {
        match self {
            Sample::Scalar(s) => &s.channel,
            Sample::Control(s) => &s.channel,
        }
    }

    /// Timestamp in seconds
    pub fn timestamp(&self) -> f64 {
        match self {
            Sample::Scalar(s) => s.timestamp,
            Sample::Control(s) => s.timestamp,
        }
    }

    /// The numeric fields of this sample, in schema order
    pub fn fields(&self) -> Vec<f64> {
        match self {
            Sample::Scalar(s) => vec![s.value],
            Sample::Control(s) => vec![s.setpoint, s.process_value, s.actuator_output],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_small_positive() {
        let clamped = clamp_field(0.00004);
        assert_eq!(clamped, CLAMP_FLOOR);
    }

    #[test]
    fn test_clamp_small_negative() {
        let clamped = clamp_field(-0.00004);
        assert_eq!(clamped, -CLAMP_FLOOR);
    }

    #[test]
    fn test_clamp_zero_unchanged() {
        assert_eq!(clamp_field(0.0), 0.0);
    }

    #[test]
    fn test_clamp_large_values_unchanged() {
        assert_eq!(clamp_field(0.5), 0.5);
        assert_eq!(clamp_field(-0.5), -0.5);
        assert_eq!(clamp_field(CLAMP_FLOOR), CLAMP_FLOOR);
        assert_eq!(clamp_field(-CLAMP_FLOOR), -CLAMP_FLOOR);
        assert_eq!(clamp_field(1.0), 1.0);
    }

    #[test]
    fn test_q31_full_scale() {
        assert!((q31_to_float(2_147_483_648) - 1.0).abs() < 1e-12);
        assert!((q31_to_float(-2_147_483_648) - (-1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_q31_half_scale() {
        assert!((q31_to_float(1_073_741_824) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_usec_to_secs() {
        assert!((usec_to_secs(1_000_000) - 1.0).abs() < 1e-12);
        assert!((usec_to_secs(50_000) - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_decode_scalar_line() {
        let line = r#"["pid_out", 2000000, 1073741824]"#;
        let sample = Schema::Scalar.decode(line).unwrap();

        assert_eq!(sample.channel(), "pid_out");
        assert!((sample.timestamp() - 2.0).abs() < 1e-12);
        assert_eq!(sample.fields(), vec![0.5]);
    }

    #[test]
    fn test_decode_scalar_clamps_value() {
        // Raw value of 1 is far below the clamp floor after scaling
        let line = r#"["tiny", 1000000, 1]"#;
        let sample = Schema::Scalar.decode(line).unwrap();
        assert_eq!(sample.fields(), vec![CLAMP_FLOOR]);
    }

    #[test]
    fn test_decode_control_line() {
        let line = r#"{"nm": "wheel", "ts": 500000, "sp": 2147483648, "pv": -2147483648, "sa": 0}"#;
        let sample = Schema::Control.decode(line).unwrap();

        assert_eq!(sample.channel(), "wheel");
        assert!((sample.timestamp() - 0.5).abs() < 1e-12);
        let fields = sample.fields();
        assert!((fields[0] - 1.0).abs() < 1e-12);
        assert!((fields[1] - (-1.0)).abs() < 1e-12);
        assert_eq!(fields[2], 0.0);
    }

    #[test]
    fn test_decode_control_clamps_every_field() {
        let line = r#"{"nm": "wheel", "ts": 1000000, "sp": 1, "pv": -1, "sa": 0}"#;
        let sample = Schema::Control.decode(line).unwrap();
        assert_eq!(sample.fields(), vec![CLAMP_FLOOR, -CLAMP_FLOOR, 0.0]);
    }

    #[test]
    fn test_decode_malformed_line() {
        let result = Schema::Scalar.decode("uart:~$ not json at all");
        assert!(matches!(result, Err(CtlScopeError::Decode(_))));
    }

    #[test]
    fn test_decode_wrong_arity() {
        // Two elements instead of three
        let result = Schema::Scalar.decode(r#"["name", 1000]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_non_numeric_field() {
        let result = Schema::Scalar.decode(r#"["name", 1000, "oops"]"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_schema_mismatch() {
        // A control object is not a valid scalar record and vice versa
        let control_line = r#"{"nm": "x", "ts": 1, "sp": 0, "pv": 0, "sa": 0}"#;
        assert!(Schema::Scalar.decode(control_line).is_err());

        let scalar_line = r#"["x", 1, 0]"#;
        assert!(Schema::Control.decode(scalar_line).is_err());
    }

    #[test]
    fn test_scalar_record_shape() {
        let sample = Sample::Scalar(ScalarSample {
            channel: "foo_var".to_string(),
            timestamp: 1.5,
            value: 0.25,
        });

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "foo_var", "timestamp": 1.5, "value": 0.25})
        );
    }

    #[test]
    fn test_control_record_shape() {
        let sample = Sample::Control(ControlSample {
            channel: "wheel".to_string(),
            timestamp: 0.5,
            setpoint: 0.1,
            process_value: 0.2,
            actuator_output: -0.3,
        });

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"nm": "wheel", "ts": 0.5, "sp": 0.1, "pv": 0.2, "sa": -0.3})
        );
    }

    #[test]
    fn test_record_deserializes_to_matching_variant() {
        let scalar: Sample =
            serde_json::from_str(r#"{"name": "a", "timestamp": 1.0, "value": 0.5}"#).unwrap();
        assert!(matches!(scalar, Sample::Scalar(_)));

        let control: Sample =
            serde_json::from_str(r#"{"nm": "b", "ts": 1.0, "sp": 0.1, "pv": 0.2, "sa": 0.3}"#)
                .unwrap();
        assert!(matches!(control, Sample::Control(_)));
    }
}
