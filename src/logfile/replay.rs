//! # Log Replay
//!
//! Loads a finalized log file and reconstructs the in-memory series from it,
//! with no live transport attached.

use crate::error::{CtlScopeError, Result};
use crate::sample::Sample;
use crate::store::SeriesStore;
use serde::Deserialize;
use std::path::Path;
use tracing::info;

/// A fully loaded, finalized log file
#[derive(Debug, Deserialize)]
pub struct LogFile {
    /// Log container format version
    pub version: String,
    /// Session creation timestamp (ISO-8601)
    pub created: String,
    /// Samples in recorded order
    pub samples: Vec<Sample>,
}

impl LogFile {
    /// Read and parse a finalized log file.
    ///
    /// # Errors
    ///
    /// Returns [`CtlScopeError::LogNotFound`] if `path` does not exist, and
    /// [`CtlScopeError::LogParse`] if the file is not valid structured data.
    /// No partial recovery is attempted; an unfinalized log must be repaired
    /// manually (trim the trailing separator and close the JSON).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CtlScopeError::LogNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path)?;
        let log: LogFile =
            serde_json::from_str(&content).map_err(|e| CtlScopeError::LogParse(e.to_string()))?;

        info!(
            "Loaded log {} ({} samples, created {})",
            path.display(),
            log.samples.len(),
            log.created
        );
        Ok(log)
    }

    /// Feed every recorded sample through the store, in order.
    ///
    /// With the same filter and sample limit, this reproduces the store
    /// content of the live session that wrote the log.
    pub fn replay_into(&self, store: &mut SeriesStore) {
        for sample in &self.samples {
            store.log(sample);
        }
    }
}
