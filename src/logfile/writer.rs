//! # Streaming Log Writer
//!
//! Appends each accepted sample to the log file as it arrives, instead of
//! dumping hours of samples from memory at shutdown. If the process dies
//! mid-run, everything up to the last complete record is still on disk and
//! can be recovered by trimming the trailing separator and appending the
//! closing `]` and `}` by hand.

use super::LOG_VERSION;
use crate::error::{CtlScopeError, Result};
use crate::sample::Sample;
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Append-only writer for one logging session.
///
/// Exclusively owns the log file; opening refuses paths that already exist
/// so a prior session's data is never clobbered.
#[derive(Debug)]
pub struct LogWriter {
    file: File,
    path: PathBuf,
    appended: bool,
    finalized: bool,
}

impl LogWriter {
    /// Create the log file and write the container header.
    ///
    /// The header (format version, creation timestamp, opening of the
    /// `samples` array) hits the disk immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CtlScopeError::LogExists`] if `path` already exists; no
    /// write is performed in that case.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| {
                if e.kind() == ErrorKind::AlreadyExists {
                    CtlScopeError::LogExists(path.clone())
                } else {
                    CtlScopeError::Io(e)
                }
            })?;

        write!(
            file,
            "{{\n\t\"version\": \"{}\",\n\t\"created\": \"{}\",\n\t\"samples\": [\n",
            LOG_VERSION,
            chrono::Local::now().to_rfc3339()
        )?;
        file.flush()?;

        info!("Logging samples to {}", path.display());

        Ok(Self {
            file,
            path,
            appended: false,
            finalized: false,
        })
    }

    /// Path of the log file being written
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one sample record, followed by its separator, and flush.
    ///
    /// After any `append` returns, truncating the file after the last
    /// complete separator yields a recoverable record of everything logged
    /// so far.
    pub fn append(&mut self, sample: &Sample) -> Result<()> {
        let record = serde_json::to_string(sample).map_err(std::io::Error::from)?;
        write!(self.file, "\t\t{},\n", record)?;
        self.file.flush()?;
        self.appended = true;
        debug!("Logged sample for channel {}", sample.channel());
        Ok(())
    }

    /// Close the container into syntactically valid JSON.
    ///
    /// Removes the separator after the last record and writes the closing
    /// syntax; with zero appended samples the output is a valid
    /// empty-sequence log. Safe to call more than once; only the first call
    /// writes.
    pub fn finalize(&mut self) -> Result<()> {
        if self.finalized {
            return Ok(());
        }

        if self.appended {
            // Overwrite the trailing ",\n" left by the last append
            self.file.seek(SeekFrom::End(-2))?;
            self.file.write_all(b"\n\t]\n}\n")?;
        } else {
            self.file.write_all(b"\t]\n}\n")?;
        }
        self.file.flush()?;
        self.finalized = true;

        info!("Finalized log file {}", self.path.display());
        Ok(())
    }
}
