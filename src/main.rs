//! # ctlscope
//!
//! Live monitor and logger for embedded control-system telemetry over serial.
//!
//! Connects to the device's shell, requests periodic telemetry with
//! `control_system monitor <interval_us>`, decodes one sample per line, and
//! maintains bounded per-channel series while optionally streaming every
//! sample to a crash-recoverable JSON log. Without a serial port configured,
//! replays a previously recorded log instead.

use anyhow::Result;
use std::path::Path;
use tracing::info;

use ctlscope::config::{Config, Mode, SerialConfig};
use ctlscope::logfile::{LogFile, LogWriter};
use ctlscope::monitor::{self, AcquisitionLoop, ViewSink};
use ctlscope::store::{SeriesStore, StoreSnapshot};
use ctlscope::transport::TransportLink;

/// Configuration file used when no path is given on the command line
const DEFAULT_CONFIG_PATH: &str = "ctlscope.toml";

/// Renders between buffered-count summaries (~5 seconds at the loop cadence)
const SUMMARY_INTERVAL_RENDERS: u64 = 50;

/// View sink shipped with the binary: periodically logs how many samples are
/// buffered per channel and never closes. A graphical viewer plugs in through
/// the same [`ViewSink`] trait.
#[derive(Debug, Default)]
struct SummarySink {
    renders: u64,
}

impl ViewSink for SummarySink {
    fn render(&mut self, snapshot: &StoreSnapshot) -> bool {
        self.renders += 1;
        if self.renders % SUMMARY_INTERVAL_RENDERS == 1 {
            for channel in &snapshot.channels {
                info!(
                    "{}: {} samples buffered, latest t={:.3}s",
                    channel.name,
                    channel.timestamps.len(),
                    channel.timestamps.last().copied().unwrap_or(0.0)
                );
            }
        }
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("ctlscope v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load(&config_path)?;

    match config.mode()? {
        Mode::Live(serial) => run_live(&config, serial).await,
        Mode::Replay(path) => replay(&config, path),
    }
}

/// Live acquisition session: transport, optional log writer, series store
async fn run_live(config: &Config, serial: &SerialConfig) -> Result<()> {
    let link = TransportLink::open(&serial.port, serial.baud_rate).await?;

    let writer = match &config.log {
        Some(log) => Some(LogWriter::open(&log.path)?),
        None => None,
    };

    let store = SeriesStore::new(Some(config.acquisition.sample_limit), config.whitelist());
    let acquisition = AcquisitionLoop::new(
        link,
        config.acquisition.schema,
        writer,
        store,
        SummarySink::default(),
        config.interval_us(),
    );

    let store = acquisition.run().await?;
    info!("Session ended with {} channels buffered", store.len());
    Ok(())
}

/// Offline replay of a recorded log through the same store contract
fn replay(config: &Config, path: &Path) -> Result<()> {
    let log = LogFile::load(path)?;
    let mut store = SeriesStore::new(Some(config.acquisition.sample_limit), config.whitelist());
    let mut sink = SummarySink::default();

    monitor::run_replay(&log, &mut store, &mut sink);

    info!(
        "Replayed {} samples across {} channels",
        log.samples.len(),
        store.len()
    );
    Ok(())
}
