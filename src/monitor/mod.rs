//! # Monitor Module
//!
//! The acquisition control loop composing transport, decoder, log writer,
//! and series store.
//!
//! This module handles:
//! - Requesting periodic telemetry from the device shell
//! - Bounded batch reads alternated with view-sink rendering
//! - Dropping undecodable lines without desynchronizing the stream
//! - Stopping the device and finalizing the log on every exit path

use crate::error::Result;
use crate::logfile::{LogFile, LogWriter};
use crate::sample::Schema;
use crate::store::{SeriesStore, StoreSnapshot};
use crate::transport::TransportLink;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Wall-clock window for one batch read from the transport
const BATCH_WINDOW: Duration = Duration::from_millis(50);

/// Pause granted to the view sink between batches
const RENDER_PAUSE: Duration = Duration::from_millis(50);

/// Consumer of series snapshots (a plot window, a status printer, ...).
///
/// The core holds no reference to how rendering is implemented; it hands the
/// sink an immutable snapshot between batches and only looks at the returned
/// "still active" flag. A slow sink slows acquisition rather than causing
/// unbounded buffering.
pub trait ViewSink {
    /// Render one snapshot. Returning `false` stops the acquisition loop.
    fn render(&mut self, snapshot: &StoreSnapshot) -> bool;
}

/// The live acquisition loop.
///
/// Owns the transport, the optional log writer, and the series store for the
/// duration of one session. Single cooperative task; the store is never
/// mutated while the sink renders.
pub struct AcquisitionLoop<T, S> {
    link: TransportLink<T>,
    schema: Schema,
    writer: Option<LogWriter>,
    store: SeriesStore,
    sink: S,
    interval_us: u64,
}

impl<T, S> AcquisitionLoop<T, S>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
    S: ViewSink,
{
    /// Assemble a loop from its collaborators
    pub fn new(
        link: TransportLink<T>,
        schema: Schema,
        writer: Option<LogWriter>,
        store: SeriesStore,
        sink: S,
        interval_us: u64,
    ) -> Self {
        Self {
            link,
            schema,
            writer,
            store,
            sink,
            interval_us,
        }
    }

    /// Run the session to completion.
    ///
    /// Terminates when the sink reports it is no longer active, on Ctrl+C,
    /// or when an error propagates out of a stage. On every exit path the
    /// device is asked to stop streaming and the log file is finalized
    /// (best-effort; a finalize failure is logged, not allowed to mask an
    /// earlier error).
    ///
    /// Returns the series store so callers can inspect the final series.
    pub async fn run(mut self) -> Result<SeriesStore> {
        let result = self.acquire().await;

        self.link.stop().await;
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize log file: {}", e);
            }
        }

        result.map(|_| self.store)
    }

    async fn acquire(&mut self) -> Result<()> {
        self.link
            .send_command(&format!("control_system monitor {}", self.interval_us))
            .await?;
        // Drop the shell's echo of the command before decoding starts
        self.link.flush_input().await;

        info!("Monitoring started, one sample per {} us", self.interval_us);

        loop {
            let lines = tokio::select! {
                batch = self.link.read_batch(BATCH_WINDOW) => batch?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Received Ctrl+C, stopping acquisition");
                    return Ok(());
                }
            };

            for line in &lines {
                match self.schema.decode(line) {
                    Ok(sample) => {
                        if !self.store.admits(sample.channel()) {
                            continue;
                        }
                        if let Some(writer) = self.writer.as_mut() {
                            writer.append(&sample)?;
                        }
                        self.store.log(&sample);
                    }
                    // A single corrupt frame is dropped; the next line on the
                    // stream is independent
                    Err(e) => debug!("Dropping undecodable line: {}", e),
                }
            }

            if !self.store.is_empty() {
                let snapshot = self.store.snapshot();
                if !self.sink.render(&snapshot) {
                    info!("View closed, stopping acquisition");
                    return Ok(());
                }
                tokio::time::sleep(RENDER_PAUSE).await;
            }
        }
    }
}

/// Replay a loaded log through a store and render the result once.
///
/// With the same filter and sample limit this reproduces the series the
/// live session produced. The sink may block until dismissed; that is its
/// own business.
pub fn run_replay<S: ViewSink>(log: &LogFile, store: &mut SeriesStore, sink: &mut S) {
    log.replay_into(store);
    sink.render(&store.snapshot());
}
