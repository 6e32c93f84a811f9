//! # Transport Module
//!
//! Line-oriented link to the device's serial shell.
//!
//! This module handles:
//! - Opening the serial port at the configured baud rate (8N1)
//! - CR-LF line framing over an unreliable byte stream
//! - Bounded-timeout reads; "no data" is a normal value, not an error
//! - Sending shell commands and the end-of-transmission stop byte

use crate::error::{CtlScopeError, Result};
use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Duration, Instant};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info};

/// Default baud rate of the device shell UART
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Per-read timeout; a single read attempt never blocks longer than this
const READ_TIMEOUT: Duration = Duration::from_millis(200);

/// Line terminator emitted by the device shell
const LINE_TERMINATOR: &[u8] = b"\r\n";

/// End-of-transmission byte requesting the device to stop streaming
const ETX: u8 = 0x03;

/// Read chunk size for incremental line assembly
const READ_CHUNK: usize = 256;

/// Serial link to the control-system shell.
///
/// Generic over the underlying byte stream so tests can drive it with
/// in-memory streams; production code uses [`TransportLink::open`] which
/// yields a `TransportLink<SerialStream>`.
pub struct TransportLink<T> {
    stream: T,
    buf: BytesMut,
}

impl std::fmt::Debug for TransportLink<tokio_serial::SerialStream> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportLink").finish_non_exhaustive()
    }
}

impl TransportLink<tokio_serial::SerialStream> {
    /// Open the serial port and resynchronize the device's line buffer.
    ///
    /// Configures the port as 8N1 with no flow control, writes an empty line
    /// so any partial input on the device side is terminated, then discards
    /// whatever bytes are currently pending.
    ///
    /// # Errors
    ///
    /// Returns [`CtlScopeError::Connection`] if the port cannot be opened.
    pub async fn open(path: &str, baud_rate: u32) -> Result<Self> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| CtlScopeError::Connection(format!("Failed to open {}: {}", path, e)))?;

        info!("Opened serial port {} at {} baud", path, baud_rate);

        let mut link = Self::over(port);
        link.send_command("").await?;
        link.flush_input().await;
        Ok(link)
    }
}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> TransportLink<T> {
    /// Wrap an already-open byte stream (test seam)
    pub fn over(stream: T) -> Self {
        Self {
            stream,
            buf: BytesMut::with_capacity(1024),
        }
    }

    /// Read one CR-LF terminated line.
    ///
    /// If the first bounded read attempt does not observe a terminator, one
    /// more attempt is made before giving up; a line straddling the per-read
    /// timeout is still captured, but the call never blocks much beyond two
    /// timeout windows. `Ok(None)` means "no complete line yet", which is a
    /// normal condition, not an error.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        for _ in 0..2 {
            if let Some(pos) = self.fill_until_terminator().await? {
                let line = self.buf.split_to(pos + LINE_TERMINATOR.len());
                let text = String::from_utf8_lossy(&line[..pos]).into_owned();
                return Ok(Some(text));
            }
        }
        Ok(None)
    }

    /// Read lines until `window` elapses or the stream goes quiet.
    ///
    /// An empty [`read_line`](Self::read_line) result is the early-exit
    /// condition, so at most one short spurious wait is paid at the end of a
    /// burst.
    pub async fn read_batch(&mut self, window: Duration) -> Result<Vec<String>> {
        let deadline = Instant::now() + window;
        let mut lines = Vec::new();

        while Instant::now() < deadline {
            match self.read_line().await? {
                Some(line) => lines.push(line),
                None => break,
            }
        }

        Ok(lines)
    }

    /// Send one command line (text + CR-LF) to the device shell
    pub async fn send_command(&mut self, text: &str) -> Result<()> {
        self.stream.write_all(text.as_bytes()).await?;
        self.stream.write_all(LINE_TERMINATOR).await?;
        self.stream.flush().await?;
        debug!("Sent command: {:?}", text);
        Ok(())
    }

    /// Discard any bytes currently pending on the link.
    ///
    /// Used after opening and after issuing the monitor command, so stale
    /// output and the shell's command echo never reach the decoder.
    pub async fn flush_input(&mut self) {
        let mut scratch = [0u8; 1024];
        let _ = timeout(READ_TIMEOUT, self.stream.read(&mut scratch)).await;
        self.buf.clear();
    }

    /// Request the device to stop streaming.
    ///
    /// Writes a single ETX byte. Best-effort: this runs during shutdown, so
    /// failures are logged and swallowed.
    pub async fn stop(&mut self) {
        if let Err(e) = self.stream.write_all(&[ETX]).await {
            debug!("Failed to send stop byte: {}", e);
            return;
        }
        if let Err(e) = self.stream.flush().await {
            debug!("Failed to flush stop byte: {}", e);
        }
    }

    /// One bounded attempt to get a terminator into the buffer.
    ///
    /// Returns the terminator position as soon as the buffer contains one,
    /// `Ok(None)` when the timeout window closes or the stream reports EOF.
    async fn fill_until_terminator(&mut self) -> Result<Option<usize>> {
        let deadline = Instant::now() + READ_TIMEOUT;

        loop {
            if let Some(pos) = find_terminator(&self.buf) {
                return Ok(Some(pos));
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            let mut chunk = [0u8; READ_CHUNK];
            match timeout(remaining, self.stream.read(&mut chunk)).await {
                Err(_) => return Ok(None),
                Ok(Ok(0)) => return Ok(None),
                Ok(Ok(n)) => self.buf.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }
    }
}

fn find_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(LINE_TERMINATOR.len())
        .position(|w| w == LINE_TERMINATOR)
}
