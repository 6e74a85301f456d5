//! One JSON object per line, in both directions.
//!
//! Outbound messages are written to a blocking writer (stdout for the
//! binary) and flushed immediately. Inbound messages are read from an
//! async reader; lines that are blank or not a known message are logged
//! and skipped.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use pickup_application::ports::HostBridge;
use pickup_domain::{InboundMessage, OutboundMessage};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

/// [`HostBridge`] writing JSON lines.
pub struct LineBridge<W> {
    writer: Mutex<W>,
}

impl<W: Write> LineBridge<W> {
    /// Wraps a writer.
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_line(&self, message: &OutboundMessage) -> io::Result<()> {
        let line = serde_json::to_string(message)?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")?;
        writer.flush()
    }
}

impl LineBridge<io::Stdout> {
    /// Bridge writing to standard output.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> HostBridge for LineBridge<W> {
    fn post(&self, message: &OutboundMessage) {
        if let Err(error) = self.write_line(message) {
            tracing::warn!(%error, "failed to post message to host");
        }
    }
}

/// Reads [`InboundMessage`]s from JSON lines.
pub struct InboundReader<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> InboundReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
        }
    }

    /// Next well-formed message, or `None` at end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn next_message(&mut self) -> io::Result<Option<InboundMessage>> {
        while let Some(line) = self.lines.next_line().await? {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(message) => return Ok(Some(message)),
                Err(error) => tracing::warn!(%error, "ignoring malformed host message"),
            }
        }
        Ok(None)
    }
}
