//! Newline-delimited message framing for stream transports.
//!
//! The backend channel carries one JSON document per text message. Over a
//! byte stream (TCP, stdio, an in-memory duplex in tests) each message is a
//! single line. This module provides [`MessageReader`] and [`MessageWriter`]
//! for async reading and writing of those messages.

use anyhow::{Context, Result, bail};
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
};

/// Maximum message size (4 MiB) to prevent unbounded memory allocation.
pub const MAX_MESSAGE_BYTES: usize = 4 * 1024 * 1024;

/// Reads newline-delimited text messages from an async reader.
pub struct MessageReader<R> {
    reader: BufReader<R>,
    line: Vec<u8>,
}

impl<R: AsyncRead + Unpin> MessageReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line: Vec::new(),
        }
    }

    /// Read the next message.
    ///
    /// Returns `Ok(None)` on EOF (clean shutdown). Blank lines are skipped.
    /// Oversized and non-UTF-8 lines are logged and discarded; the framing
    /// is still intact, so reading continues with the next line. Returns
    /// `Err` on IO failure or a final message cut off by EOF.
    pub async fn read_message(&mut self) -> Result<Option<String>> {
        loop {
            self.line.clear();
            let bytes_read = (&mut self.reader)
                .take(MAX_MESSAGE_BYTES as u64 + 1)
                .read_until(b'\n', &mut self.line)
                .await
                .context("reading message")?;

            if bytes_read == 0 {
                return Ok(None);
            }

            let terminated = self.line.last() == Some(&b'\n');
            if !terminated {
                if self.line.len() > MAX_MESSAGE_BYTES {
                    tracing::warn!("Dropping message over {MAX_MESSAGE_BYTES} bytes");
                    self.skip_rest_of_line().await?;
                    continue;
                }
                bail!("unexpected EOF in the middle of a message");
            }

            let Ok(text) = std::str::from_utf8(&self.line) else {
                tracing::warn!(
                    payload = %String::from_utf8_lossy(&self.line).trim(),
                    "Dropping message that is not valid UTF-8"
                );
                continue;
            };
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            return Ok(Some(trimmed.to_string()));
        }
    }

    /// Discard input up to and including the next `\n`, one bounded chunk
    /// at a time.
    async fn skip_rest_of_line(&mut self) -> Result<()> {
        loop {
            self.line.clear();
            let bytes_read = (&mut self.reader)
                .take(MAX_MESSAGE_BYTES as u64)
                .read_until(b'\n', &mut self.line)
                .await
                .context("discarding oversized message")?;
            if bytes_read == 0 {
                bail!("unexpected EOF in the middle of a message");
            }
            if self.line.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}

/// Writes newline-delimited text messages to an async writer.
pub struct MessageWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> MessageWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Write one message followed by `\n`.
    ///
    /// Embedded newlines would split the message, so they are rejected.
    pub async fn write_message(&mut self, text: &str) -> Result<()> {
        if text.contains('\n') {
            bail!("message must not contain a newline");
        }
        self.writer
            .write_all(text.as_bytes())
            .await
            .context("writing message body")?;
        self.writer
            .write_all(b"\n")
            .await
            .context("writing message terminator")?;
        self.writer.flush().await.context("flushing message")?;
        Ok(())
    }
}
