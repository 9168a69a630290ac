//! Correlated line-delimited JSON channel.

use serde::Serialize;
use std::collections::VecDeque;
use std::time::Duration;
use steward_core::error::ChannelError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::protocol::{Envelope, Outbound};

type LineReader = Lines<Box<dyn AsyncBufRead + Send + Unpin>>;
type LineWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Reply sent for lines that are not JSON objects.
pub const INVALID_JSON: &str = "Invalid JSON input.";

/// A duplex channel with a re-delivery buffer.
///
/// Messages read while waiting for a specific reply are parked in FIFO
/// order and handed out by `next_message` before anything new is read.
pub struct MessageChannel {
    reader: LineReader,
    writer: LineWriter,
    pending: VecDeque<Envelope>,
}

impl MessageChannel {
    pub fn new<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(BufReader::new(reader));
        Self {
            reader: reader.lines(),
            writer: Box::new(writer),
            pending: VecDeque::new(),
        }
    }

    /// Process stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }

    /// Serialize one message as a single line and flush.
    pub async fn send(&mut self, message: &Outbound) -> Result<(), ChannelError> {
        self.send_json(message).await
    }

    pub async fn send_json<T: Serialize + ?Sized>(&mut self, message: &T) -> Result<(), ChannelError> {
        let mut line = serde_json::to_string(message).map_err(|e| ChannelError::Io(e.to_string()))?;
        debug!(line = %line, "SEND");
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// The next inbound message, buffered ones first. `None` once the peer
    /// has closed its side.
    pub async fn next_message(&mut self) -> Result<Option<Envelope>, ChannelError> {
        if let Some(buffered) = self.pending.pop_front() {
            debug!(kind = %buffered.kind, "RECEIVE (buffered)");
            return Ok(Some(buffered));
        }
        self.read_envelope().await
    }

    /// Wait for a message of `kind` (and `id`, if given).
    ///
    /// Non-matching messages go to the re-delivery buffer. Returns `None`
    /// when the channel closes or `timeout` elapses.
    pub async fn wait_for(
        &mut self,
        kind: &str,
        id: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<Option<Envelope>, ChannelError> {
        if let Some(found) = self.take_pending(kind, id) {
            return Ok(Some(found));
        }
        match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.read_until(kind, id)).await {
                Ok(result) => result,
                Err(_) => {
                    debug!(kind, ?id, "Wait timed out");
                    Ok(None)
                }
            },
            None => self.read_until(kind, id).await,
        }
    }

    /// Like `wait_for` without a timeout, but abandoned when `cancel` fires.
    pub async fn wait_for_cancellable(
        &mut self,
        kind: &str,
        id: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<Option<Envelope>, ChannelError> {
        if let Some(found) = self.take_pending(kind, id) {
            return Ok(Some(found));
        }
        tokio::select! {
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            result = self.read_until(kind, id) => result,
        }
    }

    /// Messages parked for later delivery.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn take_pending(&mut self, kind: &str, id: Option<&str>) -> Option<Envelope> {
        let index = self.pending.iter().position(|m| m.matches(kind, id))?;
        debug!(kind, ?id, "RECEIVE (wait/buffered)");
        self.pending.remove(index)
    }

    async fn read_until(&mut self, kind: &str, id: Option<&str>) -> Result<Option<Envelope>, ChannelError> {
        loop {
            let Some(message) = self.read_envelope().await? else {
                return Ok(None);
            };
            if message.matches(kind, id) {
                return Ok(Some(message));
            }
            debug!(kind = %message.kind, "Parking unrelated message");
            self.pending.push_back(message);
        }
    }

    /// Read lines until one parses as a JSON object. Blank lines are
    /// skipped; anything else that does not parse is answered with an
    /// error message and skipped.
    async fn read_envelope(&mut self) -> Result<Option<Envelope>, ChannelError> {
        loop {
            let Some(line) = self.reader.next_line().await? else {
                debug!("Inbound stream closed");
                return Ok(None);
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<serde_json::Value>(line)
                .ok()
                .and_then(Envelope::from_value);
            match parsed {
                Some(envelope) => {
                    debug!(kind = %envelope.kind, "RECEIVE");
                    return Ok(Some(envelope));
                }
                None => {
                    warn!(line, "Invalid JSON input");
                    self.send(&Outbound::error(INVALID_JSON)).await?;
                }
            }
        }
    }
}
