//! Pattern-wait and send primitives over a transport.

use std::time::Duration;

use log::{debug, trace};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::{PromptKind, PromptMatcher, PromptOutcome};
use crate::error::Result;
use crate::transcript::TranscriptSink;
use crate::transport::Transport;

/// An interactive terminal session: the transport, its unread output and the
/// transcript every consumed span is forwarded to.
pub struct PtyChannel<T> {
    transport: T,
    buffer: PatternBuffer,
    sink: Box<dyn TranscriptSink>,
    label: String,
}

impl<T: Transport> PtyChannel<T> {
    /// Wrap a transport; `label` prefixes log messages (usually `host:port`).
    pub fn new(transport: T, sink: Box<dyn TranscriptSink>, label: impl Into<String>) -> Self {
        Self {
            transport,
            buffer: PatternBuffer::default(),
            sink,
            label: label.into(),
        }
    }

    /// Send one line followed by a newline.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 1);
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
        self.send_raw(&data).await
    }

    /// Send bytes exactly as given.
    pub async fn send_raw(&mut self, data: &[u8]) -> Result<()> {
        trace!("{}: send {:?}", self.label, String::from_utf8_lossy(data));
        self.transport.send(data).await
    }

    /// Wait until one of the matcher's patterns appears or `timeout` elapses.
    ///
    /// Everything the transport has already queued is read before patterns
    /// are tested. On a match, the text through the end of the match is
    /// consumed; anything after it stays unread. On timeout or end of stream
    /// the whole unread buffer is consumed. Either way the consumed text goes
    /// to the transcript.
    pub async fn expect(&mut self, matcher: &PromptMatcher, timeout: Duration) -> PromptOutcome {
        let deadline = Instant::now() + timeout;
        let mut closed = self.drain();

        loop {
            if let Some((kind, end)) = matcher.find_first(&self.buffer) {
                trace!("{}: matched {:?}", self.label, kind);
                return self.emit(kind, end);
            }
            if closed {
                debug!("{}: stream closed while waiting", self.label);
                return self.emit(PromptKind::ProcessError, self.buffer.len());
            }

            match tokio::time::timeout_at(deadline, self.transport.recv()).await {
                Ok(Ok(chunk)) => {
                    self.buffer.extend(&chunk);
                    closed = self.drain();
                }
                Ok(Err(e)) => {
                    debug!("{}: read failed: {}", self.label, e);
                    self.buffer.flush();
                    closed = true;
                }
                Err(_) => {
                    self.buffer.flush();
                    debug!(
                        "{}: no match within {:?}, last line {:?}",
                        self.label,
                        timeout,
                        String::from_utf8_lossy(self.buffer.last_line())
                    );
                    return self.emit(PromptKind::Timeout, self.buffer.len());
                }
            }
        }
    }

    /// Move queued chunks into the buffer. Returns true if the stream ended.
    fn drain(&mut self) -> bool {
        loop {
            match self.transport.try_recv() {
                Ok(Some(chunk)) => self.buffer.extend(&chunk),
                Ok(None) => return false,
                Err(e) => {
                    trace!("{}: drain stopped: {}", self.label, e);
                    self.buffer.flush();
                    return true;
                }
            }
        }
    }

    /// Consume through `end`; the transcript gets the bytes as received.
    fn emit(&mut self, kind: PromptKind, end: usize) -> PromptOutcome {
        let span = self.buffer.consume(end);
        self.sink.write(&span);
        PromptOutcome::new(kind, String::from_utf8_lossy(&span))
    }

    /// Write text that did not come from the device, such as the summary.
    pub fn annotate(&mut self, text: &str) {
        self.sink.write(text.as_bytes());
    }

    /// Output received but not yet consumed by a wait.
    pub fn unread(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    /// Terminate the remote shell.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}
