use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::wire;

/// Lifecycle of one session. `Connecting` is re-entered on every retry with
/// an incremented attempt counter; the last four states are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting { attempt: u32 },
    Sending,
    Receiving,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl SessionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Succeeded
                | SessionState::Failed
                | SessionState::TimedOut
                | SessionState::Cancelled
        )
    }
}

/// Per-attempt bookkeeping: the open stream, the outbound cursor, and the
/// inbound buffer. Recreated on every retry so partial data from a failed
/// attempt never leaks into the next one.
pub(crate) struct Attempt<S> {
    stream: Option<S>,
    cursor: usize,
    inbound: Vec<u8>,
}

impl<S: AsyncRead + AsyncWrite + Unpin> Attempt<S> {
    pub fn new(stream: S) -> Self {
        Self {
            stream: Some(stream),
            cursor: 0,
            inbound: Vec::new(),
        }
    }

    /// Stream the whole payload in chunks, then flush and (re)initialize the
    /// inbound buffer for the receive phase.
    pub async fn send(&mut self, payload: &[u8], chunk_size: usize) -> io::Result<()> {
        let stream = self.stream.as_mut().ok_or_else(closed)?;
        wire::write_chunked(stream, payload, chunk_size, &mut self.cursor).await?;
        stream.flush().await?;
        self.inbound = Vec::new();
        Ok(())
    }

    /// Pull one readable burst into the inbound buffer. Returns the byte
    /// count; 0 signals end-of-stream.
    pub async fn read_some(&mut self, scratch: &mut [u8]) -> io::Result<usize> {
        let stream = self.stream.as_mut().ok_or_else(closed)?;
        wire::read_into(stream, &mut self.inbound, scratch).await
    }

    pub fn bytes_sent(&self) -> usize {
        self.cursor
    }

    pub fn inbound_len(&self) -> usize {
        self.inbound.len()
    }

    pub fn take_inbound(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.inbound)
    }

    /// Shut down and release the stream. Idempotent: a second call is a
    /// no-op, never an error or a duplicate callback.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(error) = stream.shutdown().await {
                debug!(%error, "stream shutdown failed during close");
            }
        }
    }
}

fn closed() -> io::Error {
    io::Error::new(io::ErrorKind::NotConnected, "transport already closed")
}
