//! Scripted stream and connector mocks for exercising the session state
//! machine without real sockets: partial writes, mid-send failures, refused
//! connections, and connects that never complete.

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use sockline::transport::Connector;

/// Everything a scripted stream accepted from the session.
#[derive(Debug, Default)]
pub struct WriteRecord {
    /// Bytes actually accepted, in order.
    pub data: Vec<u8>,
    /// Size of each write call as requested by the session.
    pub requested: Vec<usize>,
}

pub type SharedWriteRecord = Arc<Mutex<WriteRecord>>;

/// In-memory peer for one attempt: returns scripted response chunks on
/// reads (EOF once exhausted), records writes, and can cap how many bytes
/// each write call accepts or fail outright after a threshold.
pub struct ScriptedStream {
    response: VecDeque<Vec<u8>>,
    write_caps: VecDeque<usize>,
    fail_write_after: Option<usize>,
    record: SharedWriteRecord,
}

impl ScriptedStream {
    /// Stream whose read side yields `chunks` then end-of-stream.
    pub fn replying(chunks: Vec<Vec<u8>>) -> (Self, SharedWriteRecord) {
        let record = SharedWriteRecord::default();
        let stream = Self {
            response: chunks.into(),
            write_caps: VecDeque::new(),
            fail_write_after: None,
            record: Arc::clone(&record),
        };
        (stream, record)
    }

    /// Accept at most the given number of bytes per write call, in order;
    /// unlimited once the list is exhausted.
    pub fn with_write_caps(mut self, caps: &[usize]) -> Self {
        self.write_caps = caps.iter().copied().collect();
        self
    }

    /// Fail writes with a broken pipe once this many bytes were accepted.
    pub fn failing_write_after(mut self, accepted: usize) -> Self {
        self.fail_write_after = Some(accepted);
        self
    }
}

impl AsyncRead for ScriptedStream {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if let Some(mut chunk) = this.response.pop_front() {
            let take = usize::min(chunk.len(), buf.remaining());
            buf.put_slice(&chunk[..take]);
            if take < chunk.len() {
                this.response.push_front(chunk.split_off(take));
            }
        }
        // nothing queued: report end-of-stream
        Poll::Ready(Ok(()))
    }
}

impl AsyncWrite for ScriptedStream {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let mut record = this.record.lock().unwrap();
        record.requested.push(buf.len());

        if let Some(limit) = this.fail_write_after {
            if record.data.len() >= limit {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::BrokenPipe,
                    "peer reset during send",
                )));
            }
        }

        let cap = this.write_caps.pop_front().unwrap_or(buf.len());
        let accepted = usize::min(cap, buf.len());
        record.data.extend_from_slice(&buf[..accepted]);
        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

/// One planned outcome per connection attempt.
pub enum Planned {
    Stream(ScriptedStream),
    Fail(io::Error),
}

/// Hands out one planned outcome per `connect` call; refuses the connection
/// once the plan is exhausted. Counts attempts.
pub struct ScriptedConnector {
    plan: Mutex<VecDeque<Planned>>,
    attempts: Arc<AtomicU32>,
}

impl ScriptedConnector {
    pub fn new(plan: Vec<Planned>) -> Self {
        Self {
            plan: Mutex::new(plan.into()),
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Refuses every connection attempt.
    pub fn refusing() -> Self {
        Self::new(Vec::new())
    }

    /// Shared attempt counter, usable after the connector moved into a
    /// session.
    pub fn attempt_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<ScriptedStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let next = self.plan.lock().unwrap().pop_front();
        match next {
            Some(Planned::Stream(stream)) => Ok(stream),
            Some(Planned::Fail(err)) => Err(err),
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            )),
        }
    }
}

/// A connect that never completes; drives the connection deadline.
pub struct NeverConnector {
    attempts: Arc<AtomicU32>,
}

impl NeverConnector {
    pub fn new() -> Self {
        Self {
            attempts: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn attempt_counter(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.attempts)
    }
}

impl Default for NeverConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for NeverConnector {
    type Stream = ScriptedStream;

    async fn connect(&self, _host: &str, _port: u16) -> io::Result<ScriptedStream> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<io::Result<ScriptedStream>>().await
    }
}
