//! Recording sink and a real-socket peer for round-trip tests.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use sockline::{ResultInfo, ResultSink, SessionError};

/// Every callback a session delivered, in order.
#[derive(Debug, Clone)]
pub enum SinkEvent {
    Success(ResultInfo),
    Error(ResultInfo, String),
    Timeout(ResultInfo),
}

/// `ResultSink` that records each delivery for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ResultSink for RecordingSink {
    fn on_success(&self, info: ResultInfo) {
        self.events.lock().unwrap().push(SinkEvent::Success(info));
    }

    fn on_error(&self, info: ResultInfo, error: SessionError) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Error(info, error.to_string()));
    }

    fn on_timeout(&self, info: ResultInfo) {
        self.events.lock().unwrap().push(SinkEvent::Timeout(info));
    }
}

/// One-shot peer on a real socket: accepts a single connection, reads until
/// the request ends with the sentinel, replies with `response`, then closes
/// its stream to signal completion. Returns everything it received.
pub async fn spawn_sentinel_peer(response: Vec<u8>) -> (SocketAddr, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind peer");
    let addr = listener.local_addr().expect("peer addr");
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut received = Vec::new();
        let mut buf = [0u8; 1024];
        while !received.ends_with(b"EOF") {
            let read = stream.read(&mut buf).await.expect("peer read");
            if read == 0 {
                break;
            }
            received.extend_from_slice(&buf[..read]);
        }
        stream.write_all(&response).await.expect("peer write");
        stream.shutdown().await.expect("peer shutdown");
        received
    });
    (addr, handle)
}
