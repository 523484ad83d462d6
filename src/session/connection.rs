use std::sync::{Arc, Weak};
use tokio::sync::Notify;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, instrument, warn};

use crate::session::config::SessionConfig;
use crate::session::errors::SessionError;
use crate::session::outcome::{ResultInfo, ResultSink};
use crate::session::state::{Attempt, SessionState};
use crate::transport::Connector;
use crate::wire;

/// One logical request/response exchange over TCP, spanning all retry
/// attempts. Exactly one terminal callback fires per `start_*` call: the
/// sink's success, error, or timeout method, never more than one of them.
///
/// The exchange walks `Idle → Connecting → Sending → Receiving` and ends in
/// `Succeeded`, `Failed`, or `TimedOut`; a retryable failure loops back to
/// `Connecting` with a fresh transport after the configured backoff.
pub struct ConnectionSession<C: Connector> {
    connector: C,
    config: SessionConfig,
    sink: Weak<dyn ResultSink>,
    state: SessionState,
    cancel: Arc<Notify>,
}

/// Cancels a running session from another task. Cancellation closes the
/// transport, disarms the deadline, and delivers no callback.
#[derive(Clone)]
pub struct CancelHandle {
    cancel: Arc<Notify>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        // notify_one stores a permit, so cancelling before the session
        // reaches its first await still takes effect
        self.cancel.notify_one();
    }
}

/// Everything one `start_*` call carries across its retry attempts. The
/// payload already ends with the sentinel; `remaining_retries` only ever
/// decreases.
struct Exchange {
    tag: Option<String>,
    host: String,
    port: u16,
    payload: Vec<u8>,
    remaining_retries: u32,
}

impl<C: Connector> ConnectionSession<C> {
    pub fn new<S: ResultSink + 'static>(
        connector: C,
        config: SessionConfig,
        sink: &Arc<S>,
    ) -> Self {
        let sink: Arc<dyn ResultSink> = sink.clone();
        let sink: Weak<dyn ResultSink> = Arc::downgrade(&sink);
        Self {
            connector,
            config,
            sink,
            state: SessionState::Idle,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            cancel: Arc::clone(&self.cancel),
        }
    }

    /// Run one exchange with no retries and no tag.
    pub async fn start(&mut self, host: &str, port: u16, request: &str) {
        self.start_tagged(None, host, port, request, 0).await;
    }

    /// Run one exchange, re-attempting a failed connection `retry_count`
    /// times before surfacing the error.
    pub async fn start_with_retry(
        &mut self,
        host: &str,
        port: u16,
        request: &str,
        retry_count: u32,
    ) {
        self.start_tagged(None, host, port, request, retry_count).await;
    }

    /// Full-form entry point; every other `start_*` funnels here. The tag is
    /// echoed back unchanged in the terminal `ResultInfo`.
    #[instrument(skip_all, fields(host = %host, port, retry_count, tag))]
    pub async fn start_tagged(
        &mut self,
        tag: Option<&str>,
        host: &str,
        port: u16,
        request: &str,
        retry_count: u32,
    ) {
        self.state = SessionState::Idle;

        // sentinel goes on exactly once per session; retries reuse the payload
        let payload = wire::append_sentinel(request).into_bytes();
        let exchange = Exchange {
            tag: tag.map(str::to_owned),
            host: host.to_owned(),
            port,
            payload,
            remaining_retries: retry_count,
        };

        let cancel = Arc::clone(&self.cancel);
        let cancelled = tokio::select! {
            _ = cancel.notified() => true,
            _ = self.drive(exchange) => false,
        };
        if cancelled {
            info!("session cancelled; no callback delivered");
            self.state = SessionState::Cancelled;
        }
    }

    /// Retry loop around single attempts. Delivers the one terminal callback
    /// and returns.
    async fn drive(&mut self, mut exchange: Exchange) {
        let mut attempt_no: u32 = 1;
        loop {
            match self.run_attempt(&exchange, attempt_no).await {
                Ok(raw) => {
                    match wire::decode_text(&raw, self.config.encoding) {
                        Ok(message) => {
                            let info = ResultInfo::success(exchange.tag.clone(), message);
                            self.deliver_success(info);
                        }
                        Err(decode) => {
                            warn!(bytes = raw.len(), "response failed to decode");
                            let err = SessionError::from(decode);
                            let info = ResultInfo::failure(exchange.tag.clone(), &err);
                            self.deliver_error(info, err);
                        }
                    }
                    return;
                }
                Err(SessionError::Timeout { after }) => {
                    // terminal by design: a timeout never consumes a retry
                    warn!(attempt = attempt_no, deadline = ?after, "connection deadline elapsed");
                    let info = ResultInfo::timed_out(exchange.tag.clone());
                    self.deliver_timeout(info);
                    return;
                }
                Err(err) => {
                    if exchange.remaining_retries == 0 {
                        let info = ResultInfo::failure(exchange.tag.clone(), &err);
                        self.deliver_error(info, err);
                        return;
                    }
                    exchange.remaining_retries -= 1;
                    warn!(
                        attempt = attempt_no,
                        remaining = exchange.remaining_retries,
                        error = %err,
                        "attempt failed; retrying after backoff"
                    );
                    sleep(self.config.retry_backoff).await;
                    attempt_no += 1;
                }
            }
        }
    }

    /// One open-send-receive cycle against a fresh transport. The connect
    /// deadline covers only the gap until the stream opens; once the first
    /// stream event has been observed it is not re-armed.
    async fn run_attempt(
        &mut self,
        exchange: &Exchange,
        attempt_no: u32,
    ) -> Result<Vec<u8>, SessionError> {
        self.state = SessionState::Connecting { attempt: attempt_no };
        debug!(attempt = attempt_no, "opening transport");

        let connect = self.connector.connect(&exchange.host, exchange.port);
        let stream = match timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(err)) => return Err(SessionError::Transport(err)),
            Err(_) => {
                return Err(SessionError::Timeout {
                    after: self.config.connect_timeout,
                })
            }
        };

        let mut attempt = Attempt::new(stream);
        let result = self.pump(&mut attempt, exchange).await;
        attempt.close().await;
        result
    }

    /// Send then receive on an open attempt. Returns the raw accumulated
    /// response once the peer closes its write side.
    async fn pump(
        &mut self,
        attempt: &mut Attempt<C::Stream>,
        exchange: &Exchange,
    ) -> Result<Vec<u8>, SessionError> {
        self.state = SessionState::Sending;
        attempt.send(&exchange.payload, self.config.chunk_size).await?;
        debug!(bytes = attempt.bytes_sent(), "request fully written");

        self.state = SessionState::Receiving;
        let mut scratch = vec![0u8; self.config.chunk_size];
        loop {
            let read = attempt.read_some(&mut scratch).await?;
            if read == 0 {
                // end-of-stream: the peer has finished its response
                break;
            }
        }
        debug!(bytes = attempt.inbound_len(), "response complete");
        Ok(attempt.take_inbound())
    }

    fn deliver_success(&mut self, info: ResultInfo) {
        self.state = SessionState::Succeeded;
        info!(bytes = info.message.len(), "session succeeded");
        match self.sink.upgrade() {
            Some(sink) => sink.on_success(info),
            None => Self::sink_missing("success"),
        }
    }

    fn deliver_error(&mut self, info: ResultInfo, error: SessionError) {
        self.state = SessionState::Failed;
        error!(%error, "session failed");
        match self.sink.upgrade() {
            Some(sink) => sink.on_error(info, error),
            None => Self::sink_missing("error"),
        }
    }

    fn deliver_timeout(&mut self, info: ResultInfo) {
        self.state = SessionState::TimedOut;
        match self.sink.upgrade() {
            Some(sink) => sink.on_timeout(info),
            None => Self::sink_missing("timeout"),
        }
    }

    /// A dropped sink is a caller bug: loud in debug builds, logged in
    /// release, and never a crash of the runtime thread.
    fn sink_missing(which: &'static str) {
        error!(callback = which, "result sink was dropped before delivery");
        debug_assert!(false, "result sink dropped before {which} delivery");
    }
}
