use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::session::errors::SessionError;

pub const STATUS_OK: i32 = 0;
pub const STATUS_TRANSPORT_ERROR: i32 = -1;
pub const STATUS_TIMEOUT: i32 = -2;

/// Terminal result of a session, constructed fresh for each delivery and
/// never reused across attempts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultInfo {
    /// Caller-supplied label, echoed back unchanged.
    pub tag: Option<String>,
    /// Decoded response payload; empty on failure.
    pub message: String,
    pub status_code: i32,
    pub status_message: String,
}

impl ResultInfo {
    pub fn success(tag: Option<String>, message: String) -> Self {
        Self {
            tag,
            message,
            status_code: STATUS_OK,
            status_message: "OK".to_string(),
        }
    }

    pub fn failure(tag: Option<String>, error: &SessionError) -> Self {
        Self {
            tag,
            message: String::new(),
            status_code: STATUS_TRANSPORT_ERROR,
            status_message: error.to_string(),
        }
    }

    pub fn timed_out(tag: Option<String>) -> Self {
        Self {
            tag,
            message: String::new(),
            status_code: STATUS_TIMEOUT,
            status_message: "TimeOut".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }
}

/// Delegate notified exactly once per session, with exactly one of the three
/// callbacks. The session holds this non-owningly; implementations must be
/// shareable across tasks.
pub trait ResultSink: Send + Sync {
    fn on_success(&self, info: ResultInfo);
    fn on_error(&self, info: ResultInfo, error: SessionError);
    fn on_timeout(&self, info: ResultInfo);
}

/// The three terminal deliveries, as a value. Produced by `OutcomeChannel`
/// for callers that prefer awaiting a future over implementing a delegate.
#[derive(Debug)]
pub enum SessionOutcome {
    Success(ResultInfo),
    Error(ResultInfo, SessionError),
    Timeout(ResultInfo),
}

impl SessionOutcome {
    pub fn info(&self) -> &ResultInfo {
        match self {
            SessionOutcome::Success(info)
            | SessionOutcome::Error(info, _)
            | SessionOutcome::Timeout(info) => info,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Success(_))
    }
}

/// `ResultSink` adapter that forwards the single terminal delivery into a
/// oneshot channel. The sender is consumed on first delivery, so the
/// exactly-once contract holds even against a misbehaving caller.
pub struct OutcomeChannel {
    tx: Mutex<Option<oneshot::Sender<SessionOutcome>>>,
}

impl OutcomeChannel {
    /// Returns the sink half (to hand to the session) and the awaitable
    /// receiver half.
    pub fn pair() -> (Arc<Self>, oneshot::Receiver<SessionOutcome>) {
        let (tx, rx) = oneshot::channel();
        let channel = Arc::new(Self {
            tx: Mutex::new(Some(tx)),
        });
        (channel, rx)
    }

    fn push(&self, outcome: SessionOutcome) {
        let mut slot = match self.tx.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let Some(tx) = slot.take() else {
            warn!("terminal outcome delivered more than once; ignoring");
            return;
        };
        if tx.send(outcome).is_err() {
            debug!("outcome receiver dropped before delivery");
        }
    }
}

impl ResultSink for OutcomeChannel {
    fn on_success(&self, info: ResultInfo) {
        self.push(SessionOutcome::Success(info));
    }

    fn on_error(&self, info: ResultInfo, error: SessionError) {
        self.push(SessionOutcome::Error(info, error));
    }

    fn on_timeout(&self, info: ResultInfo) {
        self.push(SessionOutcome::Timeout(info));
    }
}
