use encoding_rs::Encoding;
use std::time::Duration;

use crate::wire::SEND_CHUNK_SIZE;

/// Deadline for the connection phase; covers only the gap until the stream
/// opens and is never re-armed afterwards.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Pause between a failed attempt and the next connection attempt.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(3);

/// Tuning knobs for a session. All timing constants live here rather than
/// being hardwired into the state machine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub connect_timeout: Duration,
    pub retry_backoff: Duration,
    pub chunk_size: usize,
    /// Encoding applied to the accumulated response at finalization.
    pub encoding: &'static Encoding,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            chunk_size: SEND_CHUNK_SIZE,
            encoding: encoding_rs::SHIFT_JIS,
        }
    }
}

impl SessionConfig {
    pub fn new(
        connect_timeout: Duration,
        retry_backoff: Duration,
        chunk_size: usize,
        encoding: &'static Encoding,
    ) -> Self {
        Self {
            connect_timeout,
            retry_backoff,
            chunk_size,
            encoding,
        }
    }

    /// Custom connect deadline, defaults elsewhere.
    pub fn with_connect_timeout(connect_timeout: Duration) -> Self {
        Self {
            connect_timeout,
            ..Self::default()
        }
    }

    /// Custom connect deadline and retry backoff, defaults elsewhere.
    pub fn with_timings(connect_timeout: Duration, retry_backoff: Duration) -> Self {
        Self {
            connect_timeout,
            retry_backoff,
            ..Self::default()
        }
    }

    /// Custom response encoding, defaults elsewhere.
    pub fn with_encoding(encoding: &'static Encoding) -> Self {
        Self {
            encoding,
            ..Self::default()
        }
    }
}
