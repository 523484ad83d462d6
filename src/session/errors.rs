use crate::wire::DecodeError;
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy for one session. Every variant is converted into a
/// `ResultInfo` plus a single sink callback; no error crosses the session
/// boundary as a panic.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Any failure reported by the underlying stream: connect refusal,
    /// reset, broken pipe. Recoverable through retry while budget remains.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// No stream activity within the connection-phase deadline. Terminal;
    /// a timeout never consumes a retry.
    #[error("no stream activity within {after:?}")]
    Timeout { after: Duration },

    /// The accumulated response could not be decoded under the configured
    /// text encoding. Terminal.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}
