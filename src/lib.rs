pub mod cli;
pub mod session;
pub mod transport;
pub mod wire;

// Re-export key types for easy testing
pub use session::{
    CancelHandle, ConnectionSession, OutcomeChannel, ResultInfo, ResultSink, SessionConfig,
    SessionError, SessionOutcome, SessionState,
};
pub use transport::{Connector, TcpConnector};
