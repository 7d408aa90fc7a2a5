//! Connector error taxonomy.
//!
//! Decode failures are deliberately absent from this set: a malformed inbound
//! record is logged and skipped inside the connector task and never surfaces
//! to a caller (see [`crate::message::DecodeError`]). Unexpected closures are
//! likewise invisible here — they trigger the reconnect policy instead.

use thiserror::Error;

/// Failures surfaced to callers of [`Connector`](crate::Connector) operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// No connection completed within the connect deadline.
    #[error("connect timed out — is the capture service running elevated?")]
    ConnectTimeout,

    /// The transport refused the connection attempt.
    #[error("connect failed: {0}")]
    Connect(#[source] std::io::Error),

    /// Operation attempted while disconnected.
    #[error("not connected to the capture service")]
    NotConnected,

    /// The transport rejected a write.
    #[error("write failed: {0}")]
    Write(#[source] std::io::Error),

    /// No matching reply arrived within the request deadline.
    #[error("request timed out waiting for a reply")]
    RequestTimeout,

    /// One unterminated inbound record exceeded the configured cap; the
    /// connection was dropped and the buffered data discarded.
    #[error("inbound record exceeded {0} bytes without a terminator")]
    FrameTooLarge(usize),

    /// The connector task has shut down (every handle was dropped or the
    /// runtime is tearing down).
    #[error("connector is closed")]
    Closed,
}
