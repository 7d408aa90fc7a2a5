//! Connector configuration — endpoint and timing knobs.
//!
//! Defaults match the capture service's fixed local endpoint. Host and port
//! can be overridden through `CAPLINK_HOST` / `CAPLINK_PORT` when developing
//! against a relocated service.

use std::time::Duration;

/// Tunables for one [`Connector`](crate::Connector) instance.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Capture service host. Default `localhost`.
    pub host: String,
    /// Capture service port. Default `9876`.
    pub port: u16,
    /// Deadline for a single connect attempt.
    pub connect_timeout: Duration,
    /// Fixed wait after an unexpected disconnect before one reconnect attempt.
    pub reconnect_delay: Duration,
    /// Default deadline for a request awaiting its reply.
    pub request_timeout: Duration,
    /// Optional cap on one unterminated inbound record. When the receive
    /// buffer grows past this without seeing a terminator, the connection is
    /// dropped and the buffered data discarded instead of growing without
    /// bound. `None` preserves the service's historical unbounded behavior.
    pub max_record_len: Option<usize>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 9876,
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
            max_record_len: None,
        }
    }
}

impl ConnectorConfig {
    /// Default config with `CAPLINK_HOST` / `CAPLINK_PORT` applied on top.
    /// An unparseable port is logged and ignored.
    #[must_use]
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(host) = std::env::var("CAPLINK_HOST") {
            if !host.is_empty() {
                cfg.host = host;
            }
        }
        if let Ok(port) = std::env::var("CAPLINK_PORT") {
            match port.parse() {
                Ok(p) => cfg.port = p,
                Err(e) => tracing::warn!(error = %e, port, "invalid CAPLINK_PORT ignored"),
            }
        }
        cfg
    }

    /// `host:port` form used for the TCP connect.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
