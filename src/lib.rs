//! caplink — async connector to the local packet-capture service.
//!
//! ARCHITECTURE
//! ============
//! The capture service is a separate, administrator-elevated process that
//! listens on a local TCP port and speaks newline-delimited JSON. This crate
//! owns the client side of that link: socket lifecycle with transparent
//! reconnection, stream framing, message decoding, push-event fan-out, and
//! request/reply correlation with timeouts.
//!
//! One spawned task (see [`Connector::spawn`]) exclusively owns the socket,
//! the receive buffer, the subscriber registry, and the pending-reply table.
//! The cloneable [`Connector`] handle talks to it over a channel, so callers
//! on any thread get serialized access for free.

pub mod bus;
pub mod config;
pub mod connector;
pub mod error;
pub mod framing;
pub mod message;
pub mod reply;

pub use bus::SubscriptionId;
pub use config::ConnectorConfig;
pub use connector::{Connector, Subscription};
pub use error::ConnectorError;
pub use message::{
    Command, ConnectionInfo, MessageKind, ProcessInfo, ProcessList, ScanStatus, ServiceMessage,
    TrafficUpdate,
};
