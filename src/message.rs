//! Wire messages — kinds, decode, commands, and typed payload views.
//!
//! DESIGN
//! ======
//! Every inbound record is one JSON object carrying a discriminator and a
//! payload. The service is not case-consistent about its field names: both
//! `type` / `Type` and `data` / `Data` appear on the wire, so the decoder
//! accepts either spelling of each. The kind set is closed — an unknown
//! discriminator is the router's cue to log and drop the record, never to
//! fail the connection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// KINDS
// =============================================================================

/// Closed set of inbound message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Per-connection byte counters. Push.
    TrafficUpdate,
    /// A newly observed process descriptor. Push.
    ProcessDetected,
    /// Reply to `get-processes`.
    ProcessesResponse,
    /// Capture on/off acknowledgement. Push.
    ScanStatus,
}

impl MessageKind {
    /// Kinds the service emits unsolicited; these fan out to subscribers.
    #[must_use]
    pub fn is_push(self) -> bool {
        !matches!(self, Self::ProcessesResponse)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TrafficUpdate => "traffic-update",
            Self::ProcessDetected => "process-detected",
            Self::ProcessesResponse => "processes-response",
            Self::ScanStatus => "scan-status",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "traffic-update" => Some(Self::TrafficUpdate),
            "process-detected" => Some(Self::ProcessDetected),
            "processes-response" => Some(Self::ProcessesResponse),
            "scan-status" => Some(Self::ScanStatus),
            _ => None,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// DECODE
// =============================================================================

/// One decoded inbound message: discriminator plus opaque structured payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceMessage {
    pub kind: MessageKind,
    pub data: Value,
}

/// Why a record failed to decode. Local to the router: logged and the record
/// skipped, never surfaced to a caller.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("record is not a json object")]
    NotAnObject,
    #[error("missing discriminator field")]
    MissingKind,
    #[error("unknown message kind: {0}")]
    UnknownKind(String),
}

impl ServiceMessage {
    /// Decode one complete record.
    ///
    /// Accepts `type` / `Type` for the discriminator and `data` / `Data` for
    /// the payload. A missing payload decodes as JSON null.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] when the record is not a JSON object, names
    /// no recognized kind, or carries no discriminator at all.
    pub fn decode(record: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(record)?;
        let Value::Object(map) = value else {
            return Err(DecodeError::NotAnObject);
        };
        let raw_kind = map
            .get("type")
            .or_else(|| map.get("Type"))
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingKind)?;
        let kind = MessageKind::parse(raw_kind)
            .ok_or_else(|| DecodeError::UnknownKind(raw_kind.to_owned()))?;
        let data = map
            .get("data")
            .or_else(|| map.get("Data"))
            .cloned()
            .unwrap_or(Value::Null);
        Ok(Self { kind, data })
    }

    /// Deserialize the payload into a typed view.
    ///
    /// # Errors
    ///
    /// Returns the serde error when the payload does not match `T`.
    pub fn payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

/// Outbound commands, encoded as `{"command":"<verb>"}` plus one terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin capture. Acknowledged asynchronously via `scan-status`.
    Start,
    /// End capture. Acknowledged asynchronously via `scan-status`.
    Stop,
    /// Enumerate processes with observed traffic. Answered by
    /// `processes-response`.
    GetProcesses,
}

impl Command {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::GetProcesses => "get-processes",
        }
    }

    /// One terminated wire record.
    #[must_use]
    pub fn to_record(self) -> String {
        format!("{}\n", serde_json::json!({ "command": self.verb() }))
    }
}

// =============================================================================
// PAYLOAD VIEWS
// =============================================================================

/// Process descriptor carried by `process-detected` and `processes-response`.
///
/// The security fields were added to the service later; older builds omit
/// them, so they default rather than fail the decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessInfo {
    pub pid: u32,
    pub name: String,
    pub executable_path: String,
    /// Base64-encoded icon, when the service could extract one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub connections: u32,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub protocols: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destinations: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_details: Option<Vec<ConnectionInfo>>,
    #[serde(default)]
    pub is_signed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub security_warnings: Vec<String>,
}

/// Per-connection detail row on a [`ProcessInfo`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub protocol: String,
    pub local_address: String,
    pub local_port: u16,
    pub remote_address: String,
    pub remote_port: u16,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

/// Payload of `traffic-update`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficUpdate {
    pub process_id: u32,
    pub protocol: String,
    pub local_address: String,
    pub local_port: u16,
    pub remote_address: String,
    pub remote_port: u16,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub timestamp: u64,
}

/// Payload of `scan-status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStatus {
    #[serde(alias = "isScanning")]
    pub scanning: bool,
}

/// Payload of `processes-response`. A response with no `processes` field
/// decodes as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessList {
    #[serde(default)]
    pub processes: Vec<ProcessInfo>,
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
