use super::*;
use serde_json::json;

// ===== DECODE =====

#[test]
fn decodes_all_casing_combinations_identically() {
    let records = [
        r#"{"type":"scan-status","data":{"scanning":true}}"#,
        r#"{"Type":"scan-status","data":{"scanning":true}}"#,
        r#"{"type":"scan-status","Data":{"scanning":true}}"#,
        r#"{"Type":"scan-status","Data":{"scanning":true}}"#,
    ];
    for record in records {
        let msg = ServiceMessage::decode(record).expect("decode");
        assert_eq!(msg.kind, MessageKind::ScanStatus, "record {record}");
        assert_eq!(msg.data, json!({"scanning": true}), "record {record}");
    }
}

#[test]
fn missing_payload_decodes_as_null() {
    let msg = ServiceMessage::decode(r#"{"type":"scan-status"}"#).expect("decode");
    assert_eq!(msg.data, serde_json::Value::Null);
}

#[test]
fn unknown_kind_is_rejected_with_its_name() {
    let err = ServiceMessage::decode(r#"{"type":"heartbeat","data":{}}"#)
        .expect_err("unknown kind should fail");
    assert!(matches!(err, DecodeError::UnknownKind(k) if k == "heartbeat"));
}

#[test]
fn missing_discriminator_is_rejected() {
    let err = ServiceMessage::decode(r#"{"data":{}}"#).expect_err("no type field");
    assert!(matches!(err, DecodeError::MissingKind));
}

#[test]
fn non_object_record_is_rejected() {
    let err = ServiceMessage::decode(r#"[1,2,3]"#).expect_err("array is not a message");
    assert!(matches!(err, DecodeError::NotAnObject));
}

#[test]
fn invalid_json_is_rejected() {
    let err = ServiceMessage::decode("{not json}").expect_err("broken json");
    assert!(matches!(err, DecodeError::Json(_)));
}

// ===== KINDS =====

#[test]
fn kind_names_round_trip() {
    for kind in [
        MessageKind::TrafficUpdate,
        MessageKind::ProcessDetected,
        MessageKind::ProcessesResponse,
        MessageKind::ScanStatus,
    ] {
        assert_eq!(MessageKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(MessageKind::parse("nonsense"), None);
}

#[test]
fn only_processes_response_is_a_reply_kind() {
    assert!(MessageKind::TrafficUpdate.is_push());
    assert!(MessageKind::ProcessDetected.is_push());
    assert!(MessageKind::ScanStatus.is_push());
    assert!(!MessageKind::ProcessesResponse.is_push());
}

// ===== COMMANDS =====

#[test]
fn commands_encode_as_terminated_single_line_json() {
    assert_eq!(Command::Start.to_record(), "{\"command\":\"start\"}\n");
    assert_eq!(Command::Stop.to_record(), "{\"command\":\"stop\"}\n");
    assert_eq!(Command::GetProcesses.to_record(), "{\"command\":\"get-processes\"}\n");
}

// ===== PAYLOAD VIEWS =====

fn full_process_payload() -> serde_json::Value {
    json!({
        "pid": 4312,
        "name": "browser.exe",
        "executablePath": "C:\\Program Files\\Browser\\browser.exe",
        "icon": "aWNvbg==",
        "connections": 3,
        "bytesSent": 1024,
        "bytesReceived": 4096,
        "protocols": ["TCP", "UDP"],
        "destinations": ["93.184.216.34"],
        "connectionDetails": [{
            "protocol": "TCP",
            "localAddress": "127.0.0.1",
            "localPort": 50123,
            "remoteAddress": "93.184.216.34",
            "remotePort": 443,
            "state": "ESTABLISHED",
            "hostName": "example.com",
            "serviceName": "https",
            "bytesSent": 512,
            "bytesReceived": 2048
        }],
        "isSigned": true,
        "publisher": "Browser Corp",
        "riskLevel": "low",
        "securityWarnings": []
    })
}

#[test]
fn process_info_decodes_full_payload() {
    let p: ProcessInfo = serde_json::from_value(full_process_payload()).expect("decode");
    assert_eq!(p.pid, 4312);
    assert_eq!(p.name, "browser.exe");
    assert_eq!(p.icon.as_deref(), Some("aWNvbg=="));
    assert_eq!(p.bytes_received, 4096);
    assert_eq!(p.protocols, ["TCP", "UDP"]);
    assert!(p.is_signed);
    assert_eq!(p.publisher.as_deref(), Some("Browser Corp"));
    let details = p.connection_details.expect("details");
    assert_eq!(details[0].remote_port, 443);
    assert_eq!(details[0].host_name.as_deref(), Some("example.com"));
}

#[test]
fn process_info_defaults_security_fields_from_older_services() {
    let p: ProcessInfo = serde_json::from_value(json!({
        "pid": 8,
        "name": "svc",
        "executablePath": "/usr/bin/svc",
        "connections": 0,
        "bytesSent": 0,
        "bytesReceived": 0,
        "protocols": []
    }))
    .expect("decode");
    assert!(!p.is_signed);
    assert!(p.publisher.is_none());
    assert_eq!(p.risk_level, "");
    assert!(p.security_warnings.is_empty());
    assert!(p.icon.is_none());
}

#[test]
fn traffic_update_decodes_camel_case_wire_names() {
    let t: TrafficUpdate = serde_json::from_value(json!({
        "processId": 4312,
        "protocol": "TCP",
        "localAddress": "127.0.0.1",
        "localPort": 50123,
        "remoteAddress": "93.184.216.34",
        "remotePort": 443,
        "bytesIn": 100,
        "bytesOut": 40,
        "timestamp": 1_700_000_000_000_u64
    }))
    .expect("decode");
    assert_eq!(t.process_id, 4312);
    assert_eq!(t.bytes_in, 100);
    assert_eq!(t.remote_port, 443);
}

#[test]
fn scan_status_accepts_both_field_spellings() {
    let a: ScanStatus = serde_json::from_value(json!({"scanning": true})).expect("decode");
    let b: ScanStatus = serde_json::from_value(json!({"isScanning": true})).expect("decode");
    assert!(a.scanning);
    assert_eq!(a, b);
}

#[test]
fn process_list_defaults_to_empty_when_field_is_missing() {
    let list: ProcessList = serde_json::from_value(json!({})).expect("decode");
    assert!(list.processes.is_empty());
}

#[test]
fn message_payload_helper_deserializes_typed_view() {
    let msg = ServiceMessage::decode(r#"{"type":"scan-status","data":{"scanning":false}}"#)
        .expect("decode");
    let status: ScanStatus = msg.payload().expect("payload");
    assert!(!status.scanning);
}
