use super::*;
use serde_json::json;

#[test]
fn resolve_without_waiters_reports_unconsumed() {
    let mut table = ReplyTable::new();
    assert!(!table.resolve(MessageKind::ProcessesResponse, &json!({})));
}

#[tokio::test]
async fn registered_waiter_receives_the_payload() {
    let mut table = ReplyTable::new();
    let rx = table.register(MessageKind::ProcessesResponse);

    let payload = json!({ "processes": [] });
    assert!(table.resolve(MessageKind::ProcessesResponse, &payload));
    assert_eq!(rx.await.expect("payload"), payload);
    assert_eq!(table.waiting(MessageKind::ProcessesResponse), 0);
}

#[tokio::test]
async fn waiters_resolve_in_registration_order() {
    let mut table = ReplyTable::new();
    let first = table.register(MessageKind::ProcessesResponse);
    let second = table.register(MessageKind::ProcessesResponse);

    assert!(table.resolve(MessageKind::ProcessesResponse, &json!({ "seq": 1 })));
    assert!(table.resolve(MessageKind::ProcessesResponse, &json!({ "seq": 2 })));

    assert_eq!(first.await.expect("first"), json!({ "seq": 1 }));
    assert_eq!(second.await.expect("second"), json!({ "seq": 2 }));
}

#[tokio::test]
async fn stale_waiter_is_skipped_and_discarded() {
    let mut table = ReplyTable::new();
    let timed_out = table.register(MessageKind::ProcessesResponse);
    let live = table.register(MessageKind::ProcessesResponse);
    drop(timed_out);

    assert!(table.resolve(MessageKind::ProcessesResponse, &json!({ "seq": 1 })));
    assert_eq!(live.await.expect("live waiter"), json!({ "seq": 1 }));
    assert_eq!(table.waiting(MessageKind::ProcessesResponse), 0);
}

#[test]
fn all_stale_waiters_leave_the_payload_unconsumed() {
    let mut table = ReplyTable::new();
    drop(table.register(MessageKind::ProcessesResponse));
    drop(table.register(MessageKind::ProcessesResponse));

    assert!(!table.resolve(MessageKind::ProcessesResponse, &json!({})));
    assert_eq!(table.waiting(MessageKind::ProcessesResponse), 0);
}

#[test]
fn kinds_keep_independent_queues() {
    let mut table = ReplyTable::new();
    let _status = table.register(MessageKind::ScanStatus);
    let _processes = table.register(MessageKind::ProcessesResponse);

    assert_eq!(table.waiting(MessageKind::ScanStatus), 1);
    assert_eq!(table.waiting(MessageKind::ProcessesResponse), 1);
    assert!(!table.resolve(MessageKind::TrafficUpdate, &json!({})));
}
