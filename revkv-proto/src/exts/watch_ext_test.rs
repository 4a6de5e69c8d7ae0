use bytes::Bytes;

use crate::kv::{Event, EventType, KeyValue, ResponseHeader};
use crate::watch::WatchResponse;

fn header(revision: i64) -> Option<ResponseHeader> {
    Some(ResponseHeader {
        cluster_id: 1,
        member_id: 1,
        revision,
        raft_term: 1,
    })
}

fn put_event(create_revision: i64, mod_revision: i64) -> Event {
    Event {
        event_type: EventType::Put as i32,
        kv: Some(KeyValue {
            key: Bytes::from_static(b"k"),
            create_revision,
            mod_revision,
            version: 1,
            value: Bytes::from_static(b"v"),
            lease: 0,
        }),
        prev_kv: None,
    }
}

#[test]
fn progress_notify_requires_bare_response_with_revision() {
    let progress = WatchResponse {
        header: header(9),
        watch_id: -1,
        ..Default::default()
    };
    assert!(progress.is_progress_notify());

    let with_events = WatchResponse {
        header: header(9),
        events: vec![put_event(9, 9)],
        ..Default::default()
    };
    assert!(!with_events.is_progress_notify());

    let canceled = WatchResponse {
        header: header(9),
        canceled: true,
        ..Default::default()
    };
    assert!(!canceled.is_progress_notify());

    let no_revision = WatchResponse::default();
    assert!(!no_revision.is_progress_notify());
}

#[test]
fn create_vs_modify() {
    assert!(put_event(5, 5).is_create());
    assert!(!put_event(5, 5).is_modify());
    assert!(put_event(5, 8).is_modify());
    assert!(!put_event(5, 8).is_create());

    let delete = Event {
        event_type: EventType::Delete as i32,
        ..put_event(5, 8)
    };
    assert!(!delete.is_create());
    assert!(!delete.is_modify());
}

#[test]
fn revision_defaults_to_zero_without_header() {
    assert_eq!(WatchResponse::default().revision(), 0);
    let resp = WatchResponse {
        header: header(33),
        ..Default::default()
    };
    assert_eq!(resp.revision(), 33);
}
