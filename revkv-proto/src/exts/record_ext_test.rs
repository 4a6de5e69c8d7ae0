use bytes::Bytes;

use crate::record::{
    log_record::Op, request_op, ClusterVersionSetRequest, LogRecord, PutRequest, RangeRequest,
    RequestOp, TxnRequest,
};

fn range_op(serializable: bool) -> RequestOp {
    RequestOp {
        request: Some(request_op::Request::Range(RangeRequest {
            key: Bytes::from_static(b"k"),
            serializable,
            ..Default::default()
        })),
    }
}

fn put_op() -> RequestOp {
    RequestOp {
        request: Some(request_op::Request::Put(PutRequest {
            key: Bytes::from_static(b"k"),
            value: Bytes::from_static(b"v"),
            ..Default::default()
        })),
    }
}

#[test]
fn serializable_txn_needs_serializable_ranges_in_both_branches() {
    let txn = TxnRequest {
        success: vec![range_op(true)],
        failure: vec![range_op(true)],
        ..Default::default()
    };
    assert!(txn.is_serializable());
    assert!(txn.is_read_only());

    let mixed = TxnRequest {
        success: vec![range_op(true)],
        failure: vec![range_op(false)],
        ..Default::default()
    };
    assert!(!mixed.is_serializable());
    assert!(mixed.is_read_only());
}

#[test]
fn writers_are_never_serializable() {
    let txn = TxnRequest {
        success: vec![range_op(true), put_op()],
        failure: vec![range_op(true)],
        ..Default::default()
    };
    assert!(!txn.is_serializable());
    assert!(!txn.is_read_only());
}

#[test]
fn empty_txn_is_trivially_read_only() {
    let txn = TxnRequest::default();
    assert!(txn.is_serializable());
    assert!(txn.is_read_only());
}

#[test]
fn internal_records_are_flagged() {
    let internal = LogRecord {
        header: None,
        op: Some(Op::ClusterVersionSet(ClusterVersionSetRequest {
            ver: "3.6".into(),
        })),
    };
    assert!(internal.is_internal());
    assert_eq!(internal.op_name(), "ClusterVersionSet");

    let put = LogRecord {
        header: None,
        op: Some(Op::Put(PutRequest::default())),
    };
    assert!(!put.is_internal());
    assert_eq!(put.op_name(), "Put");
    assert_eq!(LogRecord::default().op_name(), "None");
}
