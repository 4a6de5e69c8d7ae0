//! Unit tests for the frame codec, including split-delivery decoding.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{decode_frame, encode_frame, CodecError, MAX_FRAME_BYTES};
use crate::watch::{WatchCancelRequest, WatchCreateRequest, WatchRequest, WatchResponse};

fn cancel_frame(watch_id: i64) -> WatchRequest {
    WatchRequest::cancel(watch_id)
}

#[test]
fn encode_then_decode_single_frame() {
    let mut buf = BytesMut::new();
    encode_frame(&cancel_frame(7), &mut buf).unwrap();

    let decoded: WatchRequest = decode_frame(&mut buf).unwrap().expect("one full frame");
    assert_eq!(decoded, cancel_frame(7));
    assert!(buf.is_empty());
}

#[test]
fn decode_waits_for_full_prefix() {
    let mut buf = BytesMut::new();
    buf.put_slice(&[0, 0]);

    let decoded = decode_frame::<WatchRequest>(&mut buf).unwrap();
    assert!(decoded.is_none());
    assert_eq!(buf.len(), 2);
}

#[test]
fn decode_waits_for_full_body() {
    let mut full = BytesMut::new();
    encode_frame(&cancel_frame(42), &mut full).unwrap();

    // Feed all but the last byte; no frame should come out.
    let mut partial = BytesMut::from(&full[..full.len() - 1]);
    assert!(decode_frame::<WatchRequest>(&mut partial).unwrap().is_none());

    // Completing the body yields the frame.
    partial.put_u8(full[full.len() - 1]);
    let decoded: WatchRequest = decode_frame(&mut partial).unwrap().expect("completed frame");
    assert_eq!(decoded, cancel_frame(42));
}

#[test]
fn decode_consumes_frames_in_order() {
    let mut buf = BytesMut::new();
    encode_frame(&cancel_frame(1), &mut buf).unwrap();
    encode_frame(&cancel_frame(2), &mut buf).unwrap();

    let first: WatchRequest = decode_frame(&mut buf).unwrap().expect("first frame");
    let second: WatchRequest = decode_frame(&mut buf).unwrap().expect("second frame");
    assert_eq!(first, cancel_frame(1));
    assert_eq!(second, cancel_frame(2));
    assert!(decode_frame::<WatchRequest>(&mut buf).unwrap().is_none());
}

#[test]
fn oversized_prefix_is_rejected() {
    let mut buf = BytesMut::new();
    buf.put_u32((MAX_FRAME_BYTES + 1) as u32);
    buf.put_slice(b"whatever");

    match decode_frame::<WatchResponse>(&mut buf) {
        Err(CodecError::FrameTooLarge(n)) => assert_eq!(n, MAX_FRAME_BYTES + 1),
        other => panic!("expected FrameTooLarge, got {other:?}"),
    }
}

#[test]
fn garbage_body_is_a_decode_error() {
    let mut buf = BytesMut::new();
    // A response whose body claims a truncated nested message.
    buf.put_u32(3);
    buf.put_slice(&[0x0a, 0xff, 0x01]);

    assert!(matches!(
        decode_frame::<WatchResponse>(&mut buf),
        Err(CodecError::Decode(_))
    ));
}

#[test]
fn bytes_fields_round_trip() {
    let create = WatchRequest::create(WatchCreateRequest {
        key: Bytes::from_static(b"a"),
        range_end: Bytes::from_static(b"b"),
        start_revision: 11,
        ..Default::default()
    });

    let mut buf = BytesMut::new();
    encode_frame(&create, &mut buf).unwrap();
    let decoded: WatchRequest = decode_frame(&mut buf).unwrap().expect("frame");
    assert_eq!(decoded, create);
}

#[test]
fn cancel_request_shape() {
    use crate::watch::watch_request::Union;

    match cancel_frame(9).union {
        Some(Union::CancelRequest(WatchCancelRequest { watch_id })) => assert_eq!(watch_id, 9),
        other => panic!("expected cancel union, got {other:?}"),
    }
}
