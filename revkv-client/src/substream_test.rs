//! Unit tests for the subscriber serve loop.

use std::time::Duration;

use bytes::Bytes;
use revkv_proto::watch as wire;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::context::{CancelHandle, StreamMetadata, WatchContext};
use crate::error::WatchError;
use crate::response::{WatchChan, WatchResponse};
use crate::substream::{ServeExit, SubStream, WatchSpec};
use crate::testutil::{header, put_event};

struct Harness {
    recvc_tx: mpsc::Sender<WatchResponse>,
    ret_rx: oneshot::Receiver<WatchChan>,
    resume_tx: watch::Sender<()>,
    caller_cancel: CancelHandle,
    _mux_cancel: CancelHandle,
    join: JoinHandle<(SubStream, ServeExit)>,
}

fn spawn_substream(rev: i64, created_notify: bool) -> Harness {
    let (caller_cancel, ctx) = WatchContext::new(StreamMetadata::new());
    let (mux_cancel, mux_ctx) = WatchContext::new(StreamMetadata::new());
    let (ret_tx, ret_rx) = oneshot::channel();
    let (recvc_tx, recvc_rx) = mpsc::channel(1);
    let (resume_tx, resume_rx) = watch::channel(());

    let spec = WatchSpec {
        ctx,
        key: Bytes::from_static(b"k"),
        range_end: Bytes::new(),
        rev,
        progress_notify: false,
        fragment: false,
        prev_kv: false,
        created_notify,
        filters: Vec::new(),
    };
    let sub = SubStream::new(1, spec, ret_tx);
    let join = tokio::spawn(sub.serve(recvc_rx, mux_ctx, resume_rx));

    Harness {
        recvc_tx,
        ret_rx,
        resume_tx,
        caller_cancel,
        _mux_cancel: mux_cancel,
        join,
    }
}

fn created(watch_id: i64, revision: i64) -> WatchResponse {
    WatchResponse::from_wire(wire::WatchResponse {
        header: header(revision),
        watch_id,
        created: true,
        ..Default::default()
    })
}

fn events(watch_id: i64, revision: i64, evs: Vec<revkv_proto::kv::Event>) -> WatchResponse {
    WatchResponse::from_wire(wire::WatchResponse {
        header: header(revision),
        watch_id,
        events: evs,
        ..Default::default()
    })
}

#[tokio::test]
async fn first_create_publishes_the_channel_once() {
    let mut h = spawn_substream(0, false);

    h.recvc_tx.send(created(7, 10)).await.unwrap();
    let mut chan = timeout(Duration::from_secs(1), h.ret_rx)
        .await
        .expect("create should publish the channel")
        .unwrap();

    // created_notify off: the creation response itself is not delivered
    assert!(
        timeout(Duration::from_millis(50), chan.recv()).await.is_err(),
        "no response expected without created_notify"
    );

    h.recvc_tx
        .send(events(7, 11, vec![put_event("k", "v", 11)]))
        .await
        .unwrap();
    let resp = chan.recv().await.expect("event batch");
    assert_eq!(resp.events.len(), 1);
}

#[tokio::test]
async fn created_notify_delivers_the_creation_response() {
    let mut h = spawn_substream(0, true);

    h.recvc_tx.send(created(3, 5)).await.unwrap();
    let mut chan = h.ret_rx.await.unwrap();

    let resp = timeout(Duration::from_secs(1), chan.recv())
        .await
        .expect("created notification expected")
        .unwrap();
    assert!(resp.created);
    assert!(resp.err().is_none());
}

#[tokio::test]
async fn rev_zero_watch_resumes_at_creation_revision() {
    let mut h = spawn_substream(0, false);

    // Created at store revision 10; nothing observed yet.
    h.recvc_tx.send(created(1, 10)).await.unwrap();
    let _chan = h.ret_rx.await.unwrap();

    // Reclaim via the resumption latch; the retained request must resume
    // at the creation-time store revision.
    h.resume_tx.send(()).unwrap();
    let (sub, exit) = h.join.await.unwrap();
    assert!(matches!(exit, ServeExit::Resuming));
    assert_eq!(sub.init.rev, 10);
}

#[tokio::test]
async fn events_advance_the_resume_revision_monotonically() {
    let mut h = spawn_substream(4, false);

    h.recvc_tx.send(created(1, 9)).await.unwrap();
    let mut chan = h.ret_rx.await.unwrap();

    h.recvc_tx
        .send(events(
            1,
            11,
            vec![put_event("k", "a", 10), put_event("k", "b", 11)],
        ))
        .await
        .unwrap();
    assert_eq!(chan.recv().await.unwrap().events.len(), 2);

    // A stale progress header must not move the revision backwards.
    h.recvc_tx
        .send(WatchResponse::from_wire(wire::WatchResponse {
            header: header(6),
            watch_id: 1,
            ..Default::default()
        }))
        .await
        .unwrap();
    assert!(chan.recv().await.unwrap().is_progress_notify());

    h.resume_tx.send(()).unwrap();
    let (sub, _) = h.join.await.unwrap();
    assert_eq!(sub.init.rev, 12, "resume revision is last mod revision + 1");
}

#[tokio::test]
async fn buffer_is_delivered_in_fifo_order() {
    let mut h = spawn_substream(0, false);
    h.recvc_tx.send(created(1, 1)).await.unwrap();
    let mut chan = h.ret_rx.await.unwrap();

    // The channel has capacity 1; the rest queues in the buffer.
    for rev in 2..=5 {
        h.recvc_tx
            .send(events(1, rev, vec![put_event("k", "v", rev)]))
            .await
            .unwrap();
    }
    for rev in 2..=5 {
        let resp = timeout(Duration::from_secs(1), chan.recv())
            .await
            .expect("buffered response")
            .unwrap();
        assert_eq!(resp.events[0].mod_revision(), rev);
    }
}

#[tokio::test]
async fn terminal_response_ends_the_loop_after_delivery() {
    let mut h = spawn_substream(7, false);
    h.recvc_tx.send(created(1, 7)).await.unwrap();
    let mut chan = h.ret_rx.await.unwrap();

    let compacted = WatchResponse::from_wire(wire::WatchResponse {
        header: header(9),
        watch_id: 1,
        canceled: true,
        compact_revision: 9,
        ..Default::default()
    });
    h.recvc_tx.send(compacted).await.unwrap();

    let last = chan.recv().await.expect("final compaction response");
    assert_eq!(last.err(), Some(WatchError::Compacted(9)));
    assert!(chan.recv().await.is_none(), "channel closes after terminal");

    let (_, exit) = h.join.await.unwrap();
    assert!(matches!(exit, ServeExit::Closed));
}

#[tokio::test]
async fn closed_ingest_ends_the_loop() {
    let h = spawn_substream(0, false);
    drop(h.recvc_tx);
    let (_, exit) = h.join.await.unwrap();
    assert!(matches!(exit, ServeExit::Closed));
}

#[tokio::test]
async fn caller_cancellation_ends_the_loop() {
    let h = spawn_substream(0, false);
    h.caller_cancel.cancel();
    let (_, exit) = timeout(Duration::from_secs(1), h.join)
        .await
        .expect("serve loop must observe caller cancellation")
        .unwrap();
    assert!(matches!(exit, ServeExit::Closed));
}

#[tokio::test]
async fn duplicate_creates_are_suppressed() {
    let mut h = spawn_substream(0, true);

    h.recvc_tx.send(created(1, 5)).await.unwrap();
    let mut chan = h.ret_rx.await.unwrap();
    assert!(chan.recv().await.unwrap().created);

    // A second create (as after resumption) must not surface again.
    h.recvc_tx.send(created(1, 6)).await.unwrap();
    assert!(
        timeout(Duration::from_millis(50), chan.recv()).await.is_err(),
        "resumed create must not produce a duplicate notification"
    );
}
