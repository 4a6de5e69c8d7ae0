//! Scripted transport doubles for watch tests.
//!
//! A [`ScriptConnector`] hands out pre-registered in-memory transports in
//! order. The test holds the server half ([`ScriptServer`]) and plays the
//! remote endpoint: it asserts on outbound frames and injects responses or
//! read failures.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use revkv_proto::kv::{Event, EventType, KeyValue, ResponseHeader};
use revkv_proto::watch::{self as wire, watch_request::Union};
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::context::StreamMetadata;
use crate::error::WatchError;
use crate::transport::{WatchChannel, WatchConnector, WatchSink, WatchSource};

const SCRIPT_TIMEOUT: Duration = Duration::from_secs(3);

pub(crate) struct ScriptConnector {
    pending: Mutex<VecDeque<WatchChannel>>,
    connects: AtomicUsize,
}

impl ScriptConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(VecDeque::new()),
            connects: AtomicUsize::new(0),
        })
    }

    /// Pre-register one transport; the returned server half drives it.
    pub(crate) fn expect_connection(&self) -> ScriptServer {
        let (req_tx, req_rx) = mpsc::unbounded_channel();
        let (resp_tx, resp_rx) = mpsc::unbounded_channel();
        self.pending.lock().push_back(WatchChannel {
            sink: Box::new(ScriptSink { tx: req_tx }),
            source: Box::new(ScriptSource { rx: resp_rx }),
        });
        ScriptServer {
            reqs: req_rx,
            resp_tx,
        }
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WatchConnector for ScriptConnector {
    async fn connect(&self, _metadata: &StreamMetadata) -> Result<WatchChannel, WatchError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        self.pending
            .lock()
            .pop_front()
            .ok_or_else(|| WatchError::Connect("no scripted transport available".into()))
    }
}

struct ScriptSink {
    tx: mpsc::UnboundedSender<wire::WatchRequest>,
}

#[async_trait]
impl WatchSink for ScriptSink {
    async fn send(&mut self, frame: wire::WatchRequest) -> Result<(), WatchError> {
        self.tx
            .send(frame)
            .map_err(|_| WatchError::Transport("script transport closed".into()))
    }
}

struct ScriptSource {
    rx: mpsc::UnboundedReceiver<Result<wire::WatchResponse, WatchError>>,
}

#[async_trait]
impl WatchSource for ScriptSource {
    async fn recv(&mut self) -> Result<wire::WatchResponse, WatchError> {
        match self.rx.recv().await {
            Some(item) => item,
            None => Err(WatchError::Transport("script transport dropped".into())),
        }
    }
}

/// Server half of one scripted transport.
pub(crate) struct ScriptServer {
    reqs: mpsc::UnboundedReceiver<wire::WatchRequest>,
    resp_tx: mpsc::UnboundedSender<Result<wire::WatchResponse, WatchError>>,
}

impl ScriptServer {
    pub(crate) async fn recv_req(&mut self) -> wire::WatchRequest {
        timeout(SCRIPT_TIMEOUT, self.reqs.recv())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client side of the script transport dropped")
    }

    pub(crate) async fn expect_create(&mut self) -> wire::WatchCreateRequest {
        match self.recv_req().await.union {
            Some(Union::CreateRequest(req)) => req,
            other => panic!("expected a create request, got {other:?}"),
        }
    }

    pub(crate) async fn expect_cancel(&mut self) -> i64 {
        match self.recv_req().await.union {
            Some(Union::CancelRequest(req)) => req.watch_id,
            other => panic!("expected a cancel request, got {other:?}"),
        }
    }

    pub(crate) async fn expect_progress(&mut self) {
        match self.recv_req().await.union {
            Some(Union::ProgressRequest(_)) => {}
            other => panic!("expected a progress request, got {other:?}"),
        }
    }

    /// Assert no frame arrives within `window`.
    pub(crate) async fn expect_silence(&mut self, window: Duration) {
        if let Ok(frame) = timeout(window, self.reqs.recv()).await {
            panic!("expected no client frame, got {frame:?}");
        }
    }

    pub(crate) fn send(&self, resp: wire::WatchResponse) {
        self.resp_tx.send(Ok(resp)).expect("client reader gone");
    }

    /// Inject a read failure; the client multiplexer resumes (or halts).
    pub(crate) fn fail(&self, err: WatchError) {
        self.resp_tx.send(Err(err)).expect("client reader gone");
    }

    pub(crate) fn send_created(&self, watch_id: i64, revision: i64) {
        self.send(wire::WatchResponse {
            header: header(revision),
            watch_id,
            created: true,
            ..Default::default()
        });
    }

    pub(crate) fn send_events(&self, watch_id: i64, revision: i64, events: Vec<Event>) {
        self.send(wire::WatchResponse {
            header: header(revision),
            watch_id,
            events,
            ..Default::default()
        });
    }

    pub(crate) fn send_progress(&self, watch_id: i64, revision: i64) {
        self.send(wire::WatchResponse {
            header: header(revision),
            watch_id,
            ..Default::default()
        });
    }
}

pub(crate) fn header(revision: i64) -> Option<ResponseHeader> {
    Some(ResponseHeader {
        cluster_id: 1,
        member_id: 1,
        revision,
        raft_term: 1,
    })
}

pub(crate) fn put_event(key: &str, value: &str, mod_revision: i64) -> Event {
    Event {
        event_type: EventType::Put as i32,
        kv: Some(KeyValue {
            key: Bytes::copy_from_slice(key.as_bytes()),
            create_revision: mod_revision,
            mod_revision,
            version: 1,
            value: Bytes::copy_from_slice(value.as_bytes()),
            lease: 0,
        }),
        prev_kv: None,
    }
}
