//! The watch stream multiplexer.
//!
//! One [`WatchStream`] owns one transport and multiplexes every subscriber
//! whose context metadata maps to the same stream key. The core loop is
//! single-threaded cooperative: a single scheduler task is the sole
//! mutator of multiplexer state, and everything else talks to it over
//! channels:
//!
//! ```text
//! watch()/request_progress()  --reqc-->  scheduler  <--respc-- reader task
//!                                           ^  ^
//!                  serve loops --closingc---+  +----errc-- reader task
//! ```
//!
//! On transport loss the scheduler reclaims every subscriber, reconnects
//! with bounded exponential backoff and re-registers them from their last
//! observed revision, so subscribers see no gaps and no duplicates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use revkv_proto::watch as wire;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::context::{CancelHandle, WatchContext};
use crate::error::WatchError;
use crate::response::{WatchChan, WatchResponse};
use crate::substream::{ServeExit, SubStream, WatchSpec};
use crate::transport::{serve_source, WatchChannel, WatchConnector, WatchSink};
use crate::watcher::WatcherShared;

pub(crate) const RESUME_BACKOFF_INITIAL: Duration = Duration::from_millis(1);
pub(crate) const RESUME_BACKOFF_MAX: Duration = Duration::from_millis(100);

/// A watch waiting for its create response; `ret_tx` hands the delivery
/// channel back to the caller.
pub(crate) struct PendingWatch {
    pub spec: WatchSpec,
    pub ret_tx: oneshot::Sender<WatchChan>,
}

pub(crate) enum StreamRequest {
    Watch(Box<PendingWatch>),
    Progress,
}

/// Scheduler-side view of a running serve loop.
struct SubEntry {
    token: u64,
    /// Ingest channel; `None` once closed, which is what shuts the serve
    /// loop down.
    recvc_tx: Option<mpsc::Sender<WatchResponse>>,
    /// Set once a terminal response was routed; no further responses are
    /// delivered while the serve loop drains and reports closure.
    closing: bool,
    /// Yields the state machine back when the loop exits for resumption.
    join: JoinHandle<Option<SubStream>>,
}

/// A subscriber awaiting its create response. `entry` is `None` for an
/// abandoned slot whose create may still be in flight.
struct ResumeSlot {
    frame: wire::WatchRequest,
    entry: Option<SubEntry>,
}

/// Shared face of a running stream, held by the watcher facade.
#[derive(Clone)]
pub(crate) struct StreamHandle {
    pub gen: u64,
    pub reqc_tx: mpsc::Sender<StreamRequest>,
    pub done_rx: watch::Receiver<bool>,
    pub cancel: Arc<CancelHandle>,
    pub close_err: Arc<Mutex<Option<WatchError>>>,
}

impl StreamHandle {
    pub fn close_error(&self) -> Option<WatchError> {
        self.close_err.lock().clone()
    }

    /// Resolves once the stream scheduler has fully torn down.
    pub async fn done(&self) {
        let mut rx = self.done_rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }

    pub async fn close(&self) -> Option<WatchError> {
        self.cancel.cancel();
        self.done().await;
        self.close_error()
    }
}

pub(crate) struct WatchStream {
    /// Carries the caller's metadata with an independent cancellation, so
    /// stream metadata outlives any single caller context.
    ctx: WatchContext,
    /// Shared with the facade handle; fired at teardown so the reader
    /// pump never outlives the scheduler.
    cancel: Arc<CancelHandle>,
    ctx_key: String,
    gen: u64,
    connector: Arc<dyn WatchConnector>,
    shared: Arc<WatcherShared>,

    reqc_rx: Option<mpsc::Receiver<StreamRequest>>,
    respc_tx: mpsc::Sender<wire::WatchResponse>,
    respc_rx: Option<mpsc::Receiver<wire::WatchResponse>>,
    errc_tx: mpsc::Sender<WatchError>,
    errc_rx: Option<mpsc::Receiver<WatchError>>,
    closingc_tx: mpsc::UnboundedSender<SubStream>,
    closingc_rx: Option<mpsc::UnboundedReceiver<SubStream>>,

    /// Resumption epoch latch; firing it makes every serve loop exit and
    /// hand its state machine back.
    resume_tx: watch::Sender<()>,
    done_tx: watch::Sender<bool>,

    /// Active subscribers keyed by server-assigned watch id.
    substreams: HashMap<i64, SubEntry>,
    /// Subscribers awaiting creation, in request order. Only the head may
    /// have a create in flight.
    resuming: VecDeque<ResumeSlot>,

    close_err: Option<WatchError>,
    close_err_shared: Arc<Mutex<Option<WatchError>>>,
    next_token: u64,
}

impl WatchStream {
    /// Spawn a stream scheduler for `caller_ctx`'s metadata and return its
    /// handle.
    pub(crate) fn spawn(
        connector: Arc<dyn WatchConnector>,
        caller_ctx: &WatchContext,
        shared: Arc<WatcherShared>,
        gen: u64,
    ) -> StreamHandle {
        let (cancel, ctx) = WatchContext::new(caller_ctx.metadata().clone());
        let cancel = Arc::new(cancel);
        let ctx_key = ctx.metadata().stream_key();

        let (reqc_tx, reqc_rx) = mpsc::channel(1);
        let (respc_tx, respc_rx) = mpsc::channel(1);
        let (errc_tx, errc_rx) = mpsc::channel(1);
        let (closingc_tx, closingc_rx) = mpsc::unbounded_channel();
        let (resume_tx, _) = watch::channel(());
        let (done_tx, done_rx) = watch::channel(false);
        let close_err_shared = Arc::new(Mutex::new(None));

        let stream = Self {
            ctx,
            cancel: cancel.clone(),
            ctx_key,
            gen,
            connector,
            shared,
            reqc_rx: Some(reqc_rx),
            respc_tx,
            respc_rx: Some(respc_rx),
            errc_tx,
            errc_rx: Some(errc_rx),
            closingc_tx,
            closingc_rx: Some(closingc_rx),
            resume_tx,
            done_tx,
            substreams: HashMap::new(),
            resuming: VecDeque::new(),
            close_err: None,
            close_err_shared: close_err_shared.clone(),
            next_token: 1,
        };
        tokio::spawn(stream.run());

        StreamHandle {
            gen,
            reqc_tx,
            done_rx,
            cancel,
            close_err: close_err_shared,
        }
    }

    async fn run(mut self) {
        info!(ctx_key = %self.ctx_key, "watch stream started");

        let mut reqc_rx = self.reqc_rx.take().expect("request receiver already taken");
        let mut respc_rx = self.respc_rx.take().expect("response receiver already taken");
        let mut errc_rx = self.errc_rx.take().expect("error receiver already taken");
        let mut closingc_rx = self.closingc_rx.take().expect("closing receiver already taken");

        self.event_loop(&mut reqc_rx, &mut respc_rx, &mut errc_rx, &mut closingc_rx)
            .await;
        self.teardown(&mut closingc_rx).await;
    }

    async fn event_loop(
        &mut self,
        reqc: &mut mpsc::Receiver<StreamRequest>,
        respc: &mut mpsc::Receiver<wire::WatchResponse>,
        errc: &mut mpsc::Receiver<WatchError>,
        closingc: &mut mpsc::UnboundedReceiver<SubStream>,
    ) {
        let ctx = self.ctx.clone();
        let mut cancel_set: HashSet<i64> = HashSet::new();
        let mut cur: Option<wire::WatchResponse> = None;

        let mut sink = match self.new_transport().await {
            Ok(sink) => sink,
            Err(err) => {
                self.record_close_err(err);
                return;
            }
        };

        loop {
            tokio::select! {
                // The scheduler drains buffered responses before acting on
                // a reader failure; the reader pushes its error only after
                // its last response was accepted.
                biased;

                _ = ctx.cancelled() => return,

                Some(pbresp) = respc.recv() => {
                    self.handle_response(pbresp, &mut sink, &mut cur, &mut cancel_set).await;
                }

                Some(err) = errc.recv() => {
                    if err.is_halt() {
                        self.record_close_err(err);
                        return;
                    }
                    debug!(ctx_key = %self.ctx_key, error = %err, "watch transport lost; resuming");
                    match self.new_transport().await {
                        Ok(new_sink) => {
                            sink = new_sink;
                            cur = None;
                            cancel_set.clear();
                        }
                        Err(err) => {
                            self.record_close_err(err);
                            return;
                        }
                    }
                }

                Some(sub) = closingc.recv() => {
                    let bound_id = self.close_substream(sub).await;
                    if self.substreams.is_empty()
                        && self.resuming.iter().all(|slot| slot.entry.is_none())
                    {
                        return;
                    }
                    if let Some(id) = bound_id {
                        // Let the server release the watch eagerly instead
                        // of waiting for its next response to bounce.
                        if cancel_set.insert(id) {
                            debug!(watch_id = id, "canceling departed watcher on the server");
                            if let Err(e) = sink.send(wire::WatchRequest::cancel(id)).await {
                                debug!(error = %e, "failed to send cancel request");
                            }
                        }
                    }
                }

                Some(req) = reqc.recv() => match req {
                    StreamRequest::Watch(pending) => self.register(*pending, &mut sink).await,
                    StreamRequest::Progress => {
                        if let Err(e) = sink.send(wire::WatchRequest::progress()).await {
                            debug!(error = %e, "failed to send progress request");
                        }
                    }
                },
            }
        }
    }

    /// Queue a new subscriber and send its create if it is the sole
    /// element; otherwise its create goes out when the predecessor's
    /// create response lands.
    async fn register(&mut self, pending: PendingWatch, sink: &mut Box<dyn WatchSink>) {
        let token = self.next_token;
        self.next_token += 1;

        let sub = SubStream::new(token, pending.spec, pending.ret_tx);
        let frame = sub.init.to_create_frame();
        trace!(token, key = ?sub.init.key, "queueing watcher for creation");

        let entry = self.spawn_substream(sub);
        self.resuming.push_back(ResumeSlot {
            frame: frame.clone(),
            entry: Some(entry),
        });
        if self.resuming.len() == 1 {
            if let Err(e) = sink.send(frame).await {
                debug!(error = %e, "failed to send create request");
            }
        }
    }

    async fn handle_response(
        &mut self,
        mut pbresp: wire::WatchResponse,
        sink: &mut Box<dyn WatchSink>,
        cur: &mut Option<wire::WatchResponse>,
        cancel_set: &mut HashSet<i64>,
    ) {
        let watch_id = pbresp.watch_id;
        let created = pbresp.created;
        let canceled = pbresp.canceled;
        let compact_revision = pbresp.compact_revision;
        let cancel_reason = pbresp.cancel_reason.clone();

        // Coalesce fragments. A created or canceled flag flushes the
        // pending partial as-is.
        match cur.as_mut() {
            Some(partial) if !created && !canceled && partial.watch_id == watch_id => {
                partial.events.append(&mut pbresp.events);
                partial.fragment = pbresp.fragment;
            }
            _ => *cur = Some(pbresp),
        }

        if created {
            // The response answers the head of the resume queue; an
            // abandoned head resolves to nothing.
            if let Some(entry) = self.resuming.pop_front().and_then(|slot| slot.entry) {
                if watch_id == -1 || (canceled && !cancel_reason.is_empty()) {
                    let err = if cancel_reason.is_empty() {
                        WatchError::FutureRevision
                    } else {
                        WatchError::Canceled(cancel_reason)
                    };
                    warn!(error = %err, "watch creation rejected by server");
                    self.record_close_err(err);
                    // Dropping the entry closes its ingest channel; the
                    // serve loop reports through closingc.
                    drop(entry);
                } else {
                    self.substreams.insert(watch_id, entry);
                    if let Some(resp) = cur.take() {
                        self.dispatch(resp).await;
                    }
                }
            }

            // Advance the queue: at most one create in flight.
            if let Some(frame) = self.next_resume_frame() {
                if let Err(e) = sink.send(frame).await {
                    debug!(error = %e, "failed to send create request");
                }
            }
            *cur = None;
            return;
        }

        if canceled && compact_revision == 0 {
            // Server-side cancellation; terminal for this watch id. The
            // subscriber still receives this response - it carries the
            // cancel reason - and its serve loop ends after delivering it.
            cancel_set.remove(&watch_id);
            let deliver = match self.substreams.get_mut(&watch_id) {
                Some(entry) if !entry.closing => {
                    entry.closing = true;
                    true
                }
                _ => false,
            };
            if deliver {
                if let Some(resp) = cur.take() {
                    self.dispatch_terminal(resp).await;
                }
            }
            *cur = None;
            return;
        }

        if cur.as_ref().is_some_and(|c| c.fragment) {
            // Wait for the terminating fragment.
            return;
        }

        let Some(full) = cur.take() else { return };
        if !self.dispatch(full).await {
            // Response for a watch id we no longer know; cancel it on the
            // server, at most once per id.
            if cancel_set.insert(watch_id) {
                debug!(watch_id, "canceling response for unknown watch id");
                if let Err(e) = sink.send(wire::WatchRequest::cancel(watch_id)).await {
                    debug!(error = %e, "failed to send cancel request");
                }
            }
        }
    }

    /// Route a complete response to its subscriber. A progress notify with
    /// watch id -1 is broadcast to every subscriber.
    async fn dispatch(&self, pbresp: wire::WatchResponse) -> bool {
        let watch_id = pbresp.watch_id;
        let resp = WatchResponse::from_wire(pbresp);

        if resp.is_progress_notify() && watch_id == -1 {
            for entry in self.substreams.values() {
                if entry.closing {
                    continue;
                }
                if let Some(tx) = &entry.recvc_tx {
                    let _ = tx.send(resp.clone()).await;
                }
            }
            return true;
        }

        match self.substreams.get(&watch_id) {
            Some(SubEntry {
                recvc_tx: Some(tx),
                closing: false,
                ..
            }) => tx.send(resp).await.is_ok(),
            _ => false,
        }
    }

    /// Deliver a terminal cancellation response to its subscriber.
    async fn dispatch_terminal(&self, pbresp: wire::WatchResponse) {
        let watch_id = pbresp.watch_id;
        let resp = WatchResponse::from_wire(pbresp);
        if let Some(SubEntry {
            recvc_tx: Some(tx), ..
        }) = self.substreams.get(&watch_id)
        {
            let _ = tx.send(resp).await;
        }
    }

    fn spawn_substream(&self, sub: SubStream) -> SubEntry {
        let (recvc_tx, recvc_rx) = mpsc::channel(1);
        let mux_ctx = self.ctx.clone();
        let resume_rx = self.resume_tx.subscribe();
        let closingc = self.closingc_tx.clone();
        let token = sub.token;

        let join = tokio::spawn(async move {
            match sub.serve(recvc_rx, mux_ctx, resume_rx).await {
                (sub, ServeExit::Resuming) => Some(sub),
                (sub, ServeExit::Closed) => {
                    let _ = closingc.send(sub);
                    None
                }
            }
        });

        SubEntry {
            token,
            recvc_tx: Some(recvc_tx),
            closing: false,
            join,
        }
    }

    /// Remove a departed subscriber and finish it. Returns the
    /// server-assigned watch id if the watch was established.
    async fn close_substream(&mut self, mut sub: SubStream) -> Option<i64> {
        let token = sub.token;
        let bound_id = self
            .substreams
            .iter()
            .find_map(|(id, entry)| (entry.token == token).then_some(*id));
        if let Some(id) = bound_id {
            self.substreams.remove(&id);
        } else if let Some(slot) = self
            .resuming
            .iter_mut()
            .find(|slot| slot.entry.as_ref().is_some_and(|e| e.token == token))
        {
            slot.entry = None;
        }
        trace!(token, watch_id = ?bound_id, "watcher closed");

        // Publish the channel in case the watch was never established.
        sub.publish_ret();
        let close_err = self.close_err.clone();
        if close_err.is_some() && !sub.init.ctx.is_cancelled() {
            // Best-effort final error response; never stall the scheduler.
            tokio::spawn(sub.finish(close_err));
        } else {
            sub.finish(None).await;
        }
        bound_id
    }

    /// Skip abandoned slots and return the create frame for the next
    /// subscriber awaiting registration.
    fn next_resume_frame(&mut self) -> Option<wire::WatchRequest> {
        while let Some(slot) = self.resuming.front() {
            if slot.entry.is_some() {
                return Some(slot.frame.clone());
            }
            self.resuming.pop_front();
        }
        None
    }

    /// Open a transport and (re-)register every subscriber on it.
    ///
    /// On entry every serve loop is stopped via the resumption latch and
    /// its state machine reclaimed; each re-issued create then carries the
    /// subscriber's current next revision, which is what makes resumption
    /// gap- and duplicate-free.
    async fn new_transport(&mut self) -> Result<Box<dyn WatchSink>, WatchError> {
        let _ = self.resume_tx.send(());

        let mut reclaimed: Vec<SubStream> = Vec::new();
        for slot in std::mem::take(&mut self.resuming) {
            if let Some(entry) = slot.entry {
                if let Some(sub) = entry.join.await.ok().flatten() {
                    reclaimed.push(sub);
                }
            }
        }
        let entries: Vec<SubEntry> = self.substreams.drain().map(|(_, e)| e).collect();
        for entry in entries {
            if let Some(sub) = entry.join.await.ok().flatten() {
                reclaimed.push(sub);
            }
        }

        // Reconnect with bounded exponential backoff. Subscribers whose
        // caller context ended while disconnected are closed out here
        // instead of being re-registered.
        let mut backoff = RESUME_BACKOFF_INITIAL;
        let connected = loop {
            if self.ctx.is_cancelled() {
                break Err(WatchError::ContextCanceled);
            }
            let mut i = 0;
            while i < reclaimed.len() {
                if reclaimed[i].init.ctx.is_cancelled() {
                    let sub = reclaimed.swap_remove(i);
                    sub.finish(None).await;
                } else {
                    i += 1;
                }
            }
            match self.connector.connect(self.ctx.metadata()).await {
                Ok(channel) => break Ok(channel),
                Err(err) if err.is_halt() => break Err(err),
                Err(err) => {
                    debug!(
                        error = %err,
                        backoff_ms = backoff.as_millis() as u64,
                        "watch transport connect failed; backing off"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = backoff + backoff / 4;
                    if backoff > RESUME_BACKOFF_MAX {
                        backoff = RESUME_BACKOFF_MAX;
                    }
                }
            }
        };

        // Re-queue and respawn every survivor even when the connect
        // failed, so teardown closes them all through the same path.
        for mut sub in reclaimed {
            sub.id = -1;
            let frame = sub.init.to_create_frame();
            let entry = self.spawn_substream(sub);
            self.resuming.push_back(ResumeSlot {
                frame,
                entry: Some(entry),
            });
        }

        let WatchChannel { mut sink, source } = connected?;
        if let Some(frame) = self.next_resume_frame() {
            if let Err(e) = sink.send(frame).await {
                debug!(error = %e, "failed to send create request");
            }
        }
        tokio::spawn(serve_source(
            source,
            self.respc_tx.clone(),
            self.errc_tx.clone(),
            self.ctx.clone(),
        ));
        Ok(sink)
    }

    async fn teardown(&mut self, closingc: &mut mpsc::UnboundedReceiver<SubStream>) {
        info!(
            ctx_key = %self.ctx_key,
            error = ?self.close_err,
            "watch stream closing"
        );

        // Take the transport reader and any straggling serve loop down
        // with the scheduler.
        self.cancel.cancel();

        // Close every ingest channel exactly once, then join the serve
        // loops; each reports through closingc on its way out.
        let mut joins = Vec::new();
        for (_, mut entry) in self.substreams.drain() {
            entry.recvc_tx = None;
            joins.push(entry.join);
        }
        for slot in std::mem::take(&mut self.resuming) {
            if let Some(mut entry) = slot.entry {
                entry.recvc_tx = None;
                joins.push(entry.join);
            }
        }
        for join in joins {
            if let Ok(Some(sub)) = join.await {
                let _ = self.closingc_tx.send(sub);
            }
        }
        while let Ok(sub) = closingc.try_recv() {
            self.close_substream(sub).await;
        }

        *self.close_err_shared.lock() = self.close_err.clone();
        self.shared.remove_stream(&self.ctx_key, self.gen);
        let _ = self.done_tx.send(true);
    }

    fn record_close_err(&mut self, err: WatchError) {
        if self.close_err.is_none() {
            self.close_err = Some(err);
        }
    }
}
