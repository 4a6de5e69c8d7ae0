//! Per-subscriber state and serve loop.
//!
//! A [`SubStream`] is one logical key-range subscription on a multiplexed
//! transport. The multiplexer owns subscribers by identifier and talks to
//! the serve loop only through channels; the serve loop owns the state
//! machine outright and hands it back when it exits.

use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use revkv_proto::watch as wire;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, warn};

use crate::context::WatchContext;
use crate::error::WatchError;
use crate::response::{WatchChan, WatchResponse};

/// Buffered responses past this point log a one-shot diagnostic; the
/// buffer itself stays unbounded so a slow subscriber never stalls the
/// multiplexer.
pub(crate) const BUF_HIGH_WATER_MARK: usize = 1024;

/// Best-effort window for delivering the final close-error response.
pub(crate) const CLOSE_SEND_TIMEOUT: Duration = Duration::from_millis(250);

/// The initiating watch request, retained for resumption. `rev` is kept in
/// sync with the subscriber's next expected revision, so a re-issued
/// create resumes exactly where delivery stopped.
pub(crate) struct WatchSpec {
    pub ctx: WatchContext,
    pub key: Bytes,
    pub range_end: Bytes,
    pub rev: i64,
    pub progress_notify: bool,
    pub fragment: bool,
    pub prev_kv: bool,
    pub created_notify: bool,
    pub filters: Vec<i32>,
}

impl WatchSpec {
    pub(crate) fn to_create_frame(&self) -> wire::WatchRequest {
        wire::WatchRequest::create(wire::WatchCreateRequest {
            key: self.key.clone(),
            range_end: self.range_end.clone(),
            start_revision: self.rev,
            progress_notify: self.progress_notify,
            filters: self.filters.clone(),
            prev_kv: self.prev_kv,
            fragment: self.fragment,
            watch_id: 0,
        })
    }
}

/// Why a serve loop ended.
pub(crate) enum ServeExit {
    /// The subscription is over; the multiplexer must finish closing it.
    Closed,
    /// The resumption latch fired; the multiplexer reclaims the state
    /// machine for re-registration on a new transport.
    Resuming,
}

pub(crate) struct SubStream {
    pub init: WatchSpec,

    /// Server-assigned watch id; -1 until the create response arrives.
    pub id: i64,

    /// Client-side identity, stable across transports.
    pub token: u64,

    /// Hands the delivery channel to the waiting `watch()` caller; taken
    /// on first use so duplicate creates never publish twice.
    ret_tx: Option<oneshot::Sender<WatchChan>>,

    outc_tx: mpsc::Sender<WatchResponse>,
    outc_rx: Option<WatchChan>,

    /// Responses received but not yet consumed by the subscriber.
    buf: VecDeque<WatchResponse>,
    warned_high_water: bool,
}

impl SubStream {
    pub(crate) fn new(token: u64, init: WatchSpec, ret_tx: oneshot::Sender<WatchChan>) -> Self {
        // Capacity 1: the buffer absorbs bursts, the channel is only a
        // hand-off slot.
        let (outc_tx, outc_rx) = mpsc::channel(1);
        Self {
            init,
            id: -1,
            token,
            ret_tx: Some(ret_tx),
            outc_tx,
            outc_rx: Some(outc_rx),
            buf: VecDeque::new(),
            warned_high_water: false,
        }
    }

    /// Serve the subscriber until it closes or the resumption latch fires.
    ///
    /// One iteration either offers the buffer head on the delivery channel
    /// or accepts a response from the multiplexer; delivery order is
    /// strictly FIFO, preserving revision order.
    pub(crate) async fn serve(
        mut self,
        mut recvc: mpsc::Receiver<WatchResponse>,
        mux_ctx: WatchContext,
        mut resume: watch::Receiver<()>,
    ) -> (Self, ServeExit) {
        let outc = self.outc_tx.clone();
        let caller_ctx = self.init.ctx.clone();
        let mut next_rev = self.init.rev;

        loop {
            tokio::select! {
                permit = outc.reserve(), if !self.buf.is_empty() => {
                    match permit {
                        Ok(permit) => {
                            if let Some(head) = self.buf.pop_front() {
                                let terminal = head.err();
                                permit.send(head);
                                if terminal.is_some() {
                                    return (self, ServeExit::Closed);
                                }
                            }
                        }
                        // The delivery channel was abandoned.
                        Err(_) => return (self, ServeExit::Closed),
                    }
                }
                maybe = recvc.recv() => {
                    match maybe {
                        Some(resp) => self.accept(resp, &mut next_rev),
                        // Ingest closed by the multiplexer.
                        None => return (self, ServeExit::Closed),
                    }
                }
                _ = caller_ctx.cancelled() => return (self, ServeExit::Closed),
                _ = mux_ctx.cancelled() => return (self, ServeExit::Closed),
                _ = resume.changed() => return (self, ServeExit::Resuming),
            }
        }
    }

    fn accept(&mut self, resp: WatchResponse, next_rev: &mut i64) {
        if resp.created {
            if resp.watch_id != -1 {
                self.id = resp.watch_id;
            }
            if let Some(ret) = self.ret_tx.take() {
                if let Some(chan) = self.outc_rx.take() {
                    if ret.send(chan).is_err() {
                        debug!(token = self.token, "watch caller left before creation");
                    }
                }
                // Forward the creation event only when asked; the channel
                // is empty here, so the slot is free.
                if self.init.created_notify {
                    let _ = self.outc_tx.try_send(resp.clone());
                }
                // A current-revision watch must resume at the revision the
                // store had when the watch was created, or a put committed
                // while disconnected would be skipped.
                if self.init.rev == 0 {
                    *next_rev = resp.header.revision;
                }
            }
        } else {
            // Progress of the watch; at most the store revision.
            *next_rev = (*next_rev).max(resp.header.revision);
        }

        if let Some(last) = resp.events.last() {
            *next_rev = (*next_rev).max(last.mod_revision() + 1);
        }
        self.init.rev = *next_rev;

        // The creation event was already forwarded above; resumed creates
        // must not surface again.
        if resp.created {
            return;
        }

        self.buf.push_back(resp);
        if self.buf.len() > BUF_HIGH_WATER_MARK && !self.warned_high_water {
            self.warned_high_water = true;
            warn!(
                watch_id = self.id,
                buffered = self.buf.len(),
                "subscriber is not draining; buffering past high-water mark"
            );
        }
    }

    /// Hand the delivery channel to the caller if creation never landed.
    pub(crate) fn publish_ret(&mut self) {
        if let Some(ret) = self.ret_tx.take() {
            if let Some(chan) = self.outc_rx.take() {
                let _ = ret.send(chan);
            }
        }
    }

    /// Finish the subscriber: publish the channel if pending, deliver a
    /// final close-error response when one applies, and close the channel.
    pub(crate) async fn finish(mut self, close_err: Option<WatchError>) {
        self.publish_ret();
        if let Some(err) = close_err {
            if !self.init.ctx.is_cancelled() {
                let resp = WatchResponse::closed_with(err);
                let _ = tokio::time::timeout(CLOSE_SEND_TIMEOUT, self.outc_tx.send(resp)).await;
            }
        }
        // Dropping self drops the last sender, closing the channel exactly
        // once.
    }
}
