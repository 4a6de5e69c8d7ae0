//! The watcher facade.
//!
//! Groups stream multiplexers by an opaque context key so independent
//! request contexts never share a transport, and exposes the public
//! `watch` / `request_progress` / `close` surface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use revkv_proto::watch::FilterType;
use tokio::sync::{mpsc, oneshot};

use crate::context::WatchContext;
use crate::error::WatchError;
use crate::response::{WatchChan, WatchResponse};
use crate::stream::{PendingWatch, StreamHandle, StreamRequest, WatchStream};
use crate::substream::WatchSpec;
use crate::transport::WatchConnector;

/// Options for a single watch subscription.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    range_end: Bytes,
    prefix: bool,
    rev: i64,
    progress_notify: bool,
    fragment: bool,
    prev_kv: bool,
    created_notify: bool,
    filter_put: bool,
    filter_delete: bool,
}

impl WatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Watch the range `[key, end)` instead of a single key.
    pub fn with_range(mut self, end: impl Into<Bytes>) -> Self {
        self.range_end = end.into();
        self.prefix = false;
        self
    }

    /// Watch every key prefixed by the watch key.
    pub fn with_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }

    /// Start from a specific revision, inclusive. 0 means "current".
    pub fn from_revision(mut self, rev: i64) -> Self {
        self.rev = rev;
        self
    }

    /// Ask for periodic progress responses while the watch is idle.
    pub fn with_progress_notify(mut self) -> Self {
        self.progress_notify = true;
        self
    }

    /// Allow the server to fragment large responses.
    pub fn with_fragment(mut self) -> Self {
        self.fragment = true;
        self
    }

    /// Populate the previous key-value on each event.
    pub fn with_prev_kv(mut self) -> Self {
        self.prev_kv = true;
        self
    }

    /// Deliver the watch-created response on the channel.
    pub fn with_created_notify(mut self) -> Self {
        self.created_notify = true;
        self
    }

    pub fn with_filter_put(mut self) -> Self {
        self.filter_put = true;
        self
    }

    pub fn with_filter_delete(mut self) -> Self {
        self.filter_delete = true;
        self
    }
}

/// End of the range covering every key prefixed by `prefix`.
pub fn prefix_range_end(prefix: &[u8]) -> Bytes {
    let mut end = prefix.to_vec();
    while let Some(last) = end.last_mut() {
        if *last < 0xff {
            *last += 1;
            return Bytes::from(end);
        }
        end.pop();
    }
    // Every byte was 0xff; the range has no bounded end.
    Bytes::from_static(&[0])
}

/// State shared between the facade and its stream schedulers. Streams
/// remove themselves from the map when they finish.
pub(crate) struct WatcherShared {
    pub(crate) streams: Mutex<Option<HashMap<String, StreamHandle>>>,
}

impl WatcherShared {
    pub(crate) fn remove_stream(&self, key: &str, gen: u64) {
        let mut guard = self.streams.lock();
        if let Some(map) = guard.as_mut() {
            if map.get(key).is_some_and(|handle| handle.gen == gen) {
                map.remove(key);
            }
        }
    }
}

/// Watch client: many subscriptions multiplexed over few transports.
pub struct Watcher {
    connector: Arc<dyn WatchConnector>,
    shared: Arc<WatcherShared>,
    next_gen: AtomicU64,
}

impl Watcher {
    pub fn new(connector: Arc<dyn WatchConnector>) -> Self {
        Self {
            connector,
            shared: Arc::new(WatcherShared {
                streams: Mutex::new(Some(HashMap::new())),
            }),
            next_gen: AtomicU64::new(1),
        }
    }

    /// Subscribe to changes on `key` (or the range selected by `opts`).
    ///
    /// Returns the delivery channel. The channel closes when the
    /// subscription ends; when it ends abnormally the last response
    /// carries the error in [`WatchResponse::err`]. A closed watcher
    /// returns an already-closed channel.
    pub async fn watch(
        &self,
        ctx: &WatchContext,
        key: impl Into<Bytes>,
        opts: WatchOptions,
    ) -> WatchChan {
        let key = key.into();
        let range_end = if opts.prefix {
            prefix_range_end(&key)
        } else {
            opts.range_end.clone()
        };
        let mut filters = Vec::new();
        if opts.filter_put {
            filters.push(FilterType::NoPut as i32);
        }
        if opts.filter_delete {
            filters.push(FilterType::NoDelete as i32);
        }

        loop {
            let Some(handle) = self.pick_stream(ctx) else {
                return closed_chan();
            };

            let (ret_tx, ret_rx) = oneshot::channel();
            let spec = WatchSpec {
                ctx: ctx.clone(),
                key: key.clone(),
                range_end: range_end.clone(),
                rev: opts.rev,
                progress_notify: opts.progress_notify,
                fragment: opts.fragment,
                prev_kv: opts.prev_kv,
                created_notify: opts.created_notify,
                filters: filters.clone(),
            };
            let req = StreamRequest::Watch(Box::new(PendingWatch { spec, ret_tx }));

            // Submit; this only waits on a send slot, the caller context,
            // or stream shutdown.
            let submitted = tokio::select! {
                res = handle.reqc_tx.send(req) => res.is_ok(),
                _ = ctx.cancelled() => return closed_chan(),
                _ = handle.done() => false,
            };
            if !submitted {
                if let Some(err) = handle.close_error() {
                    return error_chan(err);
                }
                // The stream shut down with no subscribers left; retry on
                // a fresh one.
                continue;
            }

            tokio::select! {
                ret = ret_rx => match ret {
                    Ok(chan) => return chan,
                    Err(_) => {
                        handle.done().await;
                        if let Some(err) = handle.close_error() {
                            return error_chan(err);
                        }
                        continue;
                    }
                },
                _ = ctx.cancelled() => return closed_chan(),
            }
        }
    }

    /// Ask the stream selected by `ctx` for a progress response on every
    /// active subscription.
    pub async fn request_progress(&self, ctx: &WatchContext) -> Result<(), WatchError> {
        loop {
            let Some(handle) = self.pick_stream(ctx) else {
                return Err(WatchError::ClientClosed);
            };

            tokio::select! {
                res = handle.reqc_tx.send(StreamRequest::Progress) => {
                    if res.is_ok() {
                        return Ok(());
                    }
                    if let Some(err) = handle.close_error() {
                        return Err(err);
                    }
                }
                _ = ctx.cancelled() => return Err(WatchError::ContextCanceled),
                _ = handle.done() => {
                    if let Some(err) = handle.close_error() {
                        return Err(err);
                    }
                }
            }
        }
    }

    /// Close every stream and end every subscription. Returns the first
    /// close error that is not a plain context cancellation.
    pub async fn close(&self) -> Result<(), WatchError> {
        let streams = self.shared.streams.lock().take();
        let Some(map) = streams else {
            return Ok(());
        };

        let mut first_err = None;
        for handle in map.into_values() {
            if let Some(err) = handle.close().await {
                if first_err.is_none() && err != WatchError::ContextCanceled {
                    first_err = Some(err);
                }
            }
        }
        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Select or lazily create the stream for this context's metadata.
    fn pick_stream(&self, ctx: &WatchContext) -> Option<StreamHandle> {
        let mut guard = self.shared.streams.lock();
        let map = guard.as_mut()?;
        let key = ctx.metadata().stream_key();
        let handle = map.entry(key).or_insert_with(|| {
            let gen = self.next_gen.fetch_add(1, Ordering::Relaxed);
            WatchStream::spawn(self.connector.clone(), ctx, self.shared.clone(), gen)
        });
        Some(handle.clone())
    }
}

fn closed_chan() -> WatchChan {
    let (_tx, rx) = mpsc::channel(1);
    rx
}

fn error_chan(err: WatchError) -> WatchChan {
    let (tx, rx) = mpsc::channel(1);
    let _ = tx.try_send(WatchResponse::closed_with(err));
    rx
}
