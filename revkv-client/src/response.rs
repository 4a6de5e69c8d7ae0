//! The watch response delivered to subscribers.

use revkv_proto::kv::{Event, ResponseHeader};
use revkv_proto::watch as wire;
use tokio::sync::mpsc;

use crate::error::WatchError;

/// Receive side of a subscriber's delivery channel. Closes when the
/// subscription ends; a final response with `err()` set precedes the close
/// when the subscription ends abnormally.
pub type WatchChan = mpsc::Receiver<WatchResponse>;

#[derive(Debug, Clone, Default)]
pub struct WatchResponse {
    pub header: ResponseHeader,

    pub events: Vec<Event>,

    /// Non-zero when the requested start revision was compacted away.
    pub compact_revision: i64,

    /// The watch ended; this is the final response on the channel.
    pub canceled: bool,

    /// This response acknowledges watch creation.
    pub created: bool,

    pub(crate) watch_id: i64,

    pub(crate) cancel_reason: String,

    pub(crate) close_err: Option<WatchError>,
}

impl WatchResponse {
    pub(crate) fn from_wire(resp: wire::WatchResponse) -> Self {
        Self {
            header: resp.header.unwrap_or_default(),
            events: resp.events,
            compact_revision: resp.compact_revision,
            canceled: resp.canceled,
            created: resp.created,
            watch_id: resp.watch_id,
            cancel_reason: resp.cancel_reason,
            close_err: None,
        }
    }

    /// A final response carrying a stream-level close error.
    pub(crate) fn closed_with(err: WatchError) -> Self {
        Self {
            canceled: true,
            close_err: Some(err),
            ..Default::default()
        }
    }

    /// The error this response carries, if any. A non-`None` value means
    /// the subscription is over and the channel is about to close.
    pub fn err(&self) -> Option<WatchError> {
        if let Some(err) = &self.close_err {
            return Some(err.clone());
        }
        if self.compact_revision != 0 {
            return Some(WatchError::Compacted(self.compact_revision));
        }
        if self.canceled {
            return Some(if self.cancel_reason.is_empty() {
                WatchError::FutureRevision
            } else {
                WatchError::Canceled(self.cancel_reason.clone())
            });
        }
        None
    }

    /// True for a heartbeat-like response that only conveys the current
    /// store revision.
    pub fn is_progress_notify(&self) -> bool {
        self.events.is_empty()
            && !self.canceled
            && !self.created
            && self.compact_revision == 0
            && self.header.revision != 0
    }

    pub fn cancel_reason(&self) -> &str {
        &self.cancel_reason
    }
}
