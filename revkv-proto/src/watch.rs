//! Watch stream frames.
//!
//! A client-to-server frame is a [`WatchRequest`] holding exactly one of
//! create, cancel or progress. A server-to-client frame is a
//! [`WatchResponse`]. Large logical responses may be split by the server
//! into several frames with `fragment = true`; the terminating frame
//! carries `fragment = false`.

use bytes::Bytes;

use crate::kv::{Event, ResponseHeader};

/// Event classes a watcher can ask the server to withhold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum FilterType {
    /// Filter out put events.
    NoPut = 0,
    /// Filter out delete events.
    NoDelete = 1,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchCreateRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: Bytes,

    /// End of the watched range, exclusive. Empty means single key.
    #[prost(bytes = "bytes", tag = "2")]
    pub range_end: Bytes,

    /// First revision of interest, inclusive. 0 means "current".
    #[prost(int64, tag = "3")]
    pub start_revision: i64,

    /// Ask the server for periodic progress responses when idle.
    #[prost(bool, tag = "4")]
    pub progress_notify: bool,

    #[prost(enumeration = "FilterType", repeated, tag = "5")]
    pub filters: Vec<i32>,

    /// Populate the previous key-value on each event.
    #[prost(bool, tag = "6")]
    pub prev_kv: bool,

    /// Allow the server to split large responses into fragments.
    #[prost(bool, tag = "7")]
    pub fragment: bool,

    /// Client-suggested watch id; 0 lets the server assign one.
    #[prost(int64, tag = "8")]
    pub watch_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchCancelRequest {
    #[prost(int64, tag = "1")]
    pub watch_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchProgressRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchRequest {
    #[prost(oneof = "watch_request::Union", tags = "1, 2, 3")]
    pub union: Option<watch_request::Union>,
}

pub mod watch_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Union {
        #[prost(message, tag = "1")]
        CreateRequest(super::WatchCreateRequest),
        #[prost(message, tag = "2")]
        CancelRequest(super::WatchCancelRequest),
        #[prost(message, tag = "3")]
        ProgressRequest(super::WatchProgressRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct WatchResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    /// The watch this response addresses. -1 on a broadcast progress
    /// response.
    #[prost(int64, tag = "2")]
    pub watch_id: i64,

    /// Set on the response acknowledging a create request.
    #[prost(bool, tag = "3")]
    pub created: bool,

    /// Set when the watch has ended; no further responses follow for this
    /// watch id.
    #[prost(bool, tag = "4")]
    pub canceled: bool,

    /// Non-zero when the requested start revision was compacted away; the
    /// value is the minimum revision still watchable.
    #[prost(int64, tag = "5")]
    pub compact_revision: i64,

    #[prost(string, tag = "6")]
    pub cancel_reason: String,

    /// This frame is a non-final piece of a fragmented logical response.
    #[prost(bool, tag = "7")]
    pub fragment: bool,

    #[prost(message, repeated, tag = "8")]
    pub events: Vec<Event>,
}
