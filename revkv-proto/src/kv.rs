//! Key-value records and the response header shared by every server reply.

use bytes::Bytes;

/// A single key-value record as stored by the server.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct KeyValue {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: Bytes,

    /// Revision at which this key was created (last created if recreated).
    #[prost(int64, tag = "2")]
    pub create_revision: i64,

    /// Revision of the last modification of this key.
    #[prost(int64, tag = "3")]
    pub mod_revision: i64,

    /// Number of modifications since creation; resets to 1 on recreation.
    #[prost(int64, tag = "4")]
    pub version: i64,

    #[prost(bytes = "bytes", tag = "5")]
    pub value: Bytes,

    /// Lease attached to the key, or 0 when unleased.
    #[prost(int64, tag = "6")]
    pub lease: i64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EventType {
    Put = 0,
    Delete = 1,
}

/// A change observed on a watched key range.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Event {
    #[prost(enumeration = "EventType", tag = "1")]
    pub event_type: i32,

    /// The key-value after the change. For a delete only the key and
    /// mod_revision are populated.
    #[prost(message, optional, tag = "2")]
    pub kv: Option<KeyValue>,

    /// The key-value before the change; populated only when the watch was
    /// created with prev_kv.
    #[prost(message, optional, tag = "3")]
    pub prev_kv: Option<KeyValue>,
}

/// Header stamped onto every server response.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseHeader {
    #[prost(uint64, tag = "1")]
    pub cluster_id: u64,

    #[prost(uint64, tag = "2")]
    pub member_id: u64,

    /// The store revision as of the response. Strictly increasing across
    /// any stream, including across leader changes.
    #[prost(int64, tag = "3")]
    pub revision: i64,

    #[prost(uint64, tag = "4")]
    pub raft_term: u64,
}
