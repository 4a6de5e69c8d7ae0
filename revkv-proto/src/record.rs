//! Replicated-log record types.
//!
//! A [`LogRecord`] is the unit proposed to the consensus layer and later
//! handed to the applier. It carries a [`RecordHeader`] and exactly one
//! operation. Three operation kinds are internal to the cluster
//! (ClusterVersionSet, ClusterMemberAttrSet, DowngradeInfoSet) and are
//! applied in every membership epoch.

use bytes::Bytes;

use crate::kv::{KeyValue, ResponseHeader};

/// Header stamped onto every proposed record by the proposal pipeline.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecordHeader {
    /// Unique request id, assigned by the proposing member.
    #[prost(uint64, tag = "1")]
    pub id: u64,

    /// Proposing user; empty for unauthenticated clusters and for
    /// authenticate records.
    #[prost(string, tag = "2")]
    pub username: String,

    /// Auth store revision the proposer authenticated against.
    #[prost(uint64, tag = "3")]
    pub auth_revision: u64,
}

// ---------------------------------------------------------------------------
// KV operations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "2")]
    pub range_end: Bytes,

    #[prost(int64, tag = "3")]
    pub limit: i64,

    /// Point-in-time revision to read at; 0 reads the latest.
    #[prost(int64, tag = "4")]
    pub revision: i64,

    /// Serve from local state without a linearizable-read barrier.
    #[prost(bool, tag = "5")]
    pub serializable: bool,

    #[prost(bool, tag = "6")]
    pub keys_only: bool,

    #[prost(bool, tag = "7")]
    pub count_only: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RangeResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(message, repeated, tag = "2")]
    pub kvs: Vec<KeyValue>,

    #[prost(bool, tag = "3")]
    pub more: bool,

    #[prost(int64, tag = "4")]
    pub count: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "2")]
    pub value: Bytes,

    #[prost(int64, tag = "3")]
    pub lease: i64,

    #[prost(bool, tag = "4")]
    pub prev_kv: bool,

    #[prost(bool, tag = "5")]
    pub ignore_value: bool,

    #[prost(bool, tag = "6")]
    pub ignore_lease: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct PutResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(message, optional, tag = "2")]
    pub prev_kv: Option<KeyValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRangeRequest {
    #[prost(bytes = "bytes", tag = "1")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "2")]
    pub range_end: Bytes,

    #[prost(bool, tag = "3")]
    pub prev_kv: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DeleteRangeResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(int64, tag = "2")]
    pub deleted: i64,

    #[prost(message, repeated, tag = "3")]
    pub prev_kvs: Vec<KeyValue>,
}

/// One operation inside a transaction branch.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RequestOp {
    #[prost(oneof = "request_op::Request", tags = "1, 2, 3, 4")]
    pub request: Option<request_op::Request>,
}

pub mod request_op {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Request {
        #[prost(message, tag = "1")]
        Range(super::RangeRequest),
        #[prost(message, tag = "2")]
        Put(super::PutRequest),
        #[prost(message, tag = "3")]
        DeleteRange(super::DeleteRangeRequest),
        #[prost(message, tag = "4")]
        Txn(Box<super::TxnRequest>),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ResponseOp {
    #[prost(oneof = "response_op::Response", tags = "1, 2, 3, 4")]
    pub response: Option<response_op::Response>,
}

pub mod response_op {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Response {
        #[prost(message, tag = "1")]
        Range(super::RangeResponse),
        #[prost(message, tag = "2")]
        Put(super::PutResponse),
        #[prost(message, tag = "3")]
        DeleteRange(super::DeleteRangeResponse),
        #[prost(message, tag = "4")]
        Txn(Box<super::TxnResponse>),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompareResult {
    Equal = 0,
    Greater = 1,
    Less = 2,
    NotEqual = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum CompareTarget {
    Version = 0,
    Create = 1,
    Mod = 2,
    Value = 3,
    Lease = 4,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Compare {
    #[prost(enumeration = "CompareResult", tag = "1")]
    pub result: i32,

    #[prost(enumeration = "CompareTarget", tag = "2")]
    pub target: i32,

    #[prost(bytes = "bytes", tag = "3")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "4")]
    pub range_end: Bytes,

    #[prost(oneof = "compare::TargetUnion", tags = "5, 6, 7, 8, 9")]
    pub target_union: Option<compare::TargetUnion>,
}

pub mod compare {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum TargetUnion {
        #[prost(int64, tag = "5")]
        Version(i64),
        #[prost(int64, tag = "6")]
        CreateRevision(i64),
        #[prost(int64, tag = "7")]
        ModRevision(i64),
        #[prost(bytes = "bytes", tag = "8")]
        Value(::bytes::Bytes),
        #[prost(int64, tag = "9")]
        Lease(i64),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxnRequest {
    #[prost(message, repeated, tag = "1")]
    pub compare: Vec<Compare>,

    #[prost(message, repeated, tag = "2")]
    pub success: Vec<RequestOp>,

    #[prost(message, repeated, tag = "3")]
    pub failure: Vec<RequestOp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TxnResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(bool, tag = "2")]
    pub succeeded: bool,

    #[prost(message, repeated, tag = "3")]
    pub responses: Vec<ResponseOp>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompactionRequest {
    /// Discard history at and below this revision.
    #[prost(int64, tag = "1")]
    pub revision: i64,

    /// Wait for the compaction to be physically applied before replying.
    #[prost(bool, tag = "2")]
    pub physical: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CompactionResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

// ---------------------------------------------------------------------------
// Lease operations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseGrantRequest {
    #[prost(int64, tag = "1")]
    pub ttl: i64,

    /// Requested lease id; 0 lets the server assign one.
    #[prost(int64, tag = "2")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseGrantResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(int64, tag = "2")]
    pub id: i64,

    #[prost(int64, tag = "3")]
    pub ttl: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseRevokeRequest {
    #[prost(int64, tag = "1")]
    pub id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseRevokeResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseCheckpoint {
    #[prost(int64, tag = "1")]
    pub id: i64,

    /// Remaining time-to-live to persist across leader changes.
    #[prost(int64, tag = "2")]
    pub remaining_ttl: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseCheckpointRequest {
    #[prost(message, repeated, tag = "1")]
    pub checkpoints: Vec<LeaseCheckpoint>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LeaseCheckpointResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

// ---------------------------------------------------------------------------
// Alarm operations

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AlarmAction {
    Get = 0,
    Activate = 1,
    Deactivate = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum AlarmKind {
    None = 0,
    NoSpace = 1,
    Corrupt = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlarmRequest {
    #[prost(enumeration = "AlarmAction", tag = "1")]
    pub action: i32,

    /// Member the alarm concerns; 0 addresses all members.
    #[prost(uint64, tag = "2")]
    pub member_id: u64,

    #[prost(enumeration = "AlarmKind", tag = "3")]
    pub alarm: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlarmMember {
    #[prost(uint64, tag = "1")]
    pub member_id: u64,

    #[prost(enumeration = "AlarmKind", tag = "2")]
    pub alarm: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AlarmResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(message, repeated, tag = "2")]
    pub alarms: Vec<AlarmMember>,
}

// ---------------------------------------------------------------------------
// Auth operations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthEnableRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthEnableResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthDisableRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthDisableResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthStatusRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthStatusResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(bool, tag = "2")]
    pub enabled: bool,

    #[prost(uint64, tag = "3")]
    pub auth_revision: u64,
}

/// Authentication proposed through the log so every member observes the
/// same token assignment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InternalAuthenticateRequest {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub password: String,

    /// Token generated locally before the proposal round-trip.
    #[prost(string, tag = "3")]
    pub simple_token: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthenticateResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(string, tag = "2")]
    pub token: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PermissionType {
    Read = 0,
    Write = 1,
    ReadWrite = 2,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Permission {
    #[prost(enumeration = "PermissionType", tag = "1")]
    pub perm_type: i32,

    #[prost(bytes = "bytes", tag = "2")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "3")]
    pub range_end: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserAddRequest {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub hashed_password: String,

    #[prost(bool, tag = "3")]
    pub no_password: bool,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserAddResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserDeleteRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserDeleteResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserChangePasswordRequest {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub hashed_password: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserChangePasswordResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserGrantRoleRequest {
    #[prost(string, tag = "1")]
    pub user: String,

    #[prost(string, tag = "2")]
    pub role: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserGrantRoleResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserGetRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserGetResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(string, repeated, tag = "2")]
    pub roles: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserRevokeRoleRequest {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(string, tag = "2")]
    pub role: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserRevokeRoleResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserListRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthUserListResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(string, repeated, tag = "2")]
    pub users: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleAddRequest {
    #[prost(string, tag = "1")]
    pub name: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleAddResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleGrantPermissionRequest {
    #[prost(string, tag = "1")]
    pub name: String,

    #[prost(message, optional, tag = "2")]
    pub perm: Option<Permission>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleGrantPermissionResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleGetRequest {
    #[prost(string, tag = "1")]
    pub role: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleGetResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(message, repeated, tag = "2")]
    pub perm: Vec<Permission>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleRevokePermissionRequest {
    #[prost(string, tag = "1")]
    pub role: String,

    #[prost(bytes = "bytes", tag = "2")]
    pub key: Bytes,

    #[prost(bytes = "bytes", tag = "3")]
    pub range_end: Bytes,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleRevokePermissionResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleDeleteRequest {
    #[prost(string, tag = "1")]
    pub role: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleDeleteResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleListRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct AuthRoleListResponse {
    #[prost(message, optional, tag = "1")]
    pub header: Option<ResponseHeader>,

    #[prost(string, repeated, tag = "2")]
    pub roles: Vec<String>,
}

// ---------------------------------------------------------------------------
// Cluster-internal operations

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterVersionSetRequest {
    #[prost(string, tag = "1")]
    pub ver: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ClusterMemberAttrSetRequest {
    #[prost(uint64, tag = "1")]
    pub member_id: u64,

    #[prost(string, tag = "2")]
    pub name: String,

    #[prost(string, repeated, tag = "3")]
    pub client_urls: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DowngradeInfoSetRequest {
    #[prost(bool, tag = "1")]
    pub enabled: bool,

    /// Target version; empty when disabling.
    #[prost(string, tag = "2")]
    pub ver: String,
}

// ---------------------------------------------------------------------------
// The record itself

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LogRecord {
    #[prost(message, optional, tag = "1")]
    pub header: Option<RecordHeader>,

    #[prost(
        oneof = "log_record::Op",
        tags = "2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19, 20, 21, 22, 23, 24, 25, 26, 27, 28, 29, 30"
    )]
    pub op: Option<log_record::Op>,
}

pub mod log_record {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Op {
        #[prost(message, tag = "2")]
        Range(super::RangeRequest),
        #[prost(message, tag = "3")]
        Put(super::PutRequest),
        #[prost(message, tag = "4")]
        DeleteRange(super::DeleteRangeRequest),
        #[prost(message, tag = "5")]
        Txn(super::TxnRequest),
        #[prost(message, tag = "6")]
        Compaction(super::CompactionRequest),
        #[prost(message, tag = "7")]
        LeaseGrant(super::LeaseGrantRequest),
        #[prost(message, tag = "8")]
        LeaseRevoke(super::LeaseRevokeRequest),
        #[prost(message, tag = "9")]
        LeaseCheckpoint(super::LeaseCheckpointRequest),
        #[prost(message, tag = "10")]
        Alarm(super::AlarmRequest),
        #[prost(message, tag = "11")]
        Authenticate(super::InternalAuthenticateRequest),
        #[prost(message, tag = "12")]
        AuthEnable(super::AuthEnableRequest),
        #[prost(message, tag = "13")]
        AuthDisable(super::AuthDisableRequest),
        #[prost(message, tag = "14")]
        AuthStatus(super::AuthStatusRequest),
        #[prost(message, tag = "15")]
        AuthUserAdd(super::AuthUserAddRequest),
        #[prost(message, tag = "16")]
        AuthUserDelete(super::AuthUserDeleteRequest),
        #[prost(message, tag = "17")]
        AuthUserChangePassword(super::AuthUserChangePasswordRequest),
        #[prost(message, tag = "18")]
        AuthUserGrantRole(super::AuthUserGrantRoleRequest),
        #[prost(message, tag = "19")]
        AuthUserGet(super::AuthUserGetRequest),
        #[prost(message, tag = "20")]
        AuthUserRevokeRole(super::AuthUserRevokeRoleRequest),
        #[prost(message, tag = "21")]
        AuthUserList(super::AuthUserListRequest),
        #[prost(message, tag = "22")]
        AuthRoleAdd(super::AuthRoleAddRequest),
        #[prost(message, tag = "23")]
        AuthRoleGrantPermission(super::AuthRoleGrantPermissionRequest),
        #[prost(message, tag = "24")]
        AuthRoleGet(super::AuthRoleGetRequest),
        #[prost(message, tag = "25")]
        AuthRoleRevokePermission(super::AuthRoleRevokePermissionRequest),
        #[prost(message, tag = "26")]
        AuthRoleDelete(super::AuthRoleDeleteRequest),
        #[prost(message, tag = "27")]
        AuthRoleList(super::AuthRoleListRequest),
        #[prost(message, tag = "28")]
        ClusterVersionSet(super::ClusterVersionSetRequest),
        #[prost(message, tag = "29")]
        ClusterMemberAttrSet(super::ClusterMemberAttrSetRequest),
        #[prost(message, tag = "30")]
        DowngradeInfoSet(super::DowngradeInfoSetRequest),
    }
}
