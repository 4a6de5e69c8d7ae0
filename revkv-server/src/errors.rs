//! Server error hierarchy, grouped by operational concern.

/// Errors surfaced by the proposal pipeline and the admin surfaces built
/// on it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProposalError {
    /// Commit has outpaced apply beyond the admission gap; back off.
    #[error("too many requests")]
    TooManyRequests,

    /// The marshalled record exceeds the configured request size limit.
    #[error("request is too large")]
    RequestTooLarge,

    /// The server is shutting down.
    #[error("server stopped")]
    Stopped,

    #[error("request timed out")]
    Timeout,

    /// The deadline elapsed inside the window of a leader change; the
    /// proposal may or may not have committed.
    #[error("request timed out, possibly due to previous leader failure")]
    TimeoutDueToLeaderFail,

    #[error("no leader")]
    NoLeader,

    /// The caller authenticated against an auth store revision that has
    /// since changed.
    #[error("auth revision in the request header is old")]
    AuthOldRevision,

    #[error("unknown method")]
    UnknownMethod,

    #[error("cluster version not available")]
    ClusterVersionUnavailable,

    /// Downgrade target is not the immediate predecessor minor version.
    #[error("invalid downgrade target version")]
    InvalidDowngradeTargetVersion,

    #[error("cluster has a downgrade job in progress")]
    DowngradeInProcess,

    #[error("no inflight downgrade job")]
    NoInflightDowngrade,

    #[error("invalid cluster version: {0}")]
    InvalidVersion(String),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}

/// Failures reported by the consensus layer seam.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConsensusError {
    #[error("consensus layer stopped")]
    Stopped,

    #[error("proposal dropped: {0}")]
    ProposalDropped(String),

    #[error("read index request failed: {0}")]
    ReadIndexFailed(String),
}

/// Failures reported by the injected state backends while applying a
/// committed record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    /// The addressed revision was discarded by compaction; the payload is
    /// the oldest revision still available.
    #[error("required revision has been compacted to {0}")]
    Compacted(i64),

    #[error("key not found")]
    KeyNotFound,

    #[error("lease not found")]
    LeaseNotFound,

    #[error("permission denied")]
    PermissionDenied,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("{0}")]
    Backend(String),
}
