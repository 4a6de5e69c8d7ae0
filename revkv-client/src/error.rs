//! Watch client error taxonomy, grouped by effect rather than by source.
//!
//! Recoverable transport failures ([`WatchError::Transport`],
//! [`WatchError::Connect`]) are retried internally by the stream
//! multiplexer and never surface to subscribers. Halt-class errors end the
//! whole stream; every subscriber then receives a final canceled response
//! carrying the error.

use revkv_proto::codec::CodecError;

/// Errors surfaced by the watch client.
///
/// `Clone` because terminal errors travel inside buffered responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    /// The requested start revision was compacted away; the payload is the
    /// minimum revision still watchable.
    #[error("required revision has been compacted to {0}")]
    Compacted(i64),

    /// The server deliberately ended the watch.
    #[error("watch canceled by server: {0}")]
    Canceled(String),

    /// The server canceled the watch without a reason, which it does when
    /// the start revision is ahead of the store.
    #[error("requested revision is ahead of the store revision")]
    FutureRevision,

    /// The cluster has no leader and the stream demands one.
    #[error("no cluster leader")]
    NoLeader,

    /// The transport failed in a way resumption cannot repair.
    #[error("transport halted: {0}")]
    Halted(String),

    /// The transport failed; the multiplexer reconnects transparently.
    #[error("transport failed: {0}")]
    Transport(String),

    /// A connection attempt failed; retried with backoff.
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("context canceled")]
    ContextCanceled,

    /// The owning watcher was closed.
    #[error("watch client closed")]
    ClientClosed,
}

impl WatchError {
    /// Halt-class errors tear the multiplexer down instead of triggering
    /// resumption.
    pub fn is_halt(&self) -> bool {
        matches!(
            self,
            WatchError::NoLeader
                | WatchError::Halted(_)
                | WatchError::ContextCanceled
                | WatchError::ClientClosed
        )
    }
}

impl From<CodecError> for WatchError {
    fn from(err: CodecError) -> Self {
        WatchError::Transport(err.to_string())
    }
}
