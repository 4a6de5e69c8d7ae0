//! Seams to the consensus layer.
//!
//! The consensus algorithm itself (election, replication, snapshots) is an
//! external collaborator; the proposal pipeline only needs submission, a
//! read-index barrier and a view of the replication indexes.

use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;

use crate::errors::ConsensusError;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait Consensus: Send + Sync + 'static {
    /// Submit a marshalled record to the replicated log. Returning `Ok`
    /// means the proposal was accepted for replication, not that it
    /// committed.
    async fn propose(&self, data: Bytes) -> Result<(), ConsensusError>;

    /// Ask the leader for a read index: the cluster's committed index as
    /// of this call.
    async fn request_read_index(&self) -> Result<u64, ConsensusError>;
}

/// Read-only view of replication progress and leadership.
#[cfg_attr(test, automock)]
pub trait RaftStatus: Send + Sync + 'static {
    fn applied_index(&self) -> u64;

    fn committed_index(&self) -> u64;

    fn leader_id(&self) -> Option<u64>;

    /// When the current leader's lease began, if a leader is known.
    fn lead_elected_at(&self) -> Option<Instant>;
}
