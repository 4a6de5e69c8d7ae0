//! Server-side proposal pipeline for revkv.
//!
//! This crate owns the submission path from a client request through a
//! replicated-log proposal to the applied result:
//!
//! - [`ProposalPipeline`] - admission control, identity stamping, waiter
//!   registry, submission with classified timeouts, linearizable-read
//!   barrier
//! - [`Applier`] - dispatches committed records to injected state
//!   backends by operation kind
//! - [`DowngradeApi`] - validate / enable / cancel of cluster downgrades
//!
//! The consensus algorithm, the storage engine and the membership layer
//! are external collaborators behind the [`Consensus`], [`RaftStatus`],
//! backend and [`ClusterInfo`] traits; this crate defines their contracts
//! (monotonic revisions, linearizable reads, compaction) and everything
//! built on top of them.

mod applier;
mod config;
mod consensus;
mod downgrade;
mod errors;
mod proposal;
mod reqid;
mod wait;

pub use applier::{
    AlarmBackend, Applier, ApplyResult, AuthBackend, ClusterBackend, KvBackend, LeaseBackend,
    RecordResponse,
};
pub use crate::config::{
    ServerConfig, MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX, READ_INDEX_RETRY_TIME,
};
pub use consensus::{Consensus, RaftStatus};
pub use downgrade::{
    ClusterInfo, ClusterVersion, DowngradeAction, DowngradeApi, DowngradeInfo, DowngradeResponse,
};
pub use errors::{ApplyError, ConsensusError, ProposalError};
pub use proposal::{AuthInfo, PipelineDependencies, ProposalPipeline, ProposeContext};
pub use reqid::RequestIdGenerator;
pub use wait::{WaiterGuard, WaiterRegistry};

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod config_test;
