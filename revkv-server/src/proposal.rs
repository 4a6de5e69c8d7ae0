//! The proposal pipeline: the submission path from a client request
//! through a replicated-log proposal to the applied result.
//!
//! Concurrent proposals are keyed by request id into the waiter registry;
//! the apply loop triggers each waiter with its [`ApplyResult`]. The
//! pipeline itself enforces admission, stamps identity, bounds every
//! proposal with a per-request timeout and classifies timeouts by what
//! leadership was doing at the time.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use prost::Message;
use revkv_proto::record::{LogRecord, RecordHeader};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::applier::{ApplyResult, AuthBackend, RecordResponse};
use crate::config::{ServerConfig, MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX, READ_INDEX_RETRY_TIME};
use crate::consensus::{Consensus, RaftStatus};
use crate::errors::ProposalError;
use crate::reqid::RequestIdGenerator;
use crate::wait::WaiterRegistry;

/// Caller identity attached to a proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthInfo {
    pub username: String,
    /// Auth store revision the caller authenticated against.
    pub revision: u64,
}

/// Per-request context resolved by the RPC layer.
#[derive(Debug, Clone, Default)]
pub struct ProposeContext {
    pub auth: Option<AuthInfo>,
}

/// Collaborators injected into the pipeline.
pub struct PipelineDependencies {
    pub consensus: Arc<dyn Consensus>,
    pub status: Arc<dyn RaftStatus>,
    pub auth: Arc<dyn AuthBackend>,
    /// Published by the apply loop after every applied batch.
    pub applied_rx: watch::Receiver<u64>,
    pub shutdown: watch::Receiver<()>,
}

pub struct ProposalPipeline {
    consensus: Arc<dyn Consensus>,
    status: Arc<dyn RaftStatus>,
    auth: Arc<dyn AuthBackend>,
    waiters: WaiterRegistry<ApplyResult>,
    reqid: RequestIdGenerator,
    config: ServerConfig,
    applied_rx: watch::Receiver<u64>,
    shutdown: watch::Receiver<()>,
}

impl ProposalPipeline {
    pub fn new(member_id: u16, config: ServerConfig, deps: PipelineDependencies) -> Self {
        Self {
            consensus: deps.consensus,
            status: deps.status,
            auth: deps.auth,
            waiters: WaiterRegistry::new(),
            reqid: RequestIdGenerator::new(member_id),
            config,
            applied_rx: deps.applied_rx,
            shutdown: deps.shutdown,
        }
    }

    /// The registry the apply loop triggers with applied results.
    pub fn waiters(&self) -> &WaiterRegistry<ApplyResult> {
        &self.waiters
    }

    /// Submit one record and await its applied result.
    pub async fn propose(
        &self,
        ctx: &ProposeContext,
        mut record: LogRecord,
    ) -> Result<RecordResponse, ProposalError> {
        // Admission: when apply falls too far behind commit, adding load
        // only grows the gap.
        let applied = self.status.applied_index();
        let committed = self.status.committed_index();
        if committed > applied + MAX_GAP_BETWEEN_APPLY_AND_COMMIT_INDEX {
            debug!(applied, committed, "proposal rejected; apply is lagging");
            return Err(ProposalError::TooManyRequests);
        }

        // Stamp identity. Authenticate records carry their own identity
        // and are never stamped with caller credentials.
        let id = self.reqid.next();
        let mut header = RecordHeader {
            id,
            username: String::new(),
            auth_revision: 0,
        };
        if !record.is_authenticate() {
            if let Some(auth) = &ctx.auth {
                header.username = auth.username.clone();
                header.auth_revision = auth.revision;
            }
        }
        record.header = Some(header);

        let data = record.encode_to_vec();
        if data.len() > self.config.max_request_bytes {
            return Err(ProposalError::RequestTooLarge);
        }

        // The guard deregisters on every early return below.
        let mut waiter = self.waiters.register(id);
        trace!(id, op = record.op_name(), bytes = data.len(), "submitting proposal");

        let start = Instant::now();
        let deadline = tokio::time::Instant::now() + self.config.req_timeout();
        match tokio::time::timeout_at(deadline, self.consensus.propose(Bytes::from(data))).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err.into()),
            Err(_) => return Err(self.classify_timeout(start)),
        }

        let mut shutdown = self.shutdown.clone();
        tokio::select! {
            applied = waiter.wait() => match applied {
                Some(result) => Ok(result?),
                None => Err(ProposalError::Stopped),
            },
            _ = tokio::time::sleep_until(deadline) => Err(self.classify_timeout(start)),
            _ = shutdown.changed() => Err(ProposalError::Stopped),
        }
    }

    /// Block until the local applied index has caught up with the
    /// cluster's committed index as of this call.
    ///
    /// The read-index request is re-issued every [`READ_INDEX_RETRY_TIME`]
    /// until the leader answers.
    pub async fn linearizable_read_barrier(&self) -> Result<(), ProposalError> {
        let deadline = tokio::time::Instant::now() + self.config.req_timeout();
        let mut shutdown = self.shutdown.clone();
        let mut applied_rx = self.applied_rx.clone();

        let index = loop {
            tokio::select! {
                res = self.consensus.request_read_index() => break res?,
                _ = tokio::time::sleep(READ_INDEX_RETRY_TIME) => {
                    debug!("read index request pending; re-issuing");
                    continue;
                }
                _ = tokio::time::sleep_until(deadline) => return Err(ProposalError::Timeout),
                _ = shutdown.changed() => return Err(ProposalError::Stopped),
            }
        };

        loop {
            if *applied_rx.borrow() >= index {
                return Ok(());
            }
            tokio::select! {
                changed = applied_rx.changed() => {
                    if changed.is_err() {
                        return Err(ProposalError::Stopped);
                    }
                }
                _ = tokio::time::sleep_until(deadline) => return Err(ProposalError::Timeout),
                _ = shutdown.changed() => return Err(ProposalError::Stopped),
            }
        }
    }

    /// Run an auth-checked serializable read.
    ///
    /// `check` validates permissions for the caller's identity; `get`
    /// performs the local read. If the auth store moved past the caller's
    /// revision while the read ran, the result is stale and the caller
    /// must re-authenticate.
    pub fn serialized_read<C, G>(
        &self,
        ctx: &ProposeContext,
        check: C,
        get: G,
    ) -> Result<(), ProposalError>
    where
        C: FnOnce(&AuthInfo) -> Result<(), ProposalError>,
        G: FnOnce(),
    {
        let anonymous = AuthInfo::default();
        let auth_info = ctx.auth.as_ref().unwrap_or(&anonymous);
        check(auth_info)?;
        get();
        if auth_info.revision != 0 && auth_info.revision != self.auth.revision() {
            return Err(ProposalError::AuthOldRevision);
        }
        Ok(())
    }

    /// Classify a proposal deadline by leadership history: a deadline that
    /// spans a leader change is reported as such, a leaderless cluster as
    /// "no leader", anything else as a plain timeout.
    fn classify_timeout(&self, start: Instant) -> ProposalError {
        if let Some(elected) = self.status.lead_elected_at() {
            if let Some(prev_lead_lost) = elected.checked_sub(2 * self.config.election_timeout()) {
                if start > prev_lead_lost && start < elected {
                    return ProposalError::TimeoutDueToLeaderFail;
                }
            }
        }
        if self.status.leader_id().is_none() {
            return ProposalError::NoLeader;
        }
        ProposalError::Timeout
    }
}
