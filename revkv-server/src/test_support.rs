//! Hand-rolled fakes for pipeline tests.
//!
//! The mockall mocks cover single-call expectations; these fakes model
//! the stateful collaborators (a consensus layer that hands proposals to
//! the test, replication indexes the test can move).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use prost::Message;
use revkv_proto::record::LogRecord;
use tokio::sync::{mpsc, watch};

use crate::applier::{ApplyResult, AuthBackend, MockAuthBackend};
use crate::consensus::{Consensus, RaftStatus};
use crate::errors::ConsensusError;
use crate::proposal::{PipelineDependencies, ProposalPipeline};
use crate::config::ServerConfig;

/// A consensus seam that forwards proposals to the test.
pub(crate) struct FakeConsensus {
    proposals: mpsc::UnboundedSender<Bytes>,
    pub read_index: AtomicU64,
    fail_propose: Mutex<Option<ConsensusError>>,
}

impl FakeConsensus {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Bytes>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                proposals: tx,
                read_index: AtomicU64::new(0),
                fail_propose: Mutex::new(None),
            }),
            rx,
        )
    }

    pub fn fail_next_propose(&self, err: ConsensusError) {
        *self.fail_propose.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl Consensus for FakeConsensus {
    async fn propose(&self, data: Bytes) -> Result<(), ConsensusError> {
        if let Some(err) = self.fail_propose.lock().unwrap().take() {
            return Err(err);
        }
        self.proposals.send(data).expect("test dropped proposal receiver");
        Ok(())
    }

    async fn request_read_index(&self) -> Result<u64, ConsensusError> {
        Ok(self.read_index.load(Ordering::SeqCst))
    }
}

/// Replication/leadership status the test can steer.
pub(crate) struct FakeStatus {
    pub applied: AtomicU64,
    pub committed: AtomicU64,
    pub leader: Mutex<Option<u64>>,
    pub elected_at: Mutex<Option<Instant>>,
}

impl FakeStatus {
    pub fn healthy() -> Arc<Self> {
        Arc::new(Self {
            applied: AtomicU64::new(10),
            committed: AtomicU64::new(10),
            leader: Mutex::new(Some(1)),
            elected_at: Mutex::new(None),
        })
    }
}

impl RaftStatus for FakeStatus {
    fn applied_index(&self) -> u64 {
        self.applied.load(Ordering::SeqCst)
    }

    fn committed_index(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    fn leader_id(&self) -> Option<u64> {
        *self.leader.lock().unwrap()
    }

    fn lead_elected_at(&self) -> Option<Instant> {
        *self.elected_at.lock().unwrap()
    }
}

pub(crate) struct PipelineHarness {
    pub pipeline: Arc<ProposalPipeline>,
    pub consensus: Arc<FakeConsensus>,
    pub status: Arc<FakeStatus>,
    pub proposals: mpsc::UnboundedReceiver<Bytes>,
    pub applied_tx: watch::Sender<u64>,
    pub shutdown_tx: watch::Sender<()>,
}

/// A pipeline wired to fakes, with a fast request timeout so timeout
/// tests stay quick.
pub(crate) fn pipeline_with_config(config: ServerConfig) -> PipelineHarness {
    let (consensus, proposals) = FakeConsensus::new();
    let status = FakeStatus::healthy();
    let (applied_tx, applied_rx) = watch::channel(10);
    let (shutdown_tx, shutdown) = watch::channel(());

    let mut auth = MockAuthBackend::new();
    auth.expect_revision().return_const(1u64);
    let auth: Arc<dyn AuthBackend> = Arc::new(auth);

    let pipeline = Arc::new(ProposalPipeline::new(
        1,
        config,
        PipelineDependencies {
            consensus: consensus.clone(),
            status: status.clone(),
            auth,
            applied_rx,
            shutdown,
        },
    ));

    PipelineHarness {
        pipeline,
        consensus,
        status,
        proposals,
        applied_tx,
        shutdown_tx,
    }
}

pub(crate) fn fast_config() -> ServerConfig {
    ServerConfig {
        base_request_timeout_ms: 80,
        election_ticks: 2,
        tick_ms: 5,
        ..ServerConfig::default()
    }
}

pub(crate) fn pipeline() -> PipelineHarness {
    pipeline_with_config(fast_config())
}

/// Decode a captured proposal back into its record.
pub(crate) fn decode_record(data: &Bytes) -> LogRecord {
    LogRecord::decode(data.clone()).expect("captured proposal must decode")
}

/// Simulate the apply loop for one captured proposal: decode it and
/// trigger its waiter with `result`.
pub(crate) fn apply_one(pipeline: &ProposalPipeline, data: &Bytes, result: ApplyResult) -> bool {
    let record = decode_record(data);
    let id = record.header.expect("stamped header").id;
    pipeline.waiters().trigger(id, result)
}
