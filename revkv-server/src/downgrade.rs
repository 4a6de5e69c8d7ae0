//! Downgrade control.
//!
//! Downgrades move the cluster version one minor version backwards. Every
//! decision reads cluster state behind a linearizable-read barrier so a
//! stale local view can never admit an illegal downgrade.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use revkv_proto::record::{log_record::Op, DowngradeInfoSetRequest, LogRecord};
use tracing::{info, warn};

use crate::errors::ProposalError;
use crate::proposal::{ProposalPipeline, ProposeContext};

/// A cluster version, compared at minor-version granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClusterVersion {
    pub major: u32,
    pub minor: u32,
}

impl ClusterVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl FromStr for ClusterVersion {
    type Err = ProposalError;

    /// Accepts "X.Y" and "X.Y.Z"; the patch component is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProposalError::InvalidVersion(s.to_string());
        let mut parts = s.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let minor = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        match parts.next() {
            None => {}
            Some(patch) => {
                patch.parse::<u32>().map_err(|_| invalid())?;
                if parts.next().is_some() {
                    return Err(invalid());
                }
            }
        }
        Ok(Self { major, minor })
    }
}

impl fmt::Display for ClusterVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DowngradeInfo {
    pub enabled: bool,
    pub target_version: Option<ClusterVersion>,
}

/// Membership-layer view consumed by downgrade decisions.
#[cfg_attr(test, automock)]
pub trait ClusterInfo: Send + Sync + 'static {
    /// The cluster-wide version, once established.
    fn cluster_version(&self) -> Option<ClusterVersion>;

    fn downgrade_info(&self) -> DowngradeInfo;

    /// The one version members may downgrade to: the immediate
    /// predecessor minor version.
    fn allowed_downgrade_version(&self, current: ClusterVersion) -> Option<ClusterVersion> {
        (current.minor > 0).then(|| ClusterVersion::new(current.major, current.minor - 1))
    }
}

/// Wire-level downgrade actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DowngradeAction {
    Validate,
    Enable,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DowngradeResponse {
    /// The cluster version at decision time.
    pub version: String,
}

pub struct DowngradeApi {
    pipeline: Arc<ProposalPipeline>,
    cluster: Arc<dyn ClusterInfo>,
}

impl DowngradeApi {
    pub fn new(pipeline: Arc<ProposalPipeline>, cluster: Arc<dyn ClusterInfo>) -> Self {
        Self { pipeline, cluster }
    }

    /// Dispatch a raw action code; unknown codes are rejected.
    pub async fn handle(
        &self,
        ctx: &ProposeContext,
        action: i32,
        version: &str,
    ) -> Result<DowngradeResponse, ProposalError> {
        let action = match action {
            0 => DowngradeAction::Validate,
            1 => DowngradeAction::Enable,
            2 => DowngradeAction::Cancel,
            _ => return Err(ProposalError::UnknownMethod),
        };
        match action {
            DowngradeAction::Validate => self.validate(version).await,
            DowngradeAction::Enable => self.enable(ctx, version).await,
            DowngradeAction::Cancel => self.cancel(ctx).await,
        }
    }

    /// Verify a downgrade to `version` would be legal right now.
    pub async fn validate(&self, version: &str) -> Result<DowngradeResponse, ProposalError> {
        let target: ClusterVersion = version.parse()?;

        // Wait out the apply backlog so the downgrade decision cannot be
        // based on stale cluster state.
        self.pipeline.linearizable_read_barrier().await?;

        let current = self
            .cluster
            .cluster_version()
            .ok_or(ProposalError::ClusterVersionUnavailable)?;
        if self.cluster.allowed_downgrade_version(current) != Some(target) {
            warn!(%current, %target, "rejected downgrade to a non-adjacent version");
            return Err(ProposalError::InvalidDowngradeTargetVersion);
        }
        if self.cluster.downgrade_info().enabled {
            return Err(ProposalError::DowngradeInProcess);
        }
        Ok(DowngradeResponse {
            version: current.to_string(),
        })
    }

    /// Validate, then persist the downgrade intent through the log.
    pub async fn enable(
        &self,
        ctx: &ProposeContext,
        version: &str,
    ) -> Result<DowngradeResponse, ProposalError> {
        let resp = self.validate(version).await?;
        let target: ClusterVersion = version.parse()?;

        let record = LogRecord {
            header: None,
            op: Some(Op::DowngradeInfoSet(DowngradeInfoSetRequest {
                enabled: true,
                ver: target.to_string(),
            })),
        };
        self.pipeline.propose(ctx, record).await?;
        info!(%target, "cluster downgrade enabled");
        Ok(resp)
    }

    /// Abort an in-flight downgrade.
    pub async fn cancel(&self, ctx: &ProposeContext) -> Result<DowngradeResponse, ProposalError> {
        self.pipeline.linearizable_read_barrier().await?;

        if !self.cluster.downgrade_info().enabled {
            return Err(ProposalError::NoInflightDowngrade);
        }

        let record = LogRecord {
            header: None,
            op: Some(Op::DowngradeInfoSet(DowngradeInfoSetRequest {
                enabled: false,
                ver: String::new(),
            })),
        };
        self.pipeline.propose(ctx, record).await?;

        let version = self
            .cluster
            .cluster_version()
            .map(|v| v.to_string())
            .unwrap_or_default();
        info!("cluster downgrade canceled");
        Ok(DowngradeResponse { version })
    }
}
