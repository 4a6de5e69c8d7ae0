//! The applier switch.
//!
//! Dispatches a committed record to the appropriate state backend by
//! operation kind. Backends are injected by construction; the applier
//! holds no state of its own. The three cluster-internal kinds
//! (ClusterVersionSet, ClusterMemberAttrSet, DowngradeInfoSet) apply in
//! every membership epoch; everything else is gated by `should_apply_kv`.

use std::sync::Arc;

#[cfg(test)]
use mockall::automock;
use revkv_proto::record::{
    log_record::Op, AlarmRequest, AlarmResponse, AuthDisableResponse, AuthEnableResponse,
    AuthRoleAddRequest, AuthRoleAddResponse, AuthRoleDeleteRequest, AuthRoleDeleteResponse,
    AuthRoleGetRequest, AuthRoleGetResponse, AuthRoleGrantPermissionRequest,
    AuthRoleGrantPermissionResponse, AuthRoleListResponse, AuthRoleRevokePermissionRequest,
    AuthRoleRevokePermissionResponse, AuthStatusResponse, AuthUserAddRequest, AuthUserAddResponse,
    AuthUserChangePasswordRequest, AuthUserChangePasswordResponse, AuthUserDeleteRequest,
    AuthUserDeleteResponse, AuthUserGetRequest, AuthUserGetResponse, AuthUserGrantRoleRequest,
    AuthUserGrantRoleResponse, AuthUserListResponse, AuthUserRevokeRoleRequest,
    AuthUserRevokeRoleResponse, AuthenticateResponse, ClusterMemberAttrSetRequest,
    ClusterVersionSetRequest, CompactionRequest, CompactionResponse, DeleteRangeRequest,
    DeleteRangeResponse, DowngradeInfoSetRequest, InternalAuthenticateRequest, LeaseCheckpointRequest,
    LeaseCheckpointResponse, LeaseGrantRequest, LeaseGrantResponse, LeaseRevokeRequest,
    LeaseRevokeResponse, LogRecord, PutRequest, PutResponse, RangeRequest, RangeResponse,
    TxnRequest, TxnResponse,
};
use tracing::warn;

use crate::errors::ApplyError;

/// Result of applying one record, delivered to the proposer's waiter.
pub type ApplyResult = Result<RecordResponse, ApplyError>;

/// The caller-visible response of an applied record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordResponse {
    /// Cluster-internal records carry no payload.
    Internal,
    Range(RangeResponse),
    Put(PutResponse),
    DeleteRange(DeleteRangeResponse),
    Txn(TxnResponse),
    Compaction(CompactionResponse),
    LeaseGrant(LeaseGrantResponse),
    LeaseRevoke(LeaseRevokeResponse),
    LeaseCheckpoint(LeaseCheckpointResponse),
    Alarm(AlarmResponse),
    Authenticate(AuthenticateResponse),
    AuthEnable(AuthEnableResponse),
    AuthDisable(AuthDisableResponse),
    AuthStatus(AuthStatusResponse),
    UserAdd(AuthUserAddResponse),
    UserDelete(AuthUserDeleteResponse),
    UserChangePassword(AuthUserChangePasswordResponse),
    UserGrantRole(AuthUserGrantRoleResponse),
    UserGet(AuthUserGetResponse),
    UserRevokeRole(AuthUserRevokeRoleResponse),
    UserList(AuthUserListResponse),
    RoleAdd(AuthRoleAddResponse),
    RoleGrantPermission(AuthRoleGrantPermissionResponse),
    RoleGet(AuthRoleGetResponse),
    RoleRevokePermission(AuthRoleRevokePermissionResponse),
    RoleDelete(AuthRoleDeleteResponse),
    RoleList(AuthRoleListResponse),
}

#[cfg_attr(test, automock)]
pub trait KvBackend: Send + Sync + 'static {
    fn range(&self, req: &RangeRequest) -> Result<RangeResponse, ApplyError>;
    fn put(&self, req: &PutRequest) -> Result<PutResponse, ApplyError>;
    fn delete_range(&self, req: &DeleteRangeRequest) -> Result<DeleteRangeResponse, ApplyError>;
    fn txn(&self, req: &TxnRequest) -> Result<TxnResponse, ApplyError>;
    fn compact(&self, req: &CompactionRequest) -> Result<CompactionResponse, ApplyError>;
}

#[cfg_attr(test, automock)]
pub trait LeaseBackend: Send + Sync + 'static {
    fn grant(&self, req: &LeaseGrantRequest) -> Result<LeaseGrantResponse, ApplyError>;
    fn revoke(&self, req: &LeaseRevokeRequest) -> Result<LeaseRevokeResponse, ApplyError>;
    fn checkpoint(&self, req: &LeaseCheckpointRequest)
        -> Result<LeaseCheckpointResponse, ApplyError>;
}

#[cfg_attr(test, automock)]
pub trait AuthBackend: Send + Sync + 'static {
    /// Current auth store revision; bumped by every auth mutation.
    fn revision(&self) -> u64;

    fn enable(&self) -> Result<AuthEnableResponse, ApplyError>;
    fn disable(&self) -> Result<AuthDisableResponse, ApplyError>;
    fn status(&self) -> Result<AuthStatusResponse, ApplyError>;
    fn authenticate(
        &self,
        req: &InternalAuthenticateRequest,
    ) -> Result<AuthenticateResponse, ApplyError>;

    fn user_add(&self, req: &AuthUserAddRequest) -> Result<AuthUserAddResponse, ApplyError>;
    fn user_delete(&self, req: &AuthUserDeleteRequest)
        -> Result<AuthUserDeleteResponse, ApplyError>;
    fn user_change_password(
        &self,
        req: &AuthUserChangePasswordRequest,
    ) -> Result<AuthUserChangePasswordResponse, ApplyError>;
    fn user_grant_role(
        &self,
        req: &AuthUserGrantRoleRequest,
    ) -> Result<AuthUserGrantRoleResponse, ApplyError>;
    fn user_get(&self, req: &AuthUserGetRequest) -> Result<AuthUserGetResponse, ApplyError>;
    fn user_revoke_role(
        &self,
        req: &AuthUserRevokeRoleRequest,
    ) -> Result<AuthUserRevokeRoleResponse, ApplyError>;
    fn user_list(&self) -> Result<AuthUserListResponse, ApplyError>;

    fn role_add(&self, req: &AuthRoleAddRequest) -> Result<AuthRoleAddResponse, ApplyError>;
    fn role_grant_permission(
        &self,
        req: &AuthRoleGrantPermissionRequest,
    ) -> Result<AuthRoleGrantPermissionResponse, ApplyError>;
    fn role_get(&self, req: &AuthRoleGetRequest) -> Result<AuthRoleGetResponse, ApplyError>;
    fn role_revoke_permission(
        &self,
        req: &AuthRoleRevokePermissionRequest,
    ) -> Result<AuthRoleRevokePermissionResponse, ApplyError>;
    fn role_delete(&self, req: &AuthRoleDeleteRequest)
        -> Result<AuthRoleDeleteResponse, ApplyError>;
    fn role_list(&self) -> Result<AuthRoleListResponse, ApplyError>;
}

#[cfg_attr(test, automock)]
pub trait AlarmBackend: Send + Sync + 'static {
    fn alarm(&self, req: &AlarmRequest) -> Result<AlarmResponse, ApplyError>;
}

/// Membership-layer mutations driven by cluster-internal records.
#[cfg_attr(test, automock)]
pub trait ClusterBackend: Send + Sync + 'static {
    fn set_cluster_version(&self, req: &ClusterVersionSetRequest);
    fn set_member_attributes(&self, req: &ClusterMemberAttrSetRequest);
    fn set_downgrade_info(&self, req: &DowngradeInfoSetRequest);
}

pub struct Applier {
    kv: Arc<dyn KvBackend>,
    lease: Arc<dyn LeaseBackend>,
    auth: Arc<dyn AuthBackend>,
    alarm: Arc<dyn AlarmBackend>,
    cluster: Arc<dyn ClusterBackend>,
}

impl Applier {
    pub fn new(
        kv: Arc<dyn KvBackend>,
        lease: Arc<dyn LeaseBackend>,
        auth: Arc<dyn AuthBackend>,
        alarm: Arc<dyn AlarmBackend>,
        cluster: Arc<dyn ClusterBackend>,
    ) -> Self {
        Self {
            kv,
            lease,
            auth,
            alarm,
            cluster,
        }
    }

    /// Apply one committed record.
    ///
    /// `should_apply_kv` governs whether side-effecting KV-era operations
    /// execute in the current membership epoch; `None` means the record
    /// produced no caller-visible result in this epoch.
    pub fn apply(&self, record: &LogRecord, should_apply_kv: bool) -> Option<ApplyResult> {
        let op = match &record.op {
            Some(op) => op,
            // A committed record always carries an operation.
            None => unreachable!("applied record without an operation"),
        };

        let result = match op {
            Op::ClusterVersionSet(req) => {
                self.cluster.set_cluster_version(req);
                Ok(RecordResponse::Internal)
            }
            Op::ClusterMemberAttrSet(req) => {
                self.cluster.set_member_attributes(req);
                Ok(RecordResponse::Internal)
            }
            Op::DowngradeInfoSet(req) => {
                self.cluster.set_downgrade_info(req);
                Ok(RecordResponse::Internal)
            }

            _ if !should_apply_kv => return None,

            Op::Range(req) => self.kv.range(req).map(RecordResponse::Range),
            Op::Put(req) => self.kv.put(req).map(RecordResponse::Put),
            Op::DeleteRange(req) => self.kv.delete_range(req).map(RecordResponse::DeleteRange),
            Op::Txn(req) => self.kv.txn(req).map(RecordResponse::Txn),
            Op::Compaction(req) => self.kv.compact(req).map(RecordResponse::Compaction),

            Op::LeaseGrant(req) => self.lease.grant(req).map(RecordResponse::LeaseGrant),
            Op::LeaseRevoke(req) => self.lease.revoke(req).map(RecordResponse::LeaseRevoke),
            Op::LeaseCheckpoint(req) => {
                self.lease.checkpoint(req).map(RecordResponse::LeaseCheckpoint)
            }

            Op::Alarm(req) => self.alarm.alarm(req).map(RecordResponse::Alarm),

            Op::Authenticate(req) => {
                self.auth.authenticate(req).map(RecordResponse::Authenticate)
            }
            Op::AuthEnable(_) => self.auth.enable().map(RecordResponse::AuthEnable),
            Op::AuthDisable(_) => self.auth.disable().map(RecordResponse::AuthDisable),
            Op::AuthStatus(_) => self.auth.status().map(RecordResponse::AuthStatus),
            Op::AuthUserAdd(req) => self.auth.user_add(req).map(RecordResponse::UserAdd),
            Op::AuthUserDelete(req) => self.auth.user_delete(req).map(RecordResponse::UserDelete),
            Op::AuthUserChangePassword(req) => self
                .auth
                .user_change_password(req)
                .map(RecordResponse::UserChangePassword),
            Op::AuthUserGrantRole(req) => {
                self.auth.user_grant_role(req).map(RecordResponse::UserGrantRole)
            }
            Op::AuthUserGet(req) => self.auth.user_get(req).map(RecordResponse::UserGet),
            Op::AuthUserRevokeRole(req) => {
                self.auth.user_revoke_role(req).map(RecordResponse::UserRevokeRole)
            }
            Op::AuthUserList(_) => self.auth.user_list().map(RecordResponse::UserList),
            Op::AuthRoleAdd(req) => self.auth.role_add(req).map(RecordResponse::RoleAdd),
            Op::AuthRoleGrantPermission(req) => self
                .auth
                .role_grant_permission(req)
                .map(RecordResponse::RoleGrantPermission),
            Op::AuthRoleGet(req) => self.auth.role_get(req).map(RecordResponse::RoleGet),
            Op::AuthRoleRevokePermission(req) => self
                .auth
                .role_revoke_permission(req)
                .map(RecordResponse::RoleRevokePermission),
            Op::AuthRoleDelete(req) => self.auth.role_delete(req).map(RecordResponse::RoleDelete),
            Op::AuthRoleList(_) => self.auth.role_list().map(RecordResponse::RoleList),
        };

        if let Err(err) = &result {
            // Compaction races are expected; everything else is worth a
            // closer look.
            if !matches!(err, ApplyError::Compacted(_)) {
                warn!(op = record.op_name(), error = %err, "apply failed");
            }
        }
        Some(result)
    }
}
