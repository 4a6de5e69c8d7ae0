use crate::record::{log_record::Op, request_op, LogRecord, TxnRequest};

impl TxnRequest {
    /// A txn is serializable iff every operation in both branches is a
    /// Range with serializable set. Writers are never serializable.
    pub fn is_serializable(&self) -> bool {
        self.success
            .iter()
            .chain(self.failure.iter())
            .all(|op| match &op.request {
                Some(request_op::Request::Range(r)) => r.serializable,
                _ => false,
            })
    }

    /// A txn is read-only iff every operation in both branches is a Range.
    pub fn is_read_only(&self) -> bool {
        self.success
            .iter()
            .chain(self.failure.iter())
            .all(|op| matches!(&op.request, Some(request_op::Request::Range(_))))
    }
}

impl LogRecord {
    /// The three cluster-internal kinds that apply in every membership
    /// epoch.
    pub fn is_internal(&self) -> bool {
        matches!(
            self.op,
            Some(Op::ClusterVersionSet(_))
                | Some(Op::ClusterMemberAttrSet(_))
                | Some(Op::DowngradeInfoSet(_))
        )
    }

    pub fn op_name(&self) -> &'static str {
        match &self.op {
            Some(Op::Range(_)) => "Range",
            Some(Op::Put(_)) => "Put",
            Some(Op::DeleteRange(_)) => "DeleteRange",
            Some(Op::Txn(_)) => "Txn",
            Some(Op::Compaction(_)) => "Compaction",
            Some(Op::LeaseGrant(_)) => "LeaseGrant",
            Some(Op::LeaseRevoke(_)) => "LeaseRevoke",
            Some(Op::LeaseCheckpoint(_)) => "LeaseCheckpoint",
            Some(Op::Alarm(_)) => "Alarm",
            Some(Op::Authenticate(_)) => "Authenticate",
            Some(Op::AuthEnable(_)) => "AuthEnable",
            Some(Op::AuthDisable(_)) => "AuthDisable",
            Some(Op::AuthStatus(_)) => "AuthStatus",
            Some(Op::AuthUserAdd(_)) => "AuthUserAdd",
            Some(Op::AuthUserDelete(_)) => "AuthUserDelete",
            Some(Op::AuthUserChangePassword(_)) => "AuthUserChangePassword",
            Some(Op::AuthUserGrantRole(_)) => "AuthUserGrantRole",
            Some(Op::AuthUserGet(_)) => "AuthUserGet",
            Some(Op::AuthUserRevokeRole(_)) => "AuthUserRevokeRole",
            Some(Op::AuthUserList(_)) => "AuthUserList",
            Some(Op::AuthRoleAdd(_)) => "AuthRoleAdd",
            Some(Op::AuthRoleGrantPermission(_)) => "AuthRoleGrantPermission",
            Some(Op::AuthRoleGet(_)) => "AuthRoleGet",
            Some(Op::AuthRoleRevokePermission(_)) => "AuthRoleRevokePermission",
            Some(Op::AuthRoleDelete(_)) => "AuthRoleDelete",
            Some(Op::AuthRoleList(_)) => "AuthRoleList",
            Some(Op::ClusterVersionSet(_)) => "ClusterVersionSet",
            Some(Op::ClusterMemberAttrSet(_)) => "ClusterMemberAttrSet",
            Some(Op::DowngradeInfoSet(_)) => "DowngradeInfoSet",
            None => "None",
        }
    }

    /// Records produced by the authenticate path carry their own identity
    /// and must not be stamped with caller credentials.
    pub fn is_authenticate(&self) -> bool {
        matches!(self.op, Some(Op::Authenticate(_)))
    }
}
