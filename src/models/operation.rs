//! Remote operations a reconciliation pass may issue.

use serde::Serialize;

use super::bucket::{Acl, CertificateSpec};

/// Partial access-policy update. `None` fields are left untouched remotely.
#[derive(Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AccessPolicyPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acl: Option<Acl>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cors_enabled: Option<bool>,
}

impl AccessPolicyPatch {
    pub fn is_empty(&self) -> bool {
        self.acl.is_none() && self.cors_enabled.is_none()
    }
}

/// One remote call, in the order the sequencer must issue it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operation {
    CreateBucket,
    UpdateAccessPolicy(AccessPolicyPatch),
    DeleteCertificate,
    UploadCertificate(CertificateSpec),
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateBucket => "CreateBucket",
            Operation::UpdateAccessPolicy(_) => "UpdateAccessPolicy",
            Operation::DeleteCertificate => "DeleteCertificate",
            Operation::UploadCertificate(_) => "UploadCertificate",
        }
    }
}

/// Redacted, serializable description of an [`Operation`] for plan output.
#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct PlannedOperation {
    pub operation: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_policy: Option<AccessPolicyPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate_fingerprint: Option<String>,
}

impl From<&Operation> for PlannedOperation {
    fn from(op: &Operation) -> Self {
        let (access_policy, certificate_fingerprint) = match op {
            Operation::UpdateAccessPolicy(patch) => (Some(*patch), None),
            Operation::UploadCertificate(cert) => (None, Some(cert.fingerprint().to_string())),
            Operation::CreateBucket | Operation::DeleteCertificate => (None, None),
        };
        Self {
            operation: op.name(),
            access_policy,
            certificate_fingerprint,
        }
    }
}
