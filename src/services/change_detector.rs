//! Field-wise change detection between previous and desired bucket state.

use crate::models::{
    bucket::{AccessPolicy, BucketState, CertificateSpec},
    operation::{AccessPolicyPatch, Operation},
};

/// Compute the ordered operations that move `previous` to `desired`.
///
/// With no previous state the bucket is created first; a new bucket starts
/// with the default access policy and no certificate, and the remaining
/// operations are computed against that baseline. Never contacts the remote.
pub fn detect_changes(previous: Option<&BucketState>, desired: &BucketState) -> Vec<Operation> {
    let mut ops = Vec::new();

    let (current_policy, current_cert) = match previous {
        Some(prev) => (prev.access_policy, prev.certificate.as_ref()),
        None => {
            ops.push(Operation::CreateBucket);
            (AccessPolicy::default(), None)
        }
    };

    let patch = access_policy_patch(&current_policy, &desired.access_policy);
    if !patch.is_empty() {
        ops.push(Operation::UpdateAccessPolicy(patch));
    }

    ops.extend(certificate_operations(
        current_cert,
        desired.certificate.as_ref(),
    ));

    ops
}

fn access_policy_patch(current: &AccessPolicy, desired: &AccessPolicy) -> AccessPolicyPatch {
    AccessPolicyPatch {
        acl: (current.acl != desired.acl).then_some(desired.acl),
        cors_enabled: (current.cors_enabled != desired.cors_enabled)
            .then_some(desired.cors_enabled),
    }
}

/// The remote cannot overwrite a certificate in place: delete strictly
/// precedes upload.
fn certificate_operations(
    current: Option<&CertificateSpec>,
    desired: Option<&CertificateSpec>,
) -> Vec<Operation> {
    if current == desired {
        return Vec::new();
    }

    let mut ops = Vec::with_capacity(2);
    if current.is_some() {
        ops.push(Operation::DeleteCertificate);
    }
    if let Some(cert) = desired {
        ops.push(Operation::UploadCertificate(cert.clone()));
    }
    ops
}
