//! Executes planned operations against the remote, in order, fail-fast.

use tracing::{debug, info, warn};

use super::gateway::{GatewayError, RemoteGateway};
use crate::{
    errors::{ReconcileError, ReconcileResult},
    models::{bucket::AccessPolicy, identity::ResourceIdentity, operation::Operation},
};

/// Issue `operations` strictly in the given order.
///
/// The first failure aborts the rest; nothing already applied is rolled
/// back. A failed `DeleteCertificate` therefore prevents the following
/// upload. State is not re-read here.
///
/// `CreateBucket` always sends the default access policy. The change detector
/// plans a new bucket against that same baseline, so any desired difference
/// arrives as a following partial `UpdateAccessPolicy`.
///
/// `DeleteCertificate` on a bucket without a certificate counts as applied,
/// so a pass that failed between delete and upload can be re-run.
pub async fn apply(
    gateway: &dyn RemoteGateway,
    identity: &ResourceIdentity,
    operations: &[Operation],
) -> ReconcileResult<()> {
    let (zone, label) = (identity.zone.as_str(), identity.label.as_str());

    for (step, op) in operations.iter().enumerate() {
        let result = match op {
            Operation::CreateBucket => {
                let defaults = AccessPolicy::default();
                gateway
                    .create_bucket(zone, label, defaults.acl, defaults.cors_enabled)
                    .await
                    .map(|_| ())
            }
            Operation::UpdateAccessPolicy(patch) => {
                gateway.update_access_policy(zone, label, *patch).await
            }
            Operation::DeleteCertificate => match gateway.delete_certificate(zone, label).await {
                Err(GatewayError::NotFound) => {
                    debug!(token = %identity, "certificate already absent");
                    Ok(())
                }
                other => other,
            },
            Operation::UploadCertificate(cert) => match cert.material() {
                Some(material) => {
                    gateway
                        .upload_certificate(
                            zone,
                            label,
                            &material.certificate_pem,
                            &material.private_key_pem,
                        )
                        .await
                }
                None => {
                    return Err(ReconcileError::InvalidConfig(format!(
                        "certificate {} has no PEM material to upload",
                        cert.fingerprint()
                    )));
                }
            },
        };

        match result {
            Ok(()) => info!(
                token = %identity,
                operation = op.name(),
                step = step + 1,
                total = operations.len(),
                "applied"
            ),
            Err(err) => {
                warn!(
                    token = %identity,
                    operation = op.name(),
                    skipped = operations.len() - step - 1,
                    error = %err,
                    "operation failed; aborting pass"
                );
                return Err(operation_error(op, identity, err));
            }
        }
    }

    Ok(())
}

fn operation_error(op: &Operation, identity: &ResourceIdentity, err: GatewayError) -> ReconcileError {
    let operation = op.name();
    let token = identity.to_string();
    let message = err.to_string();
    match op {
        Operation::CreateBucket => ReconcileError::RemoteCreate {
            operation,
            token,
            message,
        },
        _ => ReconcileError::RemoteUpdate {
            operation,
            token,
            message,
        },
    }
}
