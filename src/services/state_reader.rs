//! Projects remote bucket state into the normalized local model.

use tracing::debug;

use super::gateway::{GatewayError, RemoteGateway};
use crate::{
    errors::{ReconcileError, ReconcileResult},
    models::{
        bucket::{BucketState, CertificateSpec},
        identity::ResourceIdentity,
    },
};

/// Fetch bucket metadata and access policy and combine them.
///
/// Both fetches are issued together and both complete before either result
/// is used; the bucket result decides `RemoteNotFound`. The certificate is not
/// observable remotely, so `carried_certificate` is returned as-is.
pub async fn read_state(
    gateway: &dyn RemoteGateway,
    identity: &ResourceIdentity,
    carried_certificate: Option<CertificateSpec>,
) -> ReconcileResult<BucketState> {
    let token = identity.to_string();
    debug!(%token, "fetching bucket and access policy");

    let (bucket, access) = futures::join!(
        gateway.get_bucket(&identity.zone, &identity.label),
        gateway.get_access_policy(&identity.zone, &identity.label),
    );

    let bucket = match bucket {
        Ok(bucket) => bucket,
        Err(GatewayError::NotFound) => return Err(ReconcileError::RemoteNotFound(token)),
        Err(err) => {
            return Err(ReconcileError::RemoteFetch {
                operation: "GetBucket",
                token,
                message: err.to_string(),
            });
        }
    };

    let access_policy = access.map_err(|err| ReconcileError::RemoteFetch {
        operation: "GetAccessPolicy",
        token: token.clone(),
        message: err.to_string(),
    })?;

    Ok(BucketState {
        identity: ResourceIdentity::new(bucket.cluster, bucket.label),
        access_policy,
        certificate: carried_certificate,
    })
}
