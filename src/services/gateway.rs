//! Typed contract of the remote object-storage API.
//!
//! The reconciler only ever talks to the remote through [`RemoteGateway`];
//! the HTTP implementation lives in `linode_client`, tests substitute a mock
//! or the in-memory gateway from `testkit`.

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{
    bucket::{AccessPolicy, Acl},
    operation::AccessPolicyPatch,
};

/// Bucket metadata as reported by the remote.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BucketMeta {
    pub cluster: String,
    pub label: String,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("not found")]
    NotFound,
    #[error("remote returned {status}: {message}")]
    Api { status: u16, message: String },
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Operations exposed by the remote object-storage API, all addressed by
/// `(zone, label)`.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    async fn get_bucket(&self, zone: &str, label: &str) -> GatewayResult<BucketMeta>;

    async fn create_bucket(
        &self,
        zone: &str,
        label: &str,
        acl: Acl,
        cors_enabled: bool,
    ) -> GatewayResult<BucketMeta>;

    /// Remote absence is reported as `NotFound`; callers decide whether that
    /// counts as success.
    async fn delete_bucket(&self, zone: &str, label: &str) -> GatewayResult<()>;

    async fn get_access_policy(&self, zone: &str, label: &str) -> GatewayResult<AccessPolicy>;

    async fn update_access_policy(
        &self,
        zone: &str,
        label: &str,
        patch: AccessPolicyPatch,
    ) -> GatewayResult<()>;

    async fn upload_certificate(
        &self,
        zone: &str,
        label: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> GatewayResult<()>;

    async fn delete_certificate(&self, zone: &str, label: &str) -> GatewayResult<()>;
}
