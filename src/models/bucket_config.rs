//! Desired configuration of a bucket, decoded once and validated once.

use serde::Deserialize;

use super::{
    bucket::{AccessPolicy, Acl, BucketState, CertificateSpec},
    identity::ResourceIdentity,
};
use crate::errors::{ReconcileError, ReconcileResult};

/// Declarative configuration for one bucket as supplied by the caller.
///
/// `zone` and `label` are immutable; `acl`, `cors_enabled` and `cert` may
/// change between passes.
#[derive(Deserialize, Clone, Debug)]
#[serde(deny_unknown_fields)]
pub struct BucketConfig {
    #[serde(alias = "cluster")]
    pub zone: String,
    pub label: String,
    #[serde(default)]
    pub acl: Acl,
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cert: Option<CertConfig>,
}

/// TLS certificate block of a [`BucketConfig`].
#[derive(Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct CertConfig {
    pub certificate: String,
    pub private_key: String,
}

impl std::fmt::Debug for CertConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CertConfig { .. }")
    }
}

fn default_cors_enabled() -> bool {
    true
}

impl BucketConfig {
    pub fn identity(&self) -> ResourceIdentity {
        ResourceIdentity::new(self.zone.clone(), self.label.clone())
    }

    /// Validate and convert into the desired bucket state.
    pub fn into_desired(self) -> ReconcileResult<BucketState> {
        let identity = self.identity();
        identity.validate()?;

        if self.acl == Acl::CustomUnsupported {
            return Err(ReconcileError::InvalidConfig(
                "acl `custom-unsupported` cannot be requested".into(),
            ));
        }

        let certificate = match self.cert {
            Some(cert) => {
                if cert.certificate.trim().is_empty() || cert.private_key.trim().is_empty() {
                    return Err(ReconcileError::InvalidConfig(
                        "cert requires both `certificate` and `private_key`".into(),
                    ));
                }
                Some(CertificateSpec::new(cert.certificate, cert.private_key))
            }
            None => None,
        };

        Ok(BucketState {
            identity,
            access_policy: AccessPolicy {
                acl: self.acl,
                cors_enabled: self.cors_enabled,
            },
            certificate,
        })
    }
}
