//! Normalized local view of one remote object-storage bucket.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fmt, str::FromStr};

use super::identity::ResourceIdentity;

/// Canned access-control level applied to a bucket.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
    PublicReadWrite,
    AuthenticatedRead,
    /// Reported by the remote for ACLs that have no canned equivalent.
    /// Can be read back but never requested.
    #[serde(alias = "custom")]
    CustomUnsupported,
}

impl Acl {
    pub fn as_str(self) -> &'static str {
        match self {
            Acl::Private => "private",
            Acl::PublicRead => "public-read",
            Acl::PublicReadWrite => "public-read-write",
            Acl::AuthenticatedRead => "authenticated-read",
            Acl::CustomUnsupported => "custom-unsupported",
        }
    }
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Acl {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "private" => Ok(Acl::Private),
            "public-read" => Ok(Acl::PublicRead),
            "public-read-write" => Ok(Acl::PublicReadWrite),
            "authenticated-read" => Ok(Acl::AuthenticatedRead),
            "custom" | "custom-unsupported" => Ok(Acl::CustomUnsupported),
            other => Err(format!("unknown ACL `{}`", other)),
        }
    }
}

/// Access policy of a bucket. Always present once the bucket exists.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct AccessPolicy {
    pub acl: Acl,
    pub cors_enabled: bool,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self {
            acl: Acl::Private,
            cors_enabled: true,
        }
    }
}

/// TLS certificate bound to a bucket.
///
/// Identified by a SHA-256 digest over the certificate and private key, which
/// is all change detection compares. Certificates built from configuration
/// also carry the PEM material needed to upload them; certificates loaded
/// from the state store carry only the digest, so key material is never
/// persisted. `Debug` and the HTTP surface only ever show the digest.
#[derive(Clone)]
pub struct CertificateSpec {
    digest: String,
    material: Option<CertificateMaterial>,
}

#[derive(Clone)]
pub struct CertificateMaterial {
    pub certificate_pem: String,
    pub private_key_pem: String,
}

impl CertificateSpec {
    pub fn new(certificate_pem: impl Into<String>, private_key_pem: impl Into<String>) -> Self {
        let material = CertificateMaterial {
            certificate_pem: certificate_pem.into(),
            private_key_pem: private_key_pem.into(),
        };
        Self {
            digest: material.digest(),
            material: Some(material),
        }
    }

    /// A certificate known only by the digest recorded when it was applied.
    pub fn recorded(digest: impl Into<String>) -> Self {
        Self {
            digest: digest.into(),
            material: None,
        }
    }

    /// Lowercase hex SHA-256 of certificate and key.
    pub fn fingerprint(&self) -> &str {
        &self.digest
    }

    /// PEM material, absent for certificates loaded from the store.
    pub fn material(&self) -> Option<&CertificateMaterial> {
        self.material.as_ref()
    }
}

impl CertificateMaterial {
    fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.certificate_pem.as_bytes());
        // PEM text never contains NUL, so the split point is unambiguous.
        hasher.update([0u8]);
        hasher.update(self.private_key_pem.as_bytes());
        hex::encode(hasher.finalize())
    }
}

impl PartialEq for CertificateSpec {
    fn eq(&self, other: &Self) -> bool {
        self.digest == other.digest
    }
}

impl Eq for CertificateSpec {}

impl fmt::Debug for CertificateSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateSpec")
            .field("fingerprint", &self.digest)
            .field("has_material", &self.material.is_some())
            .finish()
    }
}

/// Full normalized view of one bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketState {
    pub identity: ResourceIdentity,
    pub access_policy: AccessPolicy,

    /// Last-applied certificate. The remote never returns certificate
    /// content, so this is carried over rather than observed.
    pub certificate: Option<CertificateSpec>,
}
