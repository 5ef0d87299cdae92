//! In-memory [`RemoteGateway`] that behaves like the remote API and records
//! every call it receives, for sequencing assertions.

use async_trait::async_trait;
use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use super::gateway::{BucketMeta, GatewayError, GatewayResult, RemoteGateway};
use crate::models::{
    bucket::{AccessPolicy, Acl, CertificateSpec},
    operation::AccessPolicyPatch,
};

#[derive(Clone, Debug)]
struct RemoteBucket {
    policy: AccessPolicy,
    certificate: Option<CertificateSpec>,
}

#[derive(Default)]
pub struct MemoryGateway {
    buckets: Mutex<HashMap<(String, String), RemoteBucket>>,
    calls: Mutex<Vec<String>>,
    failing: Mutex<HashSet<&'static str>>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a bucket that already exists remotely.
    pub fn with_bucket(self, zone: &str, label: &str, policy: AccessPolicy) -> Self {
        self.buckets.lock().unwrap().insert(
            (zone.to_string(), label.to_string()),
            RemoteBucket {
                policy,
                certificate: None,
            },
        );
        self
    }

    /// Seed a certificate on an existing bucket.
    pub fn with_certificate(self, zone: &str, label: &str, certificate: CertificateSpec) -> Self {
        if let Some(bucket) = self
            .buckets
            .lock()
            .unwrap()
            .get_mut(&(zone.to_string(), label.to_string()))
        {
            bucket.certificate = Some(certificate);
        }
        self
    }

    /// Make every call of the named operation fail with an API error.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    /// Undo [`MemoryGateway::fail_on`].
    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn certificate(&self, zone: &str, label: &str) -> Option<CertificateSpec> {
        self.buckets
            .lock()
            .unwrap()
            .get(&(zone.to_string(), label.to_string()))
            .and_then(|b| b.certificate.clone())
    }

    pub fn exists(&self, zone: &str, label: &str) -> bool {
        self.buckets
            .lock()
            .unwrap()
            .contains_key(&(zone.to_string(), label.to_string()))
    }

    /// Mutate the remote behind the reconciler's back.
    pub fn drop_certificate_out_of_band(&self, zone: &str, label: &str) {
        if let Some(bucket) = self
            .buckets
            .lock()
            .unwrap()
            .get_mut(&(zone.to_string(), label.to_string()))
        {
            bucket.certificate = None;
        }
    }

    fn record(&self, operation: &'static str, detail: String) -> GatewayResult<()> {
        self.calls.lock().unwrap().push(detail);
        if self.failing.lock().unwrap().contains(operation) {
            return Err(GatewayError::Api {
                status: 500,
                message: format!("{} rejected by test gateway", operation),
            });
        }
        Ok(())
    }

    fn with_existing<T>(
        &self,
        zone: &str,
        label: &str,
        f: impl FnOnce(&mut RemoteBucket) -> GatewayResult<T>,
    ) -> GatewayResult<T> {
        let mut buckets = self.buckets.lock().unwrap();
        match buckets.get_mut(&(zone.to_string(), label.to_string())) {
            Some(bucket) => f(bucket),
            None => Err(GatewayError::NotFound),
        }
    }
}

#[async_trait]
impl RemoteGateway for MemoryGateway {
    async fn get_bucket(&self, zone: &str, label: &str) -> GatewayResult<BucketMeta> {
        self.record("GetBucket", format!("GetBucket {zone}:{label}"))?;
        self.with_existing(zone, label, |_| {
            Ok(BucketMeta {
                cluster: zone.to_string(),
                label: label.to_string(),
            })
        })
    }

    async fn create_bucket(
        &self,
        zone: &str,
        label: &str,
        acl: Acl,
        cors_enabled: bool,
    ) -> GatewayResult<BucketMeta> {
        self.record(
            "CreateBucket",
            format!("CreateBucket {zone}:{label} acl={acl} cors={cors_enabled}"),
        )?;
        let mut buckets = self.buckets.lock().unwrap();
        let key = (zone.to_string(), label.to_string());
        if buckets.contains_key(&key) {
            return Err(GatewayError::Api {
                status: 400,
                message: "bucket already exists".into(),
            });
        }
        buckets.insert(
            key,
            RemoteBucket {
                policy: AccessPolicy { acl, cors_enabled },
                certificate: None,
            },
        );
        Ok(BucketMeta {
            cluster: zone.to_string(),
            label: label.to_string(),
        })
    }

    async fn delete_bucket(&self, zone: &str, label: &str) -> GatewayResult<()> {
        self.record("DeleteBucket", format!("DeleteBucket {zone}:{label}"))?;
        match self
            .buckets
            .lock()
            .unwrap()
            .remove(&(zone.to_string(), label.to_string()))
        {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound),
        }
    }

    async fn get_access_policy(&self, zone: &str, label: &str) -> GatewayResult<AccessPolicy> {
        self.record("GetAccessPolicy", format!("GetAccessPolicy {zone}:{label}"))?;
        self.with_existing(zone, label, |bucket| Ok(bucket.policy))
    }

    async fn update_access_policy(
        &self,
        zone: &str,
        label: &str,
        patch: AccessPolicyPatch,
    ) -> GatewayResult<()> {
        let mut detail = format!("UpdateAccessPolicy {zone}:{label}");
        if let Some(acl) = patch.acl {
            detail.push_str(&format!(" acl={acl}"));
        }
        if let Some(cors) = patch.cors_enabled {
            detail.push_str(&format!(" cors={cors}"));
        }
        self.record("UpdateAccessPolicy", detail)?;
        self.with_existing(zone, label, |bucket| {
            if let Some(acl) = patch.acl {
                bucket.policy.acl = acl;
            }
            if let Some(cors) = patch.cors_enabled {
                bucket.policy.cors_enabled = cors;
            }
            Ok(())
        })
    }

    async fn upload_certificate(
        &self,
        zone: &str,
        label: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> GatewayResult<()> {
        self.record("UploadCertificate", format!("UploadCertificate {zone}:{label}"))?;
        self.with_existing(zone, label, |bucket| {
            if bucket.certificate.is_some() {
                return Err(GatewayError::Api {
                    status: 400,
                    message: "bucket already has a certificate".into(),
                });
            }
            bucket.certificate = Some(CertificateSpec::new(certificate_pem, private_key_pem));
            Ok(())
        })
    }

    async fn delete_certificate(&self, zone: &str, label: &str) -> GatewayResult<()> {
        self.record("DeleteCertificate", format!("DeleteCertificate {zone}:{label}"))?;
        self.with_existing(zone, label, |bucket| match bucket.certificate.take() {
            Some(_) => Ok(()),
            None => Err(GatewayError::NotFound),
        })
    }
}
