//! Create/Read/Update/Delete state machine for object-storage buckets.
//!
//! Every pass runs to completion inside its own `reconcile` span: detect
//! changes, apply them in order, then re-read authoritative state through the
//! state reader so create, update and import share one read path.

use async_trait::async_trait;
use std::sync::{Arc, OnceLock};
use tracing::{Instrument, debug, info, info_span};
use uuid::Uuid;

use super::{
    apply_sequencer::apply,
    change_detector::detect_changes,
    gateway::{GatewayError, RemoteGateway},
    resource::{Attribute, AttributeType, ProviderMeta, Resource, ResourceSchema},
    state_reader::read_state,
};
use crate::{
    errors::{ReconcileError, ReconcileResult},
    models::{
        bucket::BucketState,
        bucket_config::BucketConfig,
        identity::{decode_identity, encode_identity},
        operation::Operation,
    },
};

pub const BUCKET_TYPE_NAME: &str = "linode_object_storage_bucket";

pub struct BucketResource {
    meta: OnceLock<Arc<ProviderMeta>>,
    schema: Option<ResourceSchema>,
}

impl Default for BucketResource {
    fn default() -> Self {
        Self::new()
    }
}

impl BucketResource {
    pub fn new() -> Self {
        Self {
            meta: OnceLock::new(),
            schema: Some(bucket_schema()),
        }
    }

    fn gateway(&self) -> ReconcileResult<&dyn RemoteGateway> {
        self.meta
            .get()
            .map(|meta| meta.gateway.as_ref())
            .ok_or(ReconcileError::Unconfigured(BUCKET_TYPE_NAME))
    }

    /// Operations an apply of `config` over `prior` would issue. No remote
    /// calls are made.
    pub fn plan(
        &self,
        prior: Option<&BucketState>,
        config: BucketConfig,
    ) -> ReconcileResult<Vec<Operation>> {
        let desired = config.into_desired()?;
        if let Some(prior) = prior {
            ensure_same_identity(prior, &desired)?;
        }
        Ok(detect_changes(prior, &desired))
    }
}

fn ensure_same_identity(prior: &BucketState, desired: &BucketState) -> ReconcileResult<()> {
    let field = if prior.identity.zone != desired.identity.zone {
        "zone"
    } else if prior.identity.label != desired.identity.label {
        "label"
    } else {
        return Ok(());
    };
    Err(ReconcileError::RequiresReplacement {
        token: prior.identity.to_string(),
        field,
    })
}

fn pass_span(action: &'static str, token: &str) -> tracing::Span {
    info_span!("reconcile", pass = %Uuid::new_v4(), action, token)
}

#[async_trait]
impl Resource for BucketResource {
    type Config = BucketConfig;
    type State = BucketState;

    fn type_name(&self) -> &'static str {
        BUCKET_TYPE_NAME
    }

    fn schema(&self) -> Option<&ResourceSchema> {
        self.schema.as_ref()
    }

    fn configure(&self, meta: Arc<ProviderMeta>) {
        if self.meta.set(meta).is_err() {
            debug!(resource = BUCKET_TYPE_NAME, "provider already configured");
        }
    }

    async fn create(&self, config: BucketConfig) -> ReconcileResult<BucketState> {
        let gateway = self.gateway()?;
        let desired = config.into_desired()?;
        let token = encode_identity(&desired.identity)?;

        async {
            let ops = detect_changes(None, &desired);
            info!(operations = ops.len(), "creating bucket");
            apply(gateway, &desired.identity, &ops).await?;
            read_state(gateway, &desired.identity, desired.certificate.clone()).await
        }
        .instrument(pass_span("create", &token))
        .await
    }

    async fn read(&self, token: &str, prior: Option<BucketState>) -> ReconcileResult<BucketState> {
        let gateway = self.gateway()?;
        let identity = decode_identity(token)?;
        let carried = prior.and_then(|state| state.certificate);

        read_state(gateway, &identity, carried)
            .instrument(pass_span("read", token))
            .await
    }

    async fn update(&self, prior: BucketState, config: BucketConfig) -> ReconcileResult<BucketState> {
        let gateway = self.gateway()?;
        let desired = config.into_desired()?;
        ensure_same_identity(&prior, &desired)?;
        let token = encode_identity(&prior.identity)?;

        async {
            let ops = detect_changes(Some(&prior), &desired);
            if ops.is_empty() {
                debug!("no changes to apply");
            } else {
                info!(operations = ops.len(), "updating bucket");
            }
            apply(gateway, &desired.identity, &ops).await?;
            read_state(gateway, &desired.identity, desired.certificate.clone()).await
        }
        .instrument(pass_span("update", &token))
        .await
    }

    async fn delete(&self, token: &str) -> ReconcileResult<()> {
        let gateway = self.gateway()?;
        let identity = decode_identity(token)?;

        async {
            match gateway.delete_bucket(&identity.zone, &identity.label).await {
                Ok(()) => {
                    info!("bucket deleted");
                    Ok(())
                }
                Err(GatewayError::NotFound) => {
                    info!("bucket already absent");
                    Ok(())
                }
                Err(err) => Err(ReconcileError::RemoteDelete {
                    operation: "DeleteBucket",
                    token: token.to_string(),
                    message: err.to_string(),
                }),
            }
        }
        .instrument(pass_span("delete", token))
        .await
    }
}

fn bucket_schema() -> ResourceSchema {
    let string = |name, description, required, force_new, default| Attribute {
        name,
        kind: AttributeType::String,
        description,
        required,
        force_new,
        sensitive: false,
        default,
        attributes: Vec::new(),
    };
    let secret = |name, description| Attribute {
        sensitive: true,
        ..string(name, description, true, false, None)
    };

    ResourceSchema {
        type_name: BUCKET_TYPE_NAME,
        attributes: vec![
            string(
                "zone",
                "The cluster of the Object Storage Bucket.",
                true,
                true,
                None,
            ),
            string(
                "label",
                "The label of the Object Storage Bucket.",
                true,
                true,
                None,
            ),
            string(
                "acl",
                "The Access Control Level of the bucket using a canned ACL string.",
                false,
                false,
                Some("private"),
            ),
            Attribute {
                kind: AttributeType::Bool,
                ..string(
                    "cors_enabled",
                    "If true, the bucket will be created with CORS enabled for all origins.",
                    false,
                    false,
                    Some("true"),
                )
            },
            Attribute {
                kind: AttributeType::Block,
                attributes: vec![
                    secret(
                        "certificate",
                        "The Base64 encoded and PEM formatted SSL certificate.",
                    ),
                    secret(
                        "private_key",
                        "The private key associated with the TLS/SSL certificate.",
                    ),
                ],
                ..string(
                    "cert",
                    "TLS certificate served for the bucket. At most one.",
                    false,
                    false,
                    None,
                )
            },
        ],
    }
}
