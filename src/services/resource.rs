//! Capability set shared by every managed resource type.
//!
//! A resource exposes its type name and configuration schema, receives the
//! provider metadata once, and implements the lifecycle operations. Shared
//! behaviour lives in free helpers taking the trait as a parameter.

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use super::gateway::RemoteGateway;
use crate::errors::{ReconcileError, ReconcileResult};

/// Process-wide provider metadata. Built once at startup and shared
/// read-only with every resource.
pub struct ProviderMeta {
    pub gateway: Arc<dyn RemoteGateway>,
}

impl ProviderMeta {
    pub fn new(gateway: Arc<dyn RemoteGateway>) -> Self {
        Self { gateway }
    }
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    String,
    Bool,
    Block,
}

/// One attribute of a resource's configuration surface.
#[derive(Serialize, Clone, Debug)]
pub struct Attribute {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: AttributeType,
    pub description: &'static str,
    pub required: bool,
    /// Changing the value forces the resource to be replaced.
    pub force_new: bool,
    pub sensitive: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attributes: Vec<Attribute>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ResourceSchema {
    pub type_name: &'static str,
    pub attributes: Vec<Attribute>,
}

#[async_trait]
pub trait Resource: Send + Sync {
    /// Validated desired configuration.
    type Config: Send + 'static;
    /// Normalized state persisted between passes.
    type State: Send + Sync + 'static;

    fn type_name(&self) -> &'static str;

    /// `None` when the resource was built without a schema.
    fn schema(&self) -> Option<&ResourceSchema>;

    /// Inject provider metadata. Only the first call has any effect.
    fn configure(&self, meta: Arc<ProviderMeta>);

    async fn create(&self, config: Self::Config) -> ReconcileResult<Self::State>;

    async fn read(&self, token: &str, prior: Option<Self::State>) -> ReconcileResult<Self::State>;

    async fn update(
        &self,
        prior: Self::State,
        config: Self::Config,
    ) -> ReconcileResult<Self::State>;

    async fn delete(&self, token: &str) -> ReconcileResult<()>;

    /// Adopt an existing remote object from its external token.
    async fn import(&self, token: &str) -> ReconcileResult<Self::State> {
        self.read(token, None).await
    }
}

/// Return the resource's schema or fail with `MissingSchema`.
pub fn describe<R: Resource + ?Sized>(resource: &R) -> ReconcileResult<&ResourceSchema> {
    resource
        .schema()
        .ok_or_else(|| ReconcileError::MissingSchema(resource.type_name()))
}
