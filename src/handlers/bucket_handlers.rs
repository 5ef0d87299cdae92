//! HTTP handlers for the bucket lifecycle.
//!
//! Each handler loads the previous state from the store, runs one
//! reconciliation pass through `BucketResource`, and writes the refreshed
//! state back keyed by its identity token. The token's pass lock is held from
//! the load until the write-back completes.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::{
    errors::AppError,
    models::{
        bucket::{Acl, BucketState},
        bucket_config::BucketConfig,
        identity::encode_identity,
        operation::PlannedOperation,
    },
    services::resource::{Resource, ResourceSchema, describe},
    state::AppState,
};

/// Request body for `POST /v1/buckets/import`.
#[derive(Debug, Deserialize)]
pub struct ImportReq {
    pub id: String,
}

/// Bucket state as returned to callers. Certificate material is reduced to
/// a fingerprint.
#[derive(Debug, Serialize)]
pub struct BucketView {
    pub id: String,
    pub zone: String,
    pub label: String,
    pub acl: Acl,
    pub cors_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub certificate: Option<CertificateView>,
}

#[derive(Debug, Serialize)]
pub struct CertificateView {
    pub fingerprint: String,
}

impl BucketView {
    fn new(id: String, state: &BucketState) -> Self {
        Self {
            id,
            zone: state.identity.zone.clone(),
            label: state.identity.label.clone(),
            acl: state.access_policy.acl,
            cors_enabled: state.access_policy.cors_enabled,
            certificate: state.certificate.as_ref().map(|cert| CertificateView {
                fingerprint: cert.fingerprint().to_string(),
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: String,
    pub action: &'static str,
    pub operations: Vec<PlannedOperation>,
}

fn not_managed(token: &str) -> AppError {
    AppError::not_found(format!(
        "bucket `{}` is not managed; import it first",
        token
    ))
}

/// GET `/v1/schema/object-storage-bucket` — describe the configuration surface.
pub async fn bucket_schema(State(state): State<AppState>) -> Result<Json<ResourceSchema>, AppError> {
    Ok(Json(describe(state.buckets.as_ref())?.clone()))
}

/// POST `/v1/buckets` — create a bucket from its desired configuration.
pub async fn create_bucket(
    State(state): State<AppState>,
    Json(config): Json<BucketConfig>,
) -> Result<impl IntoResponse, AppError> {
    let token = encode_identity(&config.identity())?;
    let _pass = state.passes.acquire(&token).await;
    if state.store.get(&token).await?.is_some() {
        return Err(AppError::conflict(format!(
            "bucket `{}` is already managed",
            token
        )));
    }

    let bucket = state.buckets.create(config).await?;
    let id = state.store.put(&bucket).await?;
    Ok((StatusCode::CREATED, Json(BucketView::new(id, &bucket))))
}

/// POST `/v1/buckets/import` — adopt an existing bucket by its token.
pub async fn import_bucket(
    State(state): State<AppState>,
    Json(req): Json<ImportReq>,
) -> Result<impl IntoResponse, AppError> {
    let _pass = state.passes.acquire(&req.id).await;
    if state.store.get(&req.id).await?.is_some() {
        return Err(AppError::conflict(format!(
            "bucket `{}` is already managed",
            req.id
        )));
    }

    let bucket = state.buckets.import(&req.id).await?;
    let id = state.store.put(&bucket).await?;
    Ok((StatusCode::CREATED, Json(BucketView::new(id, &bucket))))
}

/// POST `/v1/buckets/plan` — list the remote calls an apply would issue.
pub async fn plan_bucket(
    State(state): State<AppState>,
    Json(config): Json<BucketConfig>,
) -> Result<Json<PlanResponse>, AppError> {
    let token = encode_identity(&config.identity())?;
    let prior = state.store.get(&token).await?;
    let action = if prior.is_some() { "update" } else { "create" };

    let operations = state.buckets.plan(prior.as_ref(), config)?;
    Ok(Json(PlanResponse {
        id: token,
        action,
        operations: operations.iter().map(PlannedOperation::from).collect(),
    }))
}

/// GET `/v1/buckets/{token}` — refresh a managed bucket from the remote.
pub async fn read_bucket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<BucketView>, AppError> {
    let _pass = state.passes.acquire(&token).await;
    let prior = state
        .store
        .get(&token)
        .await?
        .ok_or_else(|| not_managed(&token))?;

    let bucket = state.buckets.read(&token, Some(prior)).await?;
    let id = state.store.put(&bucket).await?;
    Ok(Json(BucketView::new(id, &bucket)))
}

/// PUT `/v1/buckets/{token}` — reconcile a managed bucket to a new configuration.
pub async fn update_bucket(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(config): Json<BucketConfig>,
) -> Result<Json<BucketView>, AppError> {
    let _pass = state.passes.acquire(&token).await;
    let prior = state
        .store
        .get(&token)
        .await?
        .ok_or_else(|| not_managed(&token))?;

    let bucket = state.buckets.update(prior, config).await?;
    let id = state.store.put(&bucket).await?;
    Ok(Json(BucketView::new(id, &bucket)))
}

/// DELETE `/v1/buckets/{token}` — delete the bucket; already absent is fine.
pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let _pass = state.passes.acquire(&token).await;
    state.buckets.delete(&token).await?;
    state.store.remove(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
