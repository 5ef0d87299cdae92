//! Defines routes for the bucket reconciler API.
//!
//! ## Structure
//! - **Probes**
//!   - `GET    /healthz`, `GET /readyz`
//!
//! - **Bucket lifecycle**
//!   - `POST   /v1/buckets` — create from desired configuration
//!   - `POST   /v1/buckets/import` — adopt an existing bucket by token
//!   - `POST   /v1/buckets/plan` — list the calls an apply would issue
//!   - `GET    /v1/buckets/{token}` — refresh from the remote
//!   - `PUT    /v1/buckets/{token}` — reconcile to a new configuration
//!   - `DELETE /v1/buckets/{token}` — delete
//!
//! `{token}` is the `<zone>:<label>` identity token.

use crate::{
    handlers::{
        bucket_handlers::{
            bucket_schema, create_bucket, delete_bucket, import_bucket, plan_bucket, read_bucket,
            update_bucket,
        },
        health_handlers::{healthz, readyz},
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, post},
};

/// Build and return the router for all reconciler routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        // health endpoints (mounted at root)
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/v1/schema/object-storage-bucket", get(bucket_schema))
        .route("/v1/buckets", post(create_bucket))
        .route("/v1/buckets/import", post(import_bucket))
        .route("/v1/buckets/plan", post(plan_bucket))
        .route(
            "/v1/buckets/{token}",
            get(read_bucket).put(update_bucket).delete(delete_bucket),
        )
}
