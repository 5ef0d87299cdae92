//! HTTP implementation of [`RemoteGateway`] for the Linode Object Storage
//! REST API (v4).
//!
//! Every request carries the bearer token. A 404 becomes
//! [`GatewayError::NotFound`]; any other non-success status becomes
//! [`GatewayError::Api`] with the `errors[].reason` strings of the response.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url, header};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::gateway::{BucketMeta, GatewayError, GatewayResult, RemoteGateway};
use crate::models::{
    bucket::{AccessPolicy, Acl},
    operation::AccessPolicyPatch,
};

#[derive(Clone)]
pub struct LinodeClient {
    http: Client,
    base_url: Url,
}

#[derive(Serialize)]
struct CreateBucketBody<'a> {
    cluster: &'a str,
    label: &'a str,
    acl: Acl,
    cors_enabled: bool,
}

#[derive(Serialize)]
struct UploadCertBody<'a> {
    certificate: &'a str,
    private_key: &'a str,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    errors: Vec<ErrorReason>,
}

#[derive(Deserialize)]
struct ErrorReason {
    reason: String,
}

impl LinodeClient {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("API url `{}` cannot carry a path", base_url);
        }

        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let http = Client::builder()
            .default_headers(headers)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self { http, base_url })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        debug!(%method, %url, "remote request");
        self.http.request(method, url)
    }

    /// `<base>/object-storage/buckets[/<zone>/<label>[/<suffix>]]`.
    ///
    /// Every part is pushed as exactly one percent-encoded path segment, so
    /// `/`, `?` and `#` inside a zone or label never change the target.
    fn buckets_url(&self, parts: &[&str]) -> GatewayResult<Url> {
        if let Some(part) = parts
            .iter()
            .find(|p| p.is_empty() || **p == "." || **p == "..")
        {
            return Err(GatewayError::Api {
                status: 0,
                message: format!("refusing path segment `{}`", part),
            });
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| GatewayError::Api {
                status: 0,
                message: format!("API url `{}` cannot carry a path", self.base_url),
            })?
            .pop_if_empty()
            .extend(["object-storage", "buckets"])
            .extend(parts);
        Ok(url)
    }

    fn bucket_url(&self, zone: &str, label: &str, suffix: Option<&str>) -> GatewayResult<Url> {
        match suffix {
            Some(suffix) => self.buckets_url(&[zone, label, suffix]),
            None => self.buckets_url(&[zone, label]),
        }
    }

    async fn send(builder: RequestBuilder) -> GatewayResult<Response> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }

        let body = response.text().await.unwrap_or_default();
        let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) if !envelope.errors.is_empty() => envelope
                .errors
                .into_iter()
                .map(|e| e.reason)
                .collect::<Vec<_>>()
                .join("; "),
            _ => body,
        };
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl RemoteGateway for LinodeClient {
    async fn get_bucket(&self, zone: &str, label: &str) -> GatewayResult<BucketMeta> {
        let request = self.request(Method::GET, self.bucket_url(zone, label, None)?);
        Ok(Self::send(request).await?.json().await?)
    }

    async fn create_bucket(
        &self,
        zone: &str,
        label: &str,
        acl: Acl,
        cors_enabled: bool,
    ) -> GatewayResult<BucketMeta> {
        let request = self
            .request(Method::POST, self.buckets_url(&[])?)
            .json(&CreateBucketBody {
                cluster: zone,
                label,
                acl,
                cors_enabled,
            });
        Ok(Self::send(request).await?.json().await?)
    }

    async fn delete_bucket(&self, zone: &str, label: &str) -> GatewayResult<()> {
        let request = self.request(Method::DELETE, self.bucket_url(zone, label, None)?);
        Self::send(request).await?;
        Ok(())
    }

    async fn get_access_policy(&self, zone: &str, label: &str) -> GatewayResult<AccessPolicy> {
        let request = self.request(Method::GET, self.bucket_url(zone, label, Some("access"))?);
        Ok(Self::send(request).await?.json().await?)
    }

    async fn update_access_policy(
        &self,
        zone: &str,
        label: &str,
        patch: AccessPolicyPatch,
    ) -> GatewayResult<()> {
        let url = self.bucket_url(zone, label, Some("access"))?;
        let request = self.request(Method::POST, url).json(&patch);
        Self::send(request).await?;
        Ok(())
    }

    async fn upload_certificate(
        &self,
        zone: &str,
        label: &str,
        certificate_pem: &str,
        private_key_pem: &str,
    ) -> GatewayResult<()> {
        let url = self.bucket_url(zone, label, Some("ssl"))?;
        let request = self.request(Method::POST, url).json(&UploadCertBody {
            certificate: certificate_pem,
            private_key: private_key_pem,
        });
        Self::send(request).await?;
        Ok(())
    }

    async fn delete_certificate(&self, zone: &str, label: &str) -> GatewayResult<()> {
        let request = self.request(Method::DELETE, self.bucket_url(zone, label, Some("ssl"))?);
        Self::send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        Json, Router,
        extract::{Path, State},
        http::{HeaderMap, StatusCode as AxumStatus},
        routing::{get, post},
    };
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct Captured {
        bodies: Arc<Mutex<Vec<(String, Value)>>>,
        auth: Arc<Mutex<Vec<String>>>,
    }

    async fn get_bucket(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Path((cluster, label)): Path<(String, String)>,
    ) -> Result<Json<Value>, (AxumStatus, Json<Value>)> {
        if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
            captured.auth.lock().unwrap().push(auth.to_string());
        }
        if label == "missing" {
            return Err((
                AxumStatus::NOT_FOUND,
                Json(json!({ "errors": [{ "reason": "Not found" }] })),
            ));
        }
        Ok(Json(json!({
            "cluster": cluster,
            "label": label,
            "hostname": format!("{label}.{cluster}.linodeobjects.com"),
            "created": "2019-01-01T01:23:45",
            "objects": 4,
            "size": 188318981
        })))
    }

    async fn get_access() -> Json<Value> {
        Json(json!({ "acl": "custom", "acl_xml": "<AccessControlPolicy/>", "cors_enabled": false }))
    }

    async fn post_access(
        State(captured): State<Captured>,
        Path((cluster, label)): Path<(String, String)>,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        captured
            .bodies
            .lock()
            .unwrap()
            .push((format!("access {cluster}:{label}"), body));
        Json(json!({}))
    }

    async fn post_ssl() -> (AxumStatus, Json<Value>) {
        (
            AxumStatus::BAD_REQUEST,
            Json(json!({ "errors": [
                { "reason": "Certificate is invalid", "field": "certificate" },
                { "reason": "Key does not match" }
            ]})),
        )
    }

    async fn delete_ssl() -> (AxumStatus, &'static str) {
        (AxumStatus::SERVICE_UNAVAILABLE, "upstream unavailable")
    }

    async fn stub_client() -> (LinodeClient, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route("/v4/object-storage/buckets/{cluster}/{label}", get(get_bucket))
            .route(
                "/v4/object-storage/buckets/{cluster}/{label}/access",
                get(get_access).post(post_access),
            )
            .route(
                "/v4/object-storage/buckets/{cluster}/{label}/ssl",
                post(post_ssl).delete(delete_ssl),
            )
            .with_state(captured.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let client = LinodeClient::new(
            &format!("http://{addr}/v4"),
            "test-token",
            Duration::from_secs(5),
        )
        .unwrap();
        (client, captured)
    }

    #[tokio::test]
    async fn fetches_bucket_with_bearer_token() {
        let (client, captured) = stub_client().await;
        let bucket = client.get_bucket("us-east", "b1").await.unwrap();
        assert_eq!(bucket.cluster, "us-east");
        assert_eq!(bucket.label, "b1");
        assert_eq!(
            captured.auth.lock().unwrap().as_slice(),
            ["Bearer test-token".to_string()]
        );
    }

    #[tokio::test]
    async fn maps_404_to_not_found() {
        let (client, _) = stub_client().await;
        let err = client.get_bucket("us-east", "missing").await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound));
    }

    #[tokio::test]
    async fn decodes_custom_acl() {
        let (client, _) = stub_client().await;
        let policy = client.get_access_policy("us-east", "b1").await.unwrap();
        assert_eq!(policy.acl, Acl::CustomUnsupported);
        assert!(!policy.cors_enabled);
    }

    #[tokio::test]
    async fn access_update_sends_only_changed_fields() {
        let (client, captured) = stub_client().await;
        client
            .update_access_policy(
                "us-east",
                "b1",
                AccessPolicyPatch {
                    acl: Some(Acl::PublicRead),
                    cors_enabled: None,
                },
            )
            .await
            .unwrap();

        let bodies = captured.bodies.lock().unwrap();
        assert_eq!(
            bodies.as_slice(),
            [("access us-east:b1".to_string(), json!({ "acl": "public-read" }))]
        );
    }

    #[tokio::test]
    async fn joins_api_error_reasons() {
        let (client, _) = stub_client().await;
        let err = client
            .upload_certificate("us-east", "b1", "PEM", "KEY")
            .await
            .unwrap_err();
        match err {
            GatewayError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "Certificate is invalid; Key does not match");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn keeps_raw_body_when_not_an_error_envelope() {
        let (client, _) = stub_client().await;
        let err = client.delete_certificate("us-east", "b1").await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::Api { status: 503, ref message } if message == "upstream unavailable"
        ));
    }

    #[tokio::test]
    async fn zone_and_label_are_single_encoded_segments() {
        let (client, _) = stub_client().await;
        for (label, path) in [
            ("a/b", "/v4/object-storage/buckets/us-east/a%2Fb"),
            ("x?acl=1", "/v4/object-storage/buckets/us-east/x%3Facl=1"),
            ("b#frag", "/v4/object-storage/buckets/us-east/b%23frag"),
            (
                "../../../linode/instances/123",
                "/v4/object-storage/buckets/us-east/..%2F..%2F..%2Flinode%2Finstances%2F123",
            ),
        ] {
            let url = client.bucket_url("us-east", label, None).unwrap();
            assert_eq!(url.path(), path);
            assert_eq!(url.query(), None);
            assert_eq!(url.fragment(), None);
        }

        let url = client.bucket_url("us-east", "b1", Some("ssl")).unwrap();
        assert_eq!(url.path(), "/v4/object-storage/buckets/us-east/b1/ssl");
        let url = client.buckets_url(&[]).unwrap();
        assert_eq!(url.path(), "/v4/object-storage/buckets");
    }

    #[tokio::test]
    async fn slash_in_label_reaches_the_bucket_route_intact() {
        let (client, _) = stub_client().await;
        let bucket = client.get_bucket("us-east", "a/b").await.unwrap();
        assert_eq!(bucket.cluster, "us-east");
        assert_eq!(bucket.label, "a/b");
    }

    #[tokio::test]
    async fn dot_segments_are_refused_before_sending() {
        let (client, captured) = stub_client().await;
        for label in ["..", ".", ""] {
            let err = client.delete_bucket("us-east", label).await.unwrap_err();
            assert!(
                matches!(err, GatewayError::Api { status: 0, .. }),
                "label {label:?} was sent"
            );
        }
        assert!(captured.auth.lock().unwrap().is_empty());
    }
}
