//! src/services/state_store.rs
//!
//! StateStore — the persisted side of reconciliation. One SQLite row per
//! identity token holds the last refreshed access policy and the digest of the
//! last-applied certificate, which is the only record of certificate state
//! the reconciler has. Certificate and key material is never written.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::{
    errors::ReconcileError,
    models::{
        bucket::{AccessPolicy, BucketState, CertificateSpec},
        identity::{ResourceIdentity, decode_identity, encode_identity},
    },
};

const MIGRATION: &str = include_str!("../../migrations/0001_init.sql");

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("stored bucket `{token}` is corrupt: {reason}")]
    Corrupt { token: String, reason: String },
    #[error(transparent)]
    Identity(#[from] ReconcileError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(FromRow, Debug)]
struct BucketRecord {
    token: String,
    zone: String,
    label: String,
    acl: String,
    cors_enabled: bool,
    certificate_digest: Option<String>,
    #[allow(dead_code)]
    updated_at: DateTime<Utc>,
}

impl BucketRecord {
    fn into_state(self) -> StoreResult<BucketState> {
        let identity = decode_identity(&self.token)?;
        if identity != ResourceIdentity::new(self.zone.clone(), self.label.clone()) {
            return Err(StoreError::Corrupt {
                token: self.token,
                reason: format!("row holds `{}:{}`", self.zone, self.label),
            });
        }
        let acl = self.acl.parse().map_err(|reason| StoreError::Corrupt {
            token: self.token.clone(),
            reason,
        })?;
        Ok(BucketState {
            identity,
            access_policy: AccessPolicy {
                acl,
                cors_enabled: self.cors_enabled,
            },
            certificate: self.certificate_digest.map(CertificateSpec::recorded),
        })
    }
}

#[derive(Clone)]
pub struct StateStore {
    pub db: Arc<SqlitePool>,
}

impl StateStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }

    /// Apply the embedded schema. Idempotent.
    pub async fn migrate(&self) -> StoreResult<()> {
        let statements = MIGRATION
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>();

        for stmt in statements {
            debug!("Executing migration SQL: {}", stmt);
            sqlx::query(stmt).execute(&*self.db).await?;
        }
        Ok(())
    }

    pub async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        Ok(())
    }

    /// Load the last persisted state for `token`, if it is managed.
    pub async fn get(&self, token: &str) -> StoreResult<Option<BucketState>> {
        let record = sqlx::query_as::<_, BucketRecord>(
            "SELECT token, zone, label, acl, cors_enabled, certificate_digest, updated_at
             FROM buckets WHERE token = ?",
        )
        .bind(token)
        .fetch_optional(&*self.db)
        .await?;

        record.map(BucketRecord::into_state).transpose()
    }

    /// Upsert `state` keyed by its identity token and return the token.
    pub async fn put(&self, state: &BucketState) -> StoreResult<String> {
        let token = encode_identity(&state.identity)?;
        let certificate_digest = state.certificate.as_ref().map(CertificateSpec::fingerprint);

        sqlx::query(
            r#"
            INSERT INTO buckets (
                token, zone, label, acl, cors_enabled,
                certificate_digest, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                acl = excluded.acl,
                cors_enabled = excluded.cors_enabled,
                certificate_digest = excluded.certificate_digest,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&token)
        .bind(&state.identity.zone)
        .bind(&state.identity.label)
        .bind(state.access_policy.acl.as_str())
        .bind(state.access_policy.cors_enabled)
        .bind(certificate_digest)
        .bind(Utc::now())
        .execute(&*self.db)
        .await?;

        debug!(%token, "persisted bucket state");
        Ok(token)
    }

    /// Forget `token`. Returns whether a row was removed.
    pub async fn remove(&self, token: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM buckets WHERE token = ?")
            .bind(token)
            .execute(&*self.db)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bucket::Acl;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn store() -> StateStore {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = StateStore::new(Arc::new(pool));
        store.migrate().await.unwrap();
        store
    }

    fn state(cert: Option<CertificateSpec>) -> BucketState {
        BucketState {
            identity: ResourceIdentity::new("us-east", "b1"),
            access_policy: AccessPolicy {
                acl: Acl::PublicRead,
                cors_enabled: false,
            },
            certificate: cert,
        }
    }

    #[tokio::test]
    async fn put_then_get_returns_the_same_state() {
        let store = store().await;
        let saved = state(Some(CertificateSpec::new("PEM_A", "KEY_A")));

        let token = store.put(&saved).await.unwrap();
        assert_eq!(token, "us-east:b1");
        assert_eq!(store.get(&token).await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn certificate_material_never_reaches_the_database() {
        let store = store().await;
        let cert = CertificateSpec::new("-----BEGIN CERTIFICATE-----PEM_A", "SECRET-KEY_A");
        store.put(&state(Some(cert.clone()))).await.unwrap();

        let rows: Vec<(String, String, Option<String>)> = sqlx::query_as(
            "SELECT token, acl, certificate_digest FROM buckets",
        )
        .fetch_all(&*store.db)
        .await
        .unwrap();
        assert_eq!(
            rows,
            vec![(
                "us-east:b1".to_string(),
                "public-read".to_string(),
                Some(cert.fingerprint().to_string())
            )]
        );

        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info('buckets')")
                .fetch_all(&*store.db)
                .await
                .unwrap();
        assert!(!columns.iter().any(|c| c.contains("pem")), "{columns:?}");

        let loaded = store.get("us-east:b1").await.unwrap().unwrap();
        let recorded = loaded.certificate.unwrap();
        assert_eq!(recorded, cert);
        assert!(recorded.material().is_none());
    }

    #[tokio::test]
    async fn put_overwrites_previous_state() {
        let store = store().await;
        store
            .put(&state(Some(CertificateSpec::new("PEM_A", "KEY_A"))))
            .await
            .unwrap();
        store.put(&state(None)).await.unwrap();

        let loaded = store.get("us-east:b1").await.unwrap().unwrap();
        assert!(loaded.certificate.is_none());
    }

    #[tokio::test]
    async fn unknown_token_is_none_and_remove_reports_absence() {
        let store = store().await;
        assert!(store.get("us-east:nope").await.unwrap().is_none());
        assert!(!store.remove("us-east:nope").await.unwrap());

        store.put(&state(None)).await.unwrap();
        assert!(store.remove("us-east:b1").await.unwrap());
        assert!(store.get("us-east:b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn migrate_is_idempotent_and_ping_works() {
        let store = store().await;
        store.migrate().await.unwrap();
        store.ping().await.unwrap();
    }
}
