//! Shared state handed to every HTTP handler.

use std::{collections::HashMap, sync::Arc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::services::{lifecycle::BucketResource, state_store::StateStore};

#[derive(Clone)]
pub struct AppState {
    /// Last refreshed state per identity token.
    pub store: StateStore,

    /// The bucket resource, already configured with provider metadata.
    pub buckets: Arc<BucketResource>,

    /// Serializes reconciliation passes per identity token.
    pub passes: PassLocks,
}

impl AppState {
    pub fn new(store: StateStore, buckets: Arc<BucketResource>) -> Self {
        Self {
            store,
            buckets,
            passes: PassLocks::default(),
        }
    }
}

/// One async mutex per identity token.
///
/// A handler holds the guard across load, pass and write-back, so two passes
/// on the same bucket never interleave their remote calls. Passes on
/// different tokens run concurrently.
#[derive(Clone, Default)]
pub struct PassLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl PassLocks {
    pub async fn acquire(&self, token: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.inner.lock().await;
            // Entries only referenced by the map have no holder and no waiter.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks.entry(token.to_string()).or_default().clone()
        };
        lock.lock_owned().await
    }
}
