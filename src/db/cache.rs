use anyhow::Result;

use crate::domain::{CacheEntry, ClassificationResult};

use super::store::{KeyValueStore, Scope};

/// Namespace of verdict entries inside the local scope.
pub const CACHE_KEY_PREFIX: &str = "site_";

/// Host → latest verdict. Stores whatever it is given and returns whatever
/// it has; deciding whether an entry is still fresh is the caller's job.
#[derive(Clone)]
pub struct ResultCache {
    store: KeyValueStore,
}

impl ResultCache {
    pub fn new(store: KeyValueStore) -> Self {
        Self { store }
    }

    pub async fn get(&self, host: &str) -> Result<Option<CacheEntry>> {
        self.store.get(Scope::Local, &cache_key(host)).await
    }

    pub async fn put(&self, host: &str, result: &ClassificationResult) -> Result<()> {
        let entry = CacheEntry::new(result.clone());
        self.store.set(Scope::Local, &cache_key(host), &entry).await
    }

    /// Removes local entries whose key starts with `prefix`, leaving the
    /// rest of the local scope alone.
    pub async fn clear(&self, prefix: &str) -> Result<u64> {
        let removed = self.store.remove_prefix(Scope::Local, prefix).await?;
        tracing::info!(target: "cache", removed, prefix, "cache cleared");
        Ok(removed)
    }

    pub async fn clear_results(&self) -> Result<u64> {
        self.clear(CACHE_KEY_PREFIX).await
    }
}

fn cache_key(host: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{host}")
}
